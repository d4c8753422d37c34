use std::{fmt, time::Duration};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tableops_resource::schema::v0::TableInputs;
use tracing::debug;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

/// A failed call to the table store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteCallError {
    /// The store answered, but not with success.
    #[error("Failed to {operation} table: {status} - {body}")]
    Status {
        operation: Operation,
        status: StatusCode,
        body: String,
    },
    /// The store could not be reached, or did not answer in time.
    #[error("Network error trying to {operation} table: {source}")]
    Network {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },
    #[error("Could not decode the store's answer to {operation} table: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
}

impl RemoteCallError {
    /// Whether trying again later may succeed. Only network failures qualify;
    /// an answer from the store is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteCallError::Network { .. })
    }
}

/// The table fields sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TablePayload<'a> {
    pub name: &'a str,
    pub size: i64,
    #[serde(rename = "readOnly")]
    pub read_only: bool,
}

impl<'a> From<&'a TableInputs> for TablePayload<'a> {
    fn from(inputs: &'a TableInputs) -> Self {
        TablePayload {
            name: &inputs.name,
            size: inputs.size,
            read_only: inputs.read_only,
        }
    }
}

/// Bookkeeping fields of a store answer, taken as whatever JSON the store
/// sent.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct Timestamps {
    #[serde(rename = "createdAt", default)]
    created_at: Option<Value>,
    #[serde(rename = "modifiedAt", default)]
    modified_at: Option<Value>,
}

impl Timestamps {
    pub fn created_at(&self) -> Option<String> {
        self.created_at.as_ref().and_then(as_text)
    }

    pub fn modified_at(&self) -> Option<String> {
        self.modified_at.as_ref().and_then(as_text)
    }
}

/// Strings as they are, `null` as absent, anything else as its JSON text.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct CreatedTable {
    id: Value,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl CreatedTable {
    /// The store's id, as text whatever JSON type it came as.
    pub fn id(&self) -> String {
        as_text(&self.id).unwrap_or_default()
    }
}

/// HTTP client for the table store.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: Client,
}

impl StoreClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(StoreClient { http })
    }

    pub async fn create_table(
        &self,
        endpoint: &str,
        table: &TablePayload<'_>,
    ) -> Result<CreatedTable, RemoteCallError> {
        let request = self.http.post(table_url(endpoint, None)).json(table);
        let body = self.send(Operation::Create, request).await?;
        decode(Operation::Create, &body)
    }

    pub async fn patch_table(
        &self,
        endpoint: &str,
        id: &str,
        table: &TablePayload<'_>,
    ) -> Result<Timestamps, RemoteCallError> {
        let request = self.http.patch(table_url(endpoint, Some(id))).json(table);
        let body = self.send(Operation::Update, request).await?;
        decode(Operation::Update, &body)
    }

    pub async fn delete_table(&self, endpoint: &str, id: &str) -> Result<(), RemoteCallError> {
        let request = self.http.delete(table_url(endpoint, Some(id)));
        self.send(Operation::Delete, request).await?;
        Ok(())
    }

    async fn send(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<String, RemoteCallError> {
        let network = |source| RemoteCallError::Network { operation, source };
        let response = request.send().await.map_err(network)?;
        let status = response.status();
        let body = response.text().await.map_err(network)?;
        debug!(%operation, %status, %body, "table store answered");
        if !status.is_success() {
            return Err(RemoteCallError::Status {
                operation,
                status,
                body,
            });
        }
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(operation: Operation, body: &str) -> Result<T, RemoteCallError> {
    serde_json::from_str(body).map_err(|source| RemoteCallError::Decode { operation, source })
}

fn table_url(endpoint: &str, id: Option<&str>) -> String {
    let base = endpoint.trim_end_matches('/');
    match id {
        Some(id) => format!("{}/table/{}", base, id),
        None => format!("{}/table", base),
    }
}
