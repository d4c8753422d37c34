use anyhow::Result;
use async_trait::async_trait;
use tableops_resource::{
    framework::ResourceProvider,
    schema::v0::{self, TableInputs, TableOutputs},
};
use tracing::{debug, info, instrument};

use crate::client::{StoreClient, TablePayload};

/// Reconciles `table` resources against a table store.
///
/// The provider keeps no state of its own: identity comes from the store,
/// and prior state is whatever the caller passes in.
pub struct TableProvider {
    client: StoreClient,
}

impl TableProvider {
    pub fn new(client: StoreClient) -> Self {
        TableProvider { client }
    }
}

/// Whether the store has to be told about the move from `old` to `new`.
///
/// Names are compared case-insensitively, so renaming `Users` to `users`
/// is not a change.
pub fn has_changes(old: &TableInputs, new: &TableInputs) -> bool {
    old.name.to_lowercase() != new.name.to_lowercase()
        || old.size != new.size
        || old.read_only != new.read_only
        || old.endpoint != new.endpoint
}

/// Whether any field stored by the table store differs.
fn table_fields_changed(old: &TableInputs, new: &TableInputs) -> bool {
    old.name != new.name || old.size != new.size || old.read_only != new.read_only
}

#[async_trait]
impl ResourceProvider for TableProvider {
    #[instrument(skip_all, fields(name = %request.input_properties.name))]
    async fn create(
        &self,
        request: v0::CreateResourceRequest,
    ) -> Result<v0::CreateResourceResponse> {
        let inputs = request.input_properties;
        let created = self
            .client
            .create_table(&inputs.endpoint, &TablePayload::from(&inputs))
            .await?;
        let id = created.id();
        info!(%id, "created table");

        let timestamps = created.timestamps;
        Ok(v0::CreateResourceResponse {
            id,
            output_properties: TableOutputs::new(
                inputs,
                timestamps.created_at().unwrap_or_default(),
                timestamps.modified_at().unwrap_or_default(),
            ),
        })
    }

    #[instrument(skip_all, fields(id = %request.id))]
    fn diff(&self, request: v0::DiffResourceRequest) -> Result<v0::DiffResourceResponse> {
        let changes = has_changes(&request.old_inputs, &request.new_inputs);
        debug!(changes, "computed diff");
        Ok(v0::DiffResourceResponse {
            changes,
            replaces: vec![],
            delete_before_replace: false,
        })
    }

    #[instrument(skip_all, fields(id = %request.id))]
    async fn update(
        &self,
        request: v0::UpdateResourceRequest,
    ) -> Result<v0::UpdateResourceResponse> {
        let v0::UpdateResourceRequest {
            id,
            old_inputs,
            new_inputs,
        } = request;

        if !table_fields_changed(&old_inputs.inputs, &new_inputs) {
            info!("table fields unchanged, not calling the store");
            return Ok(v0::UpdateResourceResponse {
                output_properties: TableOutputs::new(
                    new_inputs,
                    old_inputs.created_at.unwrap_or_default(),
                    old_inputs.modified_at.unwrap_or_default(),
                ),
            });
        }

        let timestamps = self
            .client
            .patch_table(&new_inputs.endpoint, &id, &TablePayload::from(&new_inputs))
            .await?;
        info!("updated table");

        Ok(v0::UpdateResourceResponse {
            output_properties: TableOutputs::new(
                new_inputs,
                timestamps
                    .created_at()
                    .or(old_inputs.created_at)
                    .unwrap_or_default(),
                timestamps.modified_at().unwrap_or_default(),
            ),
        })
    }

    #[instrument(skip_all, fields(id = %request.id))]
    async fn delete(
        &self,
        request: v0::DeleteResourceRequest,
    ) -> Result<v0::DeleteResourceResponse> {
        self.client
            .delete_table(&request.input_properties.endpoint, &request.id)
            .await?;
        info!("deleted table");
        Ok(v0::DeleteResourceResponse {})
    }
}

#[cfg(test)]
mod tests {
    use std::{net::Ipv4Addr, sync::Arc, time::Duration};

    use serde_json::Value;
    use tableops_store::{http, Snapshot, TableStore};
    use tokio::{net::TcpListener, sync::oneshot};

    use super::*;
    use crate::client::RemoteCallError;

    /// An endpoint nothing listens on; any call to it fails.
    const DEAD_ENDPOINT: &str = "http://127.0.0.1:1";

    struct TestStore {
        endpoint: String,
        _dir: tempfile::TempDir,
        _shutdown: oneshot::Sender<()>,
    }

    async fn start_store() -> TestStore {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(Snapshot::new(dir.path().join("data.json"))).unwrap();
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = http::serve(listener, Arc::new(store), async move {
                let _ = rx.await;
            })
            .await;
        });
        TestStore {
            endpoint: format!("http://{addr}"),
            _dir: dir,
            _shutdown: tx,
        }
    }

    fn provider() -> TableProvider {
        TableProvider::new(StoreClient::with_timeout(Duration::from_secs(5)).unwrap())
    }

    fn inputs(endpoint: &str) -> TableInputs {
        TableInputs {
            name: "anuj".to_string(),
            size: 100,
            read_only: false,
            endpoint: endpoint.to_string(),
        }
    }

    async fn fetch(endpoint: &str, id: &str) -> (reqwest::StatusCode, Value) {
        let resp = reqwest::get(format!("{endpoint}/table/{id}")).await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    fn diff(old: TableInputs, new: TableInputs) -> v0::DiffResourceResponse {
        provider()
            .diff(v0::DiffResourceRequest {
                id: "1".to_string(),
                old_inputs: old,
                new_inputs: new,
            })
            .unwrap()
    }

    #[test]
    fn test_diff_identical_has_no_changes() {
        let d = diff(inputs("http://a"), inputs("http://a"));
        assert!(!d.changes);
        assert!(d.replaces.is_empty());
        assert!(!d.delete_before_replace);
    }

    #[test]
    fn test_diff_name_is_case_insensitive() {
        let old = TableInputs {
            name: "Foo".to_string(),
            ..inputs("http://a")
        };
        let new = TableInputs {
            name: "foo".to_string(),
            ..inputs("http://a")
        };
        assert!(!diff(old, new).changes);
    }

    #[test]
    fn test_diff_detects_each_field() {
        let base = inputs("http://a");
        let changed = [
            TableInputs {
                name: "other".to_string(),
                ..base.clone()
            },
            TableInputs {
                size: 101,
                ..base.clone()
            },
            TableInputs {
                read_only: true,
                ..base.clone()
            },
            TableInputs {
                endpoint: "http://b".to_string(),
                ..base.clone()
            },
        ];
        for new in changed {
            let d = diff(base.clone(), new);
            assert!(d.changes);
            assert!(d.replaces.is_empty());
            assert!(!d.delete_before_replace);
        }
    }

    #[tokio::test]
    async fn test_create_returns_store_identity() {
        let store = start_store().await;
        let response = provider()
            .create(v0::CreateResourceRequest {
                input_properties: inputs(&store.endpoint),
            })
            .await
            .unwrap();

        let (status, remote) = fetch(&store.endpoint, &response.id).await;
        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(remote["id"], response.id.as_str());
        assert_eq!(remote["name"], "anuj");
        assert_eq!(remote["size"], 100);

        let outputs = response.output_properties;
        assert_eq!(outputs.name, "anuj");
        assert_eq!(outputs.size, 100);
        assert!(!outputs.read_only);
        assert_eq!(outputs.endpoint, store.endpoint);
        assert_eq!(outputs.created_at, remote["createdAt"].as_str().unwrap());
        assert_eq!(outputs.modified_at, outputs.created_at);
    }

    #[tokio::test]
    async fn test_create_rejected_by_store() {
        let store = start_store().await;
        let err = provider()
            .create(v0::CreateResourceRequest {
                input_properties: TableInputs {
                    name: String::new(),
                    ..inputs(&store.endpoint)
                },
            })
            .await
            .unwrap_err();
        let remote = err.downcast_ref::<RemoteCallError>().unwrap();
        assert!(matches!(remote, RemoteCallError::Status { status, .. } if status.as_u16() == 400));
        assert!(!remote.is_retryable());
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("Field name must not be empty"));
    }

    #[tokio::test]
    async fn test_create_unreachable_store() {
        let err = provider()
            .create(v0::CreateResourceRequest {
                input_properties: inputs(DEAD_ENDPOINT),
            })
            .await
            .unwrap_err();
        let remote = err.downcast_ref::<RemoteCallError>().unwrap();
        assert!(remote.is_retryable());
    }

    #[tokio::test]
    async fn test_update_patches_store() {
        let store = start_store().await;
        let created = provider()
            .create(v0::CreateResourceRequest {
                input_properties: inputs(&store.endpoint),
            })
            .await
            .unwrap();

        let new_inputs = TableInputs {
            size: 200,
            read_only: true,
            ..inputs(&store.endpoint)
        };
        let response = provider()
            .update(v0::UpdateResourceRequest {
                id: created.id.clone(),
                old_inputs: created.output_properties.clone().into(),
                new_inputs: new_inputs.clone(),
            })
            .await
            .unwrap();

        let (_, remote) = fetch(&store.endpoint, &created.id).await;
        assert_eq!(remote["size"], 200);
        assert_eq!(remote["readOnly"], true);
        assert_eq!(remote["name"], "anuj");

        let outputs = response.output_properties;
        assert_eq!(outputs.size, 200);
        assert!(outputs.read_only);
        assert_eq!(outputs.created_at, created.output_properties.created_at);
        assert_eq!(outputs.modified_at, remote["modifiedAt"].as_str().unwrap());
    }

    #[tokio::test]
    async fn test_update_without_table_changes_skips_network() {
        // The new endpoint is dead, so any remote call would fail
        let old = v0::TableState {
            inputs: inputs("http://old.example"),
            created_at: Some("2024-05-01T10:00:00Z".to_string()),
            modified_at: Some("2024-05-02T10:00:00Z".to_string()),
        };
        let response = provider()
            .update(v0::UpdateResourceRequest {
                id: "1".to_string(),
                old_inputs: old,
                new_inputs: inputs(DEAD_ENDPOINT),
            })
            .await
            .unwrap();
        assert_eq!(
            response.output_properties,
            TableOutputs::new(
                inputs(DEAD_ENDPOINT),
                "2024-05-01T10:00:00Z".to_string(),
                "2024-05-02T10:00:00Z".to_string(),
            )
        );
    }

    #[tokio::test]
    async fn test_update_without_bookkeeping_gives_empty_timestamps() {
        let response = provider()
            .update(v0::UpdateResourceRequest {
                id: "1".to_string(),
                old_inputs: inputs(DEAD_ENDPOINT).into(),
                new_inputs: inputs(DEAD_ENDPOINT),
            })
            .await
            .unwrap();
        assert_eq!(response.output_properties.created_at, "");
        assert_eq!(response.output_properties.modified_at, "");
    }

    #[tokio::test]
    async fn test_update_missing_table_fails_with_status() {
        let store = start_store().await;
        let err = provider()
            .update(v0::UpdateResourceRequest {
                id: "999".to_string(),
                old_inputs: inputs(&store.endpoint).into(),
                new_inputs: TableInputs {
                    size: 1,
                    ..inputs(&store.endpoint)
                },
            })
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Failed to update table"), "{}", message);
        assert!(message.contains("404"), "{}", message);
        assert!(message.contains("Not found"), "{}", message);
    }

    #[tokio::test]
    async fn test_delete_removes_table() {
        let store = start_store().await;
        let created = provider()
            .create(v0::CreateResourceRequest {
                input_properties: inputs(&store.endpoint),
            })
            .await
            .unwrap();

        provider()
            .delete(v0::DeleteResourceRequest {
                id: created.id.clone(),
                input_properties: inputs(&store.endpoint),
            })
            .await
            .unwrap();

        let (status, _) = fetch(&store.endpoint, &created.id).await;
        assert_eq!(status, reqwest::StatusCode::NOT_FOUND);

        let err = provider()
            .delete(v0::DeleteResourceRequest {
                id: created.id,
                input_properties: inputs(&store.endpoint),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to delete table: 404"));
    }
}
