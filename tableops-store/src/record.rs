use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::schema::ValidationError;

/// The business fields of a table: everything a client may set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct TableFields {
    pub name: String,
    pub size: i64,
    #[serde(rename = "readOnly")]
    pub read_only: bool,
}

impl TableFields {
    /// Apply a validated partial object onto these fields, as an RFC 7396
    /// merge patch. Keys absent from `partial` keep their current value.
    pub fn merge(&self, partial: &Map<String, Value>) -> Result<TableFields, ValidationError> {
        let mut document = json!({
            "name": self.name,
            "size": self.size,
            "readOnly": self.read_only,
        });
        json_patch::merge(&mut document, &Value::Object(partial.clone()));
        serde_json::from_value(document).map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}

/// A stored table, as persisted and as returned over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: TableFields,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl TableRecord {
    pub fn new(id: String, fields: TableFields, now: DateTime<Utc>) -> Self {
        TableRecord {
            id,
            fields,
            created_at: now,
            modified_at: now,
        }
    }
}
