//! Version 0 of the provider protocol.
//!
//! A provider process receives exactly one [`Request`] as a line of JSON on
//! its stdin and answers with one [`Response`] line on its stdout. Envelope
//! fields are camelCase; resource properties are snake_case.

use serde::{Deserialize, Serialize};

use super::coerce;

/// The desired state of a table, as declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInputs {
    pub name: String,
    #[serde(deserialize_with = "coerce::size")]
    pub size: i64,
    pub read_only: bool,
    /// Base URL of the table store, e.g. `http://localhost:3000`
    pub endpoint: String,
}

/// Inputs of an existing table, with the bookkeeping recorded when it was
/// last created or updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    #[serde(flatten)]
    pub inputs: TableInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

impl From<TableInputs> for TableState {
    fn from(inputs: TableInputs) -> Self {
        TableState {
            inputs,
            created_at: None,
            modified_at: None,
        }
    }
}

impl From<TableOutputs> for TableState {
    fn from(outputs: TableOutputs) -> Self {
        TableState {
            inputs: TableInputs {
                name: outputs.name,
                size: outputs.size,
                read_only: outputs.read_only,
                endpoint: outputs.endpoint,
            },
            created_at: Some(outputs.created_at),
            modified_at: Some(outputs.modified_at),
        }
    }
}

/// What a provider reports about a table after creating or updating it.
/// Timestamps are empty when the store did not report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOutputs {
    pub name: String,
    pub size: i64,
    pub read_only: bool,
    pub endpoint: String,
    pub created_at: String,
    pub modified_at: String,
}

impl TableOutputs {
    pub fn new(inputs: TableInputs, created_at: String, modified_at: String) -> Self {
        TableOutputs {
            name: inputs.name,
            size: inputs.size,
            read_only: inputs.read_only,
            endpoint: inputs.endpoint,
            created_at,
            modified_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    Create(CreateResourceRequest),
    Diff(DiffResourceRequest),
    Update(UpdateResourceRequest),
    Delete(DeleteResourceRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Create(CreateResourceResponse),
    Diff(DiffResourceResponse),
    Update(UpdateResourceResponse),
    Delete(DeleteResourceResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceRequest {
    pub input_properties: TableInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceResponse {
    /// The identity assigned by the backing store
    pub id: String,
    pub output_properties: TableOutputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResourceRequest {
    pub id: String,
    pub old_inputs: TableInputs,
    pub new_inputs: TableInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResourceResponse {
    pub changes: bool,
    /// Properties whose change requires replacing the resource
    pub replaces: Vec<String>,
    pub delete_before_replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResourceRequest {
    pub id: String,
    pub old_inputs: TableState,
    pub new_inputs: TableInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResourceResponse {
    pub output_properties: TableOutputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResourceRequest {
    pub id: String,
    pub input_properties: TableInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResourceResponse {}
