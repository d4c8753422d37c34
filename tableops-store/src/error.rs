use std::{io, path::PathBuf};

use crate::schema::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("could not access snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot {} is not a valid table list: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of a store operation.
///
/// The `Display` output is the message sent back to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Not found")]
    NotFound { id: String },
    #[error("Could not persist tables: {0}")]
    Persist(#[from] SnapshotError),
    /// The worker running the operation panicked or was cancelled.
    #[error("Internal error: {0}")]
    Task(#[from] tokio::task::JoinError),
}
