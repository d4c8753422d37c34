//! The table store: the authoritative set of table records, kept in memory
//! and rewritten to a single JSON snapshot after every mutation.
//!
//! The store is reachable over HTTP (see [`http`]); resource providers talk
//! to it to converge the actual tables with the desired ones.

pub mod error;
pub mod http;
pub mod id;
pub mod record;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use error::{SnapshotError, StoreError};
pub use record::{TableFields, TableRecord};
pub use snapshot::Snapshot;
pub use store::TableStore;
