use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    error::{SnapshotError, StoreError},
    id::IdAllocator,
    record::TableRecord,
    schema,
    snapshot::Snapshot,
};

/// The authoritative set of tables.
///
/// Every mutation happens under one lock that also covers writing the
/// snapshot, so concurrent requests cannot lose each other's updates. A
/// request either applies and persists completely, or leaves the set as it
/// was.
pub struct TableStore {
    inner: Mutex<Inner>,
}

struct Inner {
    records: Vec<TableRecord>,
    ids: IdAllocator,
    snapshot: Snapshot,
}

impl Inner {
    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.snapshot.save(&self.records).map_err(|e| {
            warn!(error = %e, "could not write snapshot, reverting change");
            StoreError::Persist(e)
        })
    }
}

impl TableStore {
    /// Open a store backed by `snapshot`, loading whatever it already holds.
    pub fn open(snapshot: Snapshot) -> Result<TableStore, SnapshotError> {
        let records = snapshot.load()?;
        let ids = IdAllocator::resume_after(records.iter().map(|r| r.id.as_str()));
        info!(
            path = %snapshot.path().display(),
            tables = records.len(),
            "loaded table snapshot"
        );
        Ok(TableStore {
            inner: Mutex::new(Inner {
                records,
                ids,
                snapshot,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave a half-applied
        // mutation behind: every change is reverted unless persisted.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self, body: &Value) -> Result<TableRecord, StoreError> {
        let fields = schema::validate_all(body)?;
        let mut inner = self.lock();
        let id = inner.ids.allocate();
        let record = TableRecord::new(id, fields, Utc::now());
        inner.records.push(record.clone());
        if let Err(e) = inner.persist() {
            inner.records.pop();
            return Err(e);
        }
        info!(id = %record.id, name = %record.fields.name, "added table");
        Ok(record)
    }

    /// All tables, in the order they were created.
    pub fn list(&self) -> Vec<TableRecord> {
        self.lock().records.clone()
    }

    pub fn get(&self, id: &str) -> Result<TableRecord, StoreError> {
        let inner = self.lock();
        let index = inner.position(id)?;
        Ok(inner.records[index].clone())
    }

    /// Overwrite the fields present in `body`, leaving the others alone.
    pub fn patch(&self, id: &str, body: &Value) -> Result<TableRecord, StoreError> {
        let mut inner = self.lock();
        let index = inner.position(id)?;
        let partial = schema::validate_present(body)?;

        let previous = inner.records[index].clone();
        let fields = previous.fields.merge(&partial)?;
        let record = TableRecord {
            fields,
            modified_at: Utc::now().max(previous.modified_at),
            ..previous.clone()
        };
        inner.records[index] = record.clone();
        if let Err(e) = inner.persist() {
            inner.records[index] = previous;
            return Err(e);
        }
        debug!(?partial, "applied patch");
        info!(id = %record.id, "patched table");
        Ok(record)
    }

    /// Remove a table, returning it as it was just before removal.
    pub fn delete(&self, id: &str) -> Result<TableRecord, StoreError> {
        let mut inner = self.lock();
        let index = inner.position(id)?;
        let removed = inner.records.remove(index);
        if let Err(e) = inner.persist() {
            inner.records.insert(index, removed);
            return Err(e);
        }
        info!(id = %removed.id, "deleted table");
        Ok(removed)
    }
}
