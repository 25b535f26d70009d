//! Script store contract and a volatile in-memory implementation.
//!
//! The PostgreSQL implementation lives in the `db` crate; the API only ever
//! sees an `Arc<dyn ScriptStore>`.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::CoreError;
use crate::script::{ScriptLookup, ScriptRecord, ScriptSummary};

/// Durable table of script records with exact-match lookup.
///
/// Failures of the backing storage are reported as
/// [`CoreError::StoreUnavailable`].
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// Insert one record. Ids are assigned by the caller.
    async fn insert(&self, record: &ScriptRecord) -> Result<(), CoreError>;

    /// Find a single record. When several records share a name, the earliest
    /// created one is returned.
    async fn find_one(&self, lookup: &ScriptLookup) -> Result<Option<ScriptRecord>, CoreError>;

    /// Lazily enumerate all records, oldest first.
    fn list_all(&self) -> BoxStream<'static, Result<ScriptSummary, CoreError>>;

    /// Delete every matching record, returning how many were removed.
    /// Deleting nothing is not an error.
    async fn delete(&self, lookup: &ScriptLookup) -> Result<u64, CoreError>;

    /// Check that the backing storage is reachable.
    async fn health_check(&self) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryScriptStore {
    records: RwLock<Vec<ScriptRecord>>,
}

impl InMemoryScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Writers never leave the Vec half-updated, so a poisoned lock is still
    // safe to read.
    fn read(&self) -> RwLockReadGuard<'_, Vec<ScriptRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<ScriptRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn matches(record: &ScriptRecord, lookup: &ScriptLookup) -> bool {
    match lookup {
        ScriptLookup::Id(id) => record.id == *id,
        ScriptLookup::Name(name) => record.name == *name,
    }
}

#[async_trait]
impl ScriptStore for InMemoryScriptStore {
    async fn insert(&self, record: &ScriptRecord) -> Result<(), CoreError> {
        let mut records = self.write();
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(CoreError::StoreUnavailable(format!(
                "duplicate script id {}",
                record.id
            )));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn find_one(&self, lookup: &ScriptLookup) -> Result<Option<ScriptRecord>, CoreError> {
        let records = self.read();
        Ok(records
            .iter()
            .filter(|record| matches(record, lookup))
            .min_by_key(|record| (record.created_at, record.id))
            .cloned())
    }

    fn list_all(&self) -> BoxStream<'static, Result<ScriptSummary, CoreError>> {
        let mut summaries: Vec<ScriptSummary> =
            self.read().iter().map(ScriptSummary::from).collect();
        summaries.sort_by_key(|summary| (summary.created_at, summary.id));
        stream::iter(summaries.into_iter().map(Ok)).boxed()
    }

    async fn delete(&self, lookup: &ScriptLookup) -> Result<u64, CoreError> {
        let mut records = self.write();
        let before = records.len();
        records.retain(|record| !matches(record, lookup));
        Ok((before - records.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}
