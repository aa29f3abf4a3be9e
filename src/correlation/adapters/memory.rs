//! In-memory correlation store for tests and single-process runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::correlation::{
    domain::{CorrelationId, CorrelationRecord},
    ports::{CorrelationStore, CorrelationStoreError, CorrelationStoreResult},
};
use crate::identity::{RecordId, RecordIdentity, SystemSide};

/// Thread-safe in-memory correlation store.
///
/// The single lock over the whole state gives the per-row serialization the
/// port requires; contention is irrelevant at test scale.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorrelationStore {
    state: Arc<RwLock<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    records: HashMap<CorrelationId, CorrelationRecord>,
    database_index: HashMap<RecordId, CorrelationId>,
    tasklist_index: HashMap<RecordId, CorrelationId>,
    pending_parents: HashMap<RecordId, Vec<RecordIdentity>>,
}

impl InMemoryCorrelationStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> CorrelationStoreError {
    CorrelationStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl CorrelationStore for InMemoryCorrelationStore {
    async fn insert(&self, record: &CorrelationRecord) -> CorrelationStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;

        let database_id = record.id_on(SystemSide::Database).clone();
        if state.database_index.contains_key(&database_id) {
            return Err(CorrelationStoreError::DuplicateIdentity(RecordIdentity {
                side: SystemSide::Database,
                id: database_id,
            }));
        }
        let tasklist_id = record.id_on(SystemSide::Tasklist).clone();
        if state.tasklist_index.contains_key(&tasklist_id) {
            return Err(CorrelationStoreError::DuplicateIdentity(RecordIdentity {
                side: SystemSide::Tasklist,
                id: tasklist_id,
            }));
        }

        state.database_index.insert(database_id, record.id());
        state.tasklist_index.insert(tasklist_id, record.id());
        state.records.insert(record.id(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &CorrelationRecord) -> CorrelationStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if !state.records.contains_key(&record.id()) {
            return Err(CorrelationStoreError::NotFound(record.id()));
        }
        state.records.insert(record.id(), record.clone());
        Ok(())
    }

    async fn find_by_identity(
        &self,
        identity: &RecordIdentity,
    ) -> CorrelationStoreResult<Option<CorrelationRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        let index = match identity.side {
            SystemSide::Database => &state.database_index,
            SystemSide::Tasklist => &state.tasklist_index,
        };
        Ok(index
            .get(&identity.id)
            .and_then(|id| state.records.get(id))
            .cloned())
    }

    async fn find_by_id(
        &self,
        id: CorrelationId,
    ) -> CorrelationStoreResult<Option<CorrelationRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.records.get(&id).cloned())
    }

    async fn add_pending_parent_link(
        &self,
        child: &RecordIdentity,
        parent_source_id: &RecordId,
    ) -> CorrelationStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let waiting = state
            .pending_parents
            .entry(parent_source_id.clone())
            .or_default();
        if !waiting.contains(child) {
            waiting.push(child.clone());
        }
        Ok(())
    }

    async fn take_pending_children(
        &self,
        parent_source_id: &RecordId,
    ) -> CorrelationStoreResult<Vec<RecordIdentity>> {
        let mut state = self.state.write().map_err(lock_error)?;
        Ok(state
            .pending_parents
            .remove(parent_source_id)
            .unwrap_or_default())
    }

    async fn count(&self) -> CorrelationStoreResult<u64> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(u64::try_from(state.records.len()).unwrap_or(u64::MAX))
    }

    async fn ping(&self) -> CorrelationStoreResult<()> {
        self.state.read().map_err(lock_error).map(|_| ())
    }
}
