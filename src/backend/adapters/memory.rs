//! In-memory backend fake for engine and integration tests.

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::payload::{DatabasePayload, DestinationPayload, TasklistPayload};
use crate::backend::ports::{TaskBackend, WriteOutcome};
use crate::backend::record::{DatabaseRecord, RawRecord, TasklistRecord};
use crate::identity::{RecordId, RecordIdentity, SystemSide};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

/// A write observed by the fake, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteEvent {
    /// A record was created.
    Created(RecordId),
    /// A record was updated.
    Updated(RecordId),
    /// A record was deleted.
    Deleted(RecordId),
}

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<RecordId, RawRecord>,
    origin_markers: HashMap<RecordIdentity, RecordId>,
    writes: Vec<WriteEvent>,
    scripted_failures: VecDeque<BackendError>,
    next_id: u64,
}

/// Thread-safe in-memory backend holding records for one side.
///
/// Supports scripted failures so retry and failure paths are exercisable
/// without a network.
#[derive(Debug, Clone)]
pub struct InMemoryBackend<C: Clock> {
    side: SystemSide,
    clock: Arc<C>,
    state: Arc<RwLock<State>>,
}

impl<C: Clock> InMemoryBackend<C> {
    /// Creates an empty backend for the given side.
    #[must_use]
    pub fn new(side: SystemSide, clock: Arc<C>) -> Self {
        Self {
            side,
            clock,
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Seeds a record, bypassing the write log.
    ///
    /// # Panics
    ///
    /// Panics when the state lock is poisoned; acceptable in test fakes.
    pub fn seed(&self, record: RawRecord) {
        let mut state = self.state.write().expect("state lock poisoned");
        state.records.insert(record.identity().id, record);
    }

    /// Seeds an origin marker, as if the record had been created from the
    /// given origin by a previous (possibly crashed) run.
    ///
    /// # Panics
    ///
    /// Panics when the state lock is poisoned; acceptable in test fakes.
    pub fn seed_origin_marker(&self, origin: RecordIdentity, id: RecordId) {
        let mut state = self.state.write().expect("state lock poisoned");
        state.origin_markers.insert(origin, id);
    }

    /// Queues an error returned by the next backend operation.
    ///
    /// # Panics
    ///
    /// Panics when the state lock is poisoned; acceptable in test fakes.
    pub fn push_failure(&self, error: BackendError) {
        let mut state = self.state.write().expect("state lock poisoned");
        state.scripted_failures.push_back(error);
    }

    /// Snapshot of the observed write log.
    ///
    /// # Panics
    ///
    /// Panics when the state lock is poisoned; acceptable in test fakes.
    #[must_use]
    pub fn writes(&self) -> Vec<WriteEvent> {
        let state = self.state.read().expect("state lock poisoned");
        state.writes.clone()
    }

    /// Returns a stored record by id.
    ///
    /// # Panics
    ///
    /// Panics when the state lock is poisoned; acceptable in test fakes.
    #[must_use]
    pub fn record(&self, id: &RecordId) -> Option<RawRecord> {
        let state = self.state.read().expect("state lock poisoned");
        state.records.get(id).cloned()
    }

    fn lock_error(err: impl ToString) -> BackendError {
        BackendError::transport(std::io::Error::other(err.to_string()))
    }

    fn take_scripted_failure(state: &mut State) -> Option<BackendError> {
        state.scripted_failures.pop_front()
    }

    fn mint_id(&self, state: &mut State) -> RecordId {
        state.next_id += 1;
        let prefix = match self.side {
            SystemSide::Database => "db",
            SystemSide::Tasklist => "tl",
        };
        RecordId::new(format!("{prefix}-{}", state.next_id))
    }

    fn materialize(
        &self,
        id: RecordId,
        payload: &DestinationPayload,
        now: DateTime<Utc>,
    ) -> BackendResult<RawRecord> {
        match (self.side, payload) {
            (SystemSide::Database, DestinationPayload::Database(database)) => Ok(
                RawRecord::Database(database_record(id, database, now)),
            ),
            (SystemSide::Tasklist, DestinationPayload::Tasklist(tasklist)) => Ok(
                RawRecord::Tasklist(tasklist_record(id, tasklist, now)),
            ),
            _ => Err(BackendError::InvalidRecord(
                "payload destination does not match backend side".to_owned(),
            )),
        }
    }
}

fn database_record(id: RecordId, payload: &DatabasePayload, now: DateTime<Utc>) -> DatabaseRecord {
    DatabaseRecord {
        id,
        last_edited: now,
        properties: payload.properties.clone(),
    }
}

fn tasklist_record(id: RecordId, payload: &TasklistPayload, now: DateTime<Utc>) -> TasklistRecord {
    TasklistRecord {
        id,
        content: payload.content.clone(),
        description: payload.description.clone(),
        due_date: payload.due_date,
        due_string: payload.due_string.clone(),
        priority: payload.priority,
        project: payload.project.clone(),
        labels: payload.labels.clone(),
        parent_id: payload.parent_id.clone(),
        completed: payload.completed,
        last_modified: now,
    }
}

fn merge_update(existing: &RawRecord, fresh: RawRecord) -> RawRecord {
    match (existing, fresh) {
        (RawRecord::Tasklist(old), RawRecord::Tasklist(mut new)) => {
            // An update without an explicit parent keeps the existing link.
            if new.parent_id.is_none() {
                new.parent_id = old.parent_id.clone();
            }
            RawRecord::Tasklist(new)
        }
        (RawRecord::Database(old), RawRecord::Database(mut new)) => {
            // Properties not present in the payload keep their old values.
            for (name, value) in &old.properties {
                new.properties
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
            RawRecord::Database(new)
        }
        (_, fresh) => fresh,
    }
}

#[async_trait]
impl<C: Clock + Send + Sync> TaskBackend for InMemoryBackend<C> {
    fn side(&self) -> SystemSide {
        self.side
    }

    async fn fetch(&self, id: &RecordId) -> BackendResult<Option<RawRecord>> {
        let mut state = self.state.write().map_err(Self::lock_error)?;
        if let Some(failure) = Self::take_scripted_failure(&mut state) {
            return Err(failure);
        }
        Ok(state.records.get(id).cloned())
    }

    async fn create(&self, payload: &DestinationPayload) -> BackendResult<RecordId> {
        let now = self.clock.utc();
        let mut state = self.state.write().map_err(Self::lock_error)?;
        if let Some(failure) = Self::take_scripted_failure(&mut state) {
            return Err(failure);
        }
        let id = self.mint_id(&mut state);
        let record = self.materialize(id.clone(), payload, now)?;
        state.records.insert(id.clone(), record);
        state
            .origin_markers
            .insert(payload.origin().clone(), id.clone());
        state.writes.push(WriteEvent::Created(id.clone()));
        Ok(id)
    }

    async fn update(
        &self,
        id: &RecordId,
        payload: &DestinationPayload,
    ) -> BackendResult<WriteOutcome> {
        let now = self.clock.utc();
        let mut state = self.state.write().map_err(Self::lock_error)?;
        if let Some(failure) = Self::take_scripted_failure(&mut state) {
            return Err(failure);
        }
        let Some(existing) = state.records.get(id).cloned() else {
            return Ok(WriteOutcome::NotFound);
        };
        let fresh = self.materialize(id.clone(), payload, now)?;
        let merged = merge_update(&existing, fresh);
        state.records.insert(id.clone(), merged);
        state.writes.push(WriteEvent::Updated(id.clone()));
        Ok(WriteOutcome::Applied)
    }

    async fn delete(&self, id: &RecordId) -> BackendResult<WriteOutcome> {
        let mut state = self.state.write().map_err(Self::lock_error)?;
        if let Some(failure) = Self::take_scripted_failure(&mut state) {
            return Err(failure);
        }
        if state.records.remove(id).is_none() {
            return Ok(WriteOutcome::NotFound);
        }
        state.writes.push(WriteEvent::Deleted(id.clone()));
        Ok(WriteOutcome::Applied)
    }

    async fn find_by_origin(&self, origin: &RecordIdentity) -> BackendResult<Option<RecordId>> {
        let mut state = self.state.write().map_err(Self::lock_error)?;
        if let Some(failure) = Self::take_scripted_failure(&mut state) {
            return Err(failure);
        }
        // A marker pointing at a since-deleted record is stale, not a hit.
        let id = state
            .origin_markers
            .get(origin)
            .filter(|id| state.records.contains_key(*id))
            .cloned();
        Ok(id)
    }

    async fn changed_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> BackendResult<Vec<RawRecord>> {
        let mut state = self.state.write().map_err(Self::lock_error)?;
        if let Some(failure) = Self::take_scripted_failure(&mut state) {
            return Err(failure);
        }
        let mut changed: Vec<RawRecord> = state
            .records
            .values()
            .filter(|record| record.last_modified() > since)
            .cloned()
            .collect();
        changed.sort_by_key(RawRecord::last_modified);
        changed.truncate(limit);
        Ok(changed)
    }
}
