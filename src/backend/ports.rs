//! Port contract the apply engine depends on for both backends.

use crate::backend::error::BackendResult;
use crate::backend::payload::DestinationPayload;
use crate::backend::record::RawRecord;
use crate::identity::{RecordId, RecordIdentity, SystemSide};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Outcome of an update or delete against a backend.
///
/// `NotFound` is an outcome rather than an error: a delete against an
/// already-absent record is success, and an update against a vanished record
/// is a delete signal for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write was applied.
    Applied,
    /// The target record does not exist.
    NotFound,
}

/// Uniform surface over one task backend.
///
/// The engine depends only on this shape; each backend's concrete schema and
/// wire protocol stay inside its adapter.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Which side this backend is.
    fn side(&self) -> SystemSide;

    /// Fetches one record; `None` when the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::backend::BackendError`] on transport, auth, or
    /// validation failure.
    async fn fetch(&self, id: &RecordId) -> BackendResult<Option<RawRecord>>;

    /// Creates a record and returns its backend-assigned id.
    ///
    /// The adapter stamps the payload's origin identity on the created
    /// record so [`TaskBackend::find_by_origin`] can locate it later.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::backend::BackendError`] on transport, auth, or
    /// validation failure.
    async fn create(&self, payload: &DestinationPayload) -> BackendResult<RecordId>;

    /// Updates a record.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::backend::BackendError`] on transport, auth, or
    /// validation failure.
    async fn update(
        &self,
        id: &RecordId,
        payload: &DestinationPayload,
    ) -> BackendResult<WriteOutcome>;

    /// Deletes a record. Deleting an absent record yields
    /// [`WriteOutcome::NotFound`], which callers treat as success.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::backend::BackendError`] on transport, auth, or
    /// validation failure.
    async fn delete(&self, id: &RecordId) -> BackendResult<WriteOutcome>;

    /// Looks up the record previously created from `origin`, if any.
    ///
    /// This is the idempotency probe for first syncs: when a prior run
    /// crashed between the API write and correlation persistence, the
    /// counterpart already exists and must be adopted, never re-created.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::backend::BackendError`] on transport, auth, or
    /// validation failure.
    async fn find_by_origin(&self, origin: &RecordIdentity) -> BackendResult<Option<RecordId>>;

    /// Lists records modified after `since`, oldest first, at most `limit`.
    ///
    /// Feeds the poll scan; webhook-delivered changes that were missed are
    /// recovered here.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::backend::BackendError`] on transport, auth, or
    /// validation failure.
    async fn changed_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> BackendResult<Vec<RawRecord>>;
}
