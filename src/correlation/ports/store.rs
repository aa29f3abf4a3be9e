//! Store port for correlation persistence and the pending-parent index.

use crate::correlation::domain::{CorrelationId, CorrelationRecord};
use crate::identity::{RecordId, RecordIdentity};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for correlation store operations.
pub type CorrelationStoreResult<T> = Result<T, CorrelationStoreError>;

/// Correlation persistence contract.
///
/// Implementations must serialize read-modify-write sequences per row;
/// concurrent operations on different rows may proceed in parallel. Store
/// failures are the only fatal errors in the pipeline: continuing without
/// the store risks duplicate records.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Stores a new correlation.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationStoreError::DuplicateIdentity`] when either side
    /// of the pair is already correlated.
    async fn insert(&self, record: &CorrelationRecord) -> CorrelationStoreResult<()>;

    /// Persists changes to an existing correlation (fingerprints, sync
    /// timestamp, parent link, tombstone).
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationStoreError::NotFound`] when the correlation does
    /// not exist.
    async fn update(&self, record: &CorrelationRecord) -> CorrelationStoreResult<()>;

    /// Finds the correlation holding the given identity on its matching
    /// side. `None` means "never synced".
    async fn find_by_identity(
        &self,
        identity: &RecordIdentity,
    ) -> CorrelationStoreResult<Option<CorrelationRecord>>;

    /// Finds a correlation by its identifier.
    async fn find_by_id(
        &self,
        id: CorrelationId,
    ) -> CorrelationStoreResult<Option<CorrelationRecord>>;

    /// Records that `child` is waiting for the record `parent_source_id`
    /// (on the child's own side) to gain a correlation.
    async fn add_pending_parent_link(
        &self,
        child: &RecordIdentity,
        parent_source_id: &RecordId,
    ) -> CorrelationStoreResult<()>;

    /// Removes and returns the identities of children waiting on the given
    /// parent source record.
    async fn take_pending_children(
        &self,
        parent_source_id: &RecordId,
    ) -> CorrelationStoreResult<Vec<RecordIdentity>>;

    /// Number of correlations held, tombstoned rows included.
    async fn count(&self) -> CorrelationStoreResult<u64>;

    /// Cheap reachability probe for health reporting.
    async fn ping(&self) -> CorrelationStoreResult<()>;
}

/// Errors returned by correlation store implementations.
#[derive(Debug, Clone, Error)]
pub enum CorrelationStoreError {
    /// One side of the pair is already correlated.
    #[error("identity already correlated: {0}")]
    DuplicateIdentity(RecordIdentity),

    /// The correlation was not found.
    #[error("correlation not found: {0}")]
    NotFound(CorrelationId),

    /// Persistence-layer failure; fatal to the surrounding run.
    #[error("correlation store error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl CorrelationStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
