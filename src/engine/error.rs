//! Fatal engine errors.
//!
//! Everything record-scoped (mapping failures, exhausted retries, vanished
//! records) is handled inside the pipeline and reported through
//! [`crate::engine::ReconcileOutcome`]; only failures that make continuing
//! unsafe surface here.

use crate::config::ConfigError;
use crate::correlation::CorrelationStoreError;
use thiserror::Error;

/// Errors that abort a whole run rather than a single record.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The correlation store failed; continuing risks duplicate records.
    #[error(transparent)]
    Store(#[from] CorrelationStoreError),

    /// Configuration could not be read at a reload point.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
