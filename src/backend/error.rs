//! Error taxonomy for backend operations.

use std::sync::Arc;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors returned by backend adapters.
///
/// Only [`BackendError::Transient`] feeds the retry policy; everything else
/// fails the affected record immediately.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Timeout, rate limit, or server-side failure; safe to retry.
    #[error("transient backend failure{}: {reason}", status_suffix(.status))]
    Transient {
        /// HTTP status, when the failure came from a response.
        status: Option<u16>,
        /// Human-readable cause.
        reason: String,
    },

    /// The backend rejected our credentials.
    #[error("backend authentication failed: {0}")]
    Auth(String),

    /// The backend returned a payload that failed boundary validation.
    #[error("invalid record from backend: {0}")]
    InvalidRecord(String),

    /// The backend rejected the request for a non-retryable reason.
    #[error("backend rejected request ({status}): {reason}")]
    Rejected {
        /// HTTP status of the rejection.
        status: u16,
        /// Response body or reason phrase.
        reason: String,
    },

    /// Transport-level failure that is not classifiable as a timeout.
    #[error("backend transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl BackendError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Builds a transient error from an HTTP status.
    #[must_use]
    pub fn transient_status(status: u16, reason: impl Into<String>) -> Self {
        Self::Transient {
            status: Some(status),
            reason: reason.into(),
        }
    }

    /// Builds a transient error with no HTTP status (timeouts, resets).
    #[must_use]
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            status: None,
            reason: reason.into(),
        }
    }

    /// Whether the retry policy should re-attempt the operation.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}
