//! Error types for field mapping.

use thiserror::Error;

/// Errors raised while mapping records.
///
/// A `MappingError` aborts the affected record only; absent source data is
/// never an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    /// The mapping table names a destination field the tasklist side does
    /// not have.
    #[error("unknown destination field in mapping table: {0}")]
    UnknownDestinationField(String),

    /// A description format template failed to render (for example it
    /// references a placeholder other than `{label}` or `{value}`).
    #[error("description template for field '{field}' failed to render: {reason}")]
    Template {
        /// Configured source field name.
        field: String,
        /// Renderer failure message.
        reason: String,
    },

    /// A date property carried a value that is not an ISO date.
    #[error("unparseable date value '{value}' in field '{field}'")]
    InvalidDate {
        /// Source field name.
        field: String,
        /// Offending value.
        value: String,
    },

    /// The record has no mapped title, which every task requires.
    #[error("record {0} has no mapped title field")]
    MissingTitle(String),
}
