//! Correlation domain types.

mod record;

pub use record::{CorrelationId, CorrelationRecord, PersistedCorrelationData};
