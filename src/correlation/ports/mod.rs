//! Port contracts for correlation persistence.

mod store;

pub use store::{CorrelationStore, CorrelationStoreError, CorrelationStoreResult};
