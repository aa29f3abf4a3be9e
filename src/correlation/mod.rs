//! Durable correlation between the two backends' record identities.
//!
//! A correlation row is the engine's memory of one synced pair: which ids
//! belong together, what content was last observed synced on each side, and
//! whether the pair has been tombstoned by a deletion. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contract in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;

pub use domain::{CorrelationId, CorrelationRecord, PersistedCorrelationData};
pub use ports::{CorrelationStore, CorrelationStoreError, CorrelationStoreResult};
