//! Conflict detection and resolution between concurrent edits.
//!
//! The policy is deliberately global and field-blind: a whole-record winner
//! is chosen, never a per-field merge, trading fidelity for determinism.

mod resolver;

#[cfg(test)]
mod tests;

pub use resolver::{ConflictPolicy, ConflictResolver, Resolution, SyncDirection};
