//! Field mapping between backend records and the normalized task form.
//!
//! Mapping is pure: raw record in, [`NormalizedTask`] out, and back again to
//! a destination payload, driven by a declarative [`MappingConfig`]. Absent
//! data is never an error; only malformed configuration is.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod mapper;
pub mod normalized;

#[cfg(test)]
mod tests;

pub use config::{
    CompletionConfig, DescriptionAssembly, DescriptionField, MappingConfig, TasklistField,
};
pub use error::MappingError;
pub use fingerprint::{Fingerprint, fingerprint};
pub use mapper::{to_destination_payload, to_normalized};
pub use normalized::{DueSpec, NormalizedPriority, NormalizedTask};
