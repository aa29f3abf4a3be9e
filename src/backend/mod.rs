//! Backend boundary: typed records, write payloads, the port contract both
//! task backends implement, and the concrete adapters.
//!
//! Raw payloads from either backend are validated into tagged record types
//! at this boundary; the rest of the pipeline never branches on untyped
//! JSON.

pub mod adapters;
pub mod error;
pub mod payload;
pub mod ports;
pub mod record;

pub use error::{BackendError, BackendResult};
pub use payload::{DatabasePayload, DestinationPayload, TasklistPayload};
pub use ports::{TaskBackend, WriteOutcome};
pub use record::{DatabaseRecord, PropertyValue, RawRecord, TasklistRecord};
