//! Backend adapters.

pub mod memory;
pub mod rest;

pub use memory::InMemoryBackend;
pub use rest::{DatabaseRestBackend, TasklistRestBackend};
