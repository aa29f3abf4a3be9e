//! `PostgreSQL` adapter for the correlation store.

mod models;
mod schema;
mod store;

pub use store::{CorrelationPgPool, PostgresCorrelationStore};
