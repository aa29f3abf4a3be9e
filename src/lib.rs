//! Tandem: bidirectional task-record reconciliation.
//!
//! Tandem keeps task records consistent between a structured-database
//! service and a task-list service, each reachable only through its own
//! REST API and webhook channel. For every observed change it decides what
//! the counterpart must become, persists a durable correlation between the
//! two record identities, resolves concurrent edits with a single global
//! policy, and applies decisions idempotently under at-least-once delivery.
//!
//! # Architecture
//!
//! Tandem follows hexagonal architecture principles:
//!
//! - **Domain**: Pure decision logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for stores and backends
//! - **Adapters**: Concrete implementations (Postgres, REST, in-memory)
//!
//! # Modules
//!
//! - [`mapping`]: record ⇄ normalized-task transformation
//! - [`correlation`]: the durable identity link store
//! - [`conflict`]: whole-record winner selection
//! - [`hierarchy`]: one-level parent derivation
//! - [`backend`]: the two backends' boundary contract and adapters
//! - [`intake`]: webhook ingress and poll scan producers
//! - [`engine`]: the reconciliation pipeline itself
//! - [`config`]: externally supplied, hot-reloadable settings

pub mod backend;
pub mod config;
pub mod conflict;
pub mod correlation;
pub mod engine;
pub mod hierarchy;
pub mod identity;
pub mod intake;
pub mod mapping;
