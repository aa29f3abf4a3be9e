//! Externally supplied sync configuration.
//!
//! Configuration is loaded from a JSON file and re-read at the start of
//! each poll run, never mid-run: a reconciliation always sees one coherent
//! snapshot.

mod settings;

#[cfg(test)]
mod tests;

pub use settings::{
    ConfigError, ConfigHandle, PollConfig, PollWindow, RetrySettings, SyncConfig, WebhookSettings,
};
