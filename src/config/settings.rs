//! Configuration types and the reloadable handle.

use crate::conflict::ConflictPolicy;
use crate::hierarchy::ParentTaskConfig;
use crate::mapping::MappingConfig;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`SyncConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The handle lock was poisoned by a panicking reader or writer.
    #[error("config handle poisoned: {0}")]
    Poisoned(String),
}

/// Whole-process sync configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Field mapping, description assembly, and completion settings.
    #[serde(default)]
    pub mapping: MappingConfig,

    /// Parent-task derivation settings, if hierarchy is synced.
    #[serde(default)]
    pub parent_task: Option<ParentTaskConfig>,

    /// Global conflict policy.
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// Poll scan settings.
    #[serde(default)]
    pub poll: PollConfig,

    /// Retry policy for outbound backend calls.
    #[serde(default)]
    pub retry: RetrySettings,

    /// Maximum concurrent outbound reconciliations.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Webhook ingress settings.
    #[serde(default)]
    pub webhooks: WebhookSettings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mapping: MappingConfig::default(),
            parent_task: None,
            conflict_policy: ConflictPolicy::default(),
            poll: PollConfig::default(),
            retry: RetrySettings::default(),
            workers: default_workers(),
            webhooks: WebhookSettings::default(),
        }
    }
}

/// Poll scan settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Seconds between poll runs.
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    /// Optional time-of-day window restricting poll activity.
    #[serde(default)]
    pub window: Option<PollWindow>,

    /// Upper bound on records processed per poll run; overflow defers to
    /// the next run in original change order.
    #[serde(default = "default_max_records")]
    pub max_records_per_run: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            window: None,
            max_records_per_run: default_max_records(),
        }
    }
}

/// Inclusive-start, exclusive-end time-of-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollWindow {
    /// Window start ("09:00").
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    /// Window end ("17:00").
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl PollWindow {
    /// Whether the given time of day falls inside the window. Windows that
    /// wrap midnight are supported.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// Retry policy settings for outbound backend calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    /// Maximum attempts per operation, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Outbound request timeout, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Webhook ingress settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookSettings {
    /// Shared secret for tasklist-side signature validation. Requests are
    /// rejected when unset.
    #[serde(default)]
    pub tasklist_secret: Option<String>,
}

const fn default_poll_interval() -> u64 {
    60
}

const fn default_max_records() -> usize {
    100
}

const fn default_workers() -> usize {
    4
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_delay_ms() -> u64 {
    500
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

const fn default_timeout_ms() -> u64 {
    10_000
}

impl SyncConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Shared, reloadable configuration snapshot.
///
/// Consumers take an [`Arc`] snapshot per run; [`ConfigHandle::reload`] is
/// called between runs only, so a running reconciliation never observes a
/// mid-flight change.
#[derive(Debug)]
pub struct ConfigHandle {
    path: Option<PathBuf>,
    current: RwLock<Arc<SyncConfig>>,
}

impl ConfigHandle {
    /// Creates a handle around a fixed in-memory configuration (tests,
    /// embedded use).
    #[must_use]
    pub fn fixed(config: SyncConfig) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Creates a handle backed by a config file, loading it immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the initial load fails.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = SyncConfig::from_path(&path)?;
        Ok(Self {
            path: Some(path),
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// Returns the current configuration snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Poisoned`] when the handle lock is poisoned.
    pub fn snapshot(&self) -> Result<Arc<SyncConfig>, ConfigError> {
        self.current
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|err| ConfigError::Poisoned(err.to_string()))
    }

    /// Re-reads the config file, replacing the snapshot. A handle without a
    /// backing file keeps its fixed configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed; the
    /// previous snapshot stays in place in that case.
    pub fn reload(&self) -> Result<Arc<SyncConfig>, ConfigError> {
        let Some(path) = &self.path else {
            return self.snapshot();
        };
        let fresh = Arc::new(SyncConfig::from_path(path)?);
        let mut guard = self
            .current
            .write()
            .map_err(|err| ConfigError::Poisoned(err.to_string()))?;
        *guard = Arc::clone(&fresh);
        Ok(fresh)
    }
}

mod hhmm {
    //! Serde helpers for "HH:MM" times.

    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(D::Error::custom)
    }
}
