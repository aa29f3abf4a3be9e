//! Health counters surfaced by the status endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared mutable health counters.
#[derive(Debug, Default)]
pub struct HealthState {
    last_success: RwLock<Option<DateTime<Utc>>>,
    failed: AtomicU64,
    conflicts: AtomicU64,
}

impl HealthState {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful reconciliation at the given time.
    pub fn record_success(&self, at: DateTime<Utc>) {
        if let Ok(mut guard) = self.last_success.write() {
            *guard = Some(at);
        }
    }

    /// Records a record-scoped failure.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a resolved-but-noteworthy concurrent edit.
    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Timestamp of the last successful reconciliation, if any.
    #[must_use]
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success.read().ok().and_then(|guard| *guard)
    }

    /// Count of reconciliations that ended in `Failed`.
    #[must_use]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Count of audit-logged conflicts.
    #[must_use]
    pub fn conflict_count(&self) -> u64 {
        self.conflicts.load(Ordering::Relaxed)
    }
}

/// Read-only health report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// Timestamp of the last successful reconciliation.
    pub last_successful_sync: Option<DateTime<Utc>>,
    /// Count of reconciliations currently in `Failed`.
    pub failed_count: u64,
    /// Count of audit-logged conflicts.
    pub conflict_count: u64,
    /// Whether the correlation store answered a reachability probe.
    pub store_reachable: bool,
    /// Number of correlations held, tombstones included.
    pub correlation_count: u64,
}
