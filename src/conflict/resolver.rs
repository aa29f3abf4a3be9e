//! The conflict resolver proper.

use crate::correlation::CorrelationRecord;
use crate::identity::SystemSide;
use crate::mapping::{NormalizedTask, fingerprint};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which way content flows for one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Database-side content overwrites the tasklist side.
    DatabaseToTasklist,
    /// Tasklist-side content overwrites the database side.
    TasklistToDatabase,
}

impl SyncDirection {
    /// The side whose content wins.
    #[must_use]
    pub const fn winner(self) -> SystemSide {
        match self {
            Self::DatabaseToTasklist => SystemSide::Database,
            Self::TasklistToDatabase => SystemSide::Tasklist,
        }
    }

    /// The side being overwritten.
    #[must_use]
    pub const fn loser(self) -> SystemSide {
        self.winner().counterpart()
    }

    /// Direction whose winner is the given side.
    #[must_use]
    pub const fn from_winner(side: SystemSide) -> Self {
        match side {
            SystemSide::Database => Self::DatabaseToTasklist,
            SystemSide::Tasklist => Self::TasklistToDatabase,
        }
    }
}

/// What the resolver decided for one correlated pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing changed since the last reconciliation; the notification was
    /// duplicate or noise.
    Noop,
    /// Exactly one side changed, or policy picked a winner cleanly.
    Apply(SyncDirection),
    /// Concurrent edits tied on timestamp; a winner was still produced and
    /// the event is recorded for audit.
    ConflictLogged(SyncDirection),
}

/// Global conflict policy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The later `source_last_modified` wins; ties favor the database side.
    #[default]
    LastModifiedWins,
    /// The database side always wins concurrent edits.
    DatabaseWins,
    /// The tasklist side always wins concurrent edits.
    TasklistWins,
}

/// Resolves concurrent edits between the two sides of a correlated pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver {
    policy: ConflictPolicy,
}

impl ConflictResolver {
    /// Creates a resolver with the given policy.
    #[must_use]
    pub const fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    /// Returns the configured policy.
    #[must_use]
    pub const fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Decides what to apply given the stored sync state and both sides'
    /// current content.
    ///
    /// Fingerprints computed here cover mapped fields only, so a webhook
    /// that fired without a real change resolves to [`Resolution::Noop`].
    #[must_use]
    pub fn resolve(
        &self,
        known: &CorrelationRecord,
        database: &NormalizedTask,
        tasklist: &NormalizedTask,
    ) -> Resolution {
        let database_changed =
            fingerprint(database) != *known.fingerprint_on(SystemSide::Database);
        let tasklist_changed =
            fingerprint(tasklist) != *known.fingerprint_on(SystemSide::Tasklist);

        match (database_changed, tasklist_changed) {
            (false, false) => Resolution::Noop,
            (true, false) => Resolution::Apply(SyncDirection::DatabaseToTasklist),
            (false, true) => Resolution::Apply(SyncDirection::TasklistToDatabase),
            (true, true) => self.resolve_concurrent(database, tasklist),
        }
    }

    fn resolve_concurrent(
        &self,
        database: &NormalizedTask,
        tasklist: &NormalizedTask,
    ) -> Resolution {
        match self.policy {
            ConflictPolicy::DatabaseWins => Resolution::Apply(SyncDirection::DatabaseToTasklist),
            ConflictPolicy::TasklistWins => Resolution::Apply(SyncDirection::TasklistToDatabase),
            ConflictPolicy::LastModifiedWins => {
                match database
                    .source_last_modified
                    .cmp(&tasklist.source_last_modified)
                {
                    Ordering::Greater => Resolution::Apply(SyncDirection::DatabaseToTasklist),
                    Ordering::Less => Resolution::Apply(SyncDirection::TasklistToDatabase),
                    // Equal timestamps are realistic with coarse backend
                    // clocks; the fixed preference keeps the outcome
                    // deterministic and the event is audit-logged upstream.
                    Ordering::Equal => {
                        Resolution::ConflictLogged(SyncDirection::DatabaseToTasklist)
                    }
                }
            }
        }
    }
}
