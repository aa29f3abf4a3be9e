//! The normalized task form shared by both mapping directions.

use crate::identity::{RecordId, RecordIdentity};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Due information: a concrete date, a recurrence string, or both.
///
/// When both are present the recurrence string wins at the destination; the
/// date is kept for fingerprinting and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueSpec {
    /// Concrete due date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Natural-language due string, possibly recurring ("every monday").
    #[serde(default)]
    pub recurrence: Option<String>,
}

impl DueSpec {
    /// A due spec holding only a concrete date.
    #[must_use]
    pub const fn on_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            recurrence: None,
        }
    }

    /// Whether any due information is present at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.date.is_none() && self.recurrence.is_none()
    }
}

/// Priority on the normalized 1..=4 scale, 4 most urgent.
///
/// The database side natively uses 1..=4 with 1 most urgent; the tasklist
/// side natively matches the normalized scale. Values outside either native
/// domain clamp to the nearest bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedPriority(u8);

impl NormalizedPriority {
    /// Lowest urgency.
    pub const LOWEST: Self = Self(1);
    /// Highest urgency.
    pub const HIGHEST: Self = Self(4);

    /// Clamps an arbitrary value onto the normalized scale.
    #[must_use]
    pub const fn clamped(value: i64) -> Self {
        match value {
            i64::MIN..=1 => Self(1),
            2 => Self(2),
            3 => Self(3),
            _ => Self(4),
        }
    }

    /// Converts from the database side's native scale (1 most urgent).
    #[must_use]
    pub const fn from_database_native(value: i64) -> Self {
        let clamped = Self::clamped(value);
        Self(5 - clamped.0)
    }

    /// Converts to the database side's native scale (1 most urgent).
    #[must_use]
    pub const fn to_database_native(self) -> u8 {
        5 - self.0
    }

    /// Converts from the tasklist side's native scale (same as normalized).
    #[must_use]
    pub const fn from_tasklist_native(value: i64) -> Self {
        Self::clamped(value)
    }

    /// Converts to the tasklist side's native scale.
    #[must_use]
    pub const fn to_tasklist_native(self) -> u8 {
        self.0
    }

    /// Returns the normalized value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for NormalizedPriority {
    fn default() -> Self {
        Self::LOWEST
    }
}

impl fmt::Display for NormalizedPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record reduced to the fields the sync pipeline reasons about.
///
/// Owned exclusively by the pipeline pass that produced it; never shared
/// across concurrent reconciliations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTask {
    /// Task title.
    pub title: String,
    /// Due information, if any.
    pub due: Option<DueSpec>,
    /// Normalized priority.
    pub priority: NormalizedPriority,
    /// Project name, if any.
    pub project: Option<String>,
    /// Label set, deterministically ordered.
    pub labels: BTreeSet<String>,
    /// Assembled or mapped description. `None` means "leave the destination
    /// value alone", never the empty string.
    pub description: Option<String>,
    /// Completion state.
    pub completed: bool,
    /// Unresolved reference to a parent record on the origin side.
    pub parent_key: Option<RecordId>,
    /// Identity of the record this task was normalized from.
    pub source: RecordIdentity,
    /// Modification timestamp reported by the origin backend.
    pub source_last_modified: DateTime<Utc>,
}
