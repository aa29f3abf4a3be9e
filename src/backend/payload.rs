//! Write payloads sent to a destination backend.

use crate::backend::record::PropertyValue;
use crate::identity::{RecordId, RecordIdentity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A create/update payload for either backend, tagged by destination.
///
/// Every payload carries the origin record's identity so the destination
/// adapter can stamp an origin marker on the created record; the marker is
/// what makes a replayed creation after a crash adoptable instead of
/// duplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "destination", rename_all = "snake_case")]
pub enum DestinationPayload {
    /// Payload for the structured-database service.
    Database(DatabasePayload),
    /// Payload for the task-list service.
    Tasklist(TasklistPayload),
}

impl DestinationPayload {
    /// Returns the origin identity carried by the payload.
    #[must_use]
    pub const fn origin(&self) -> &RecordIdentity {
        match self {
            Self::Database(payload) => &payload.origin,
            Self::Tasklist(payload) => &payload.origin,
        }
    }
}

/// Property writes for a database-side page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabasePayload {
    /// Identity of the record this payload was derived from.
    pub origin: RecordIdentity,
    /// Properties to write, keyed by property name.
    pub properties: BTreeMap<String, PropertyValue>,
}

/// Field writes for a tasklist-side task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasklistPayload {
    /// Identity of the record this payload was derived from.
    pub origin: RecordIdentity,
    /// Task content (title line).
    pub content: String,
    /// Long-form description; `None` leaves the destination value alone.
    #[serde(default)]
    pub description: Option<String>,
    /// Concrete due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Natural-language due string; wins over `due_date` when both are set.
    #[serde(default)]
    pub due_string: Option<String>,
    /// Native priority, 1..4 with 4 most urgent.
    pub priority: u8,
    /// Project name to file the task under.
    #[serde(default)]
    pub project: Option<String>,
    /// Labels to set on the task.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Parent task to nest under.
    #[serde(default)]
    pub parent_id: Option<RecordId>,
    /// Desired completion state.
    #[serde(default)]
    pub completed: bool,
}
