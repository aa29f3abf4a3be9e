//! Typed record representations for both backends.

use crate::identity::{RecordId, RecordIdentity, SystemSide};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A record fetched from either backend, tagged by origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "system", rename_all = "snake_case")]
pub enum RawRecord {
    /// A page from the structured-database service.
    Database(DatabaseRecord),
    /// A task from the task-list service.
    Tasklist(TasklistRecord),
}

impl RawRecord {
    /// Returns the record's full identity.
    #[must_use]
    pub fn identity(&self) -> RecordIdentity {
        match self {
            Self::Database(record) => RecordIdentity {
                side: SystemSide::Database,
                id: record.id.clone(),
            },
            Self::Tasklist(record) => RecordIdentity {
                side: SystemSide::Tasklist,
                id: record.id.clone(),
            },
        }
    }

    /// Returns the backend-reported last-modification timestamp.
    #[must_use]
    pub const fn last_modified(&self) -> DateTime<Utc> {
        match self {
            Self::Database(record) => record.last_edited,
            Self::Tasklist(record) => record.last_modified,
        }
    }
}

/// A page from the structured-database service: an id, a modification
/// timestamp, and a bag of typed properties keyed by property name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseRecord {
    /// Page id.
    pub id: RecordId,
    /// Last edit timestamp reported by the backend.
    pub last_edited: DateTime<Utc>,
    /// Typed properties keyed by property name.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl DatabaseRecord {
    /// Returns the property with the given name, if present.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// A typed property value on a database-side page.
///
/// Mirrors the property kinds the structured-database API exposes; anything
/// the adapter cannot classify is rejected at the boundary rather than
/// carried as untyped JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    /// The page title.
    Title {
        /// Plain-text title content.
        text: String,
    },
    /// A free-form text property.
    RichText {
        /// Plain-text content.
        text: String,
    },
    /// A single-choice property.
    Select {
        /// Selected option name.
        name: String,
    },
    /// A multiple-choice property.
    MultiSelect {
        /// Selected option names.
        names: Vec<String>,
    },
    /// A date property; `start` is an ISO date or datetime string.
    Date {
        /// ISO-8601 date or datetime.
        start: String,
    },
    /// A workflow-status property.
    Status {
        /// Current status name.
        name: String,
    },
    /// A relation to other pages in the same database.
    Relation {
        /// Related page ids.
        ids: Vec<RecordId>,
    },
    /// A boolean property.
    Checkbox {
        /// Checked state.
        checked: bool,
    },
    /// A numeric property.
    Number {
        /// Numeric value.
        value: f64,
    },
}

impl PropertyValue {
    /// Renders the property as plain text for description assembly.
    ///
    /// Returns `None` when the property carries no content (empty text,
    /// empty selection); callers treat that the same as an absent property.
    #[must_use]
    pub fn as_plain_text(&self) -> Option<String> {
        match self {
            Self::Title { text } | Self::RichText { text } => {
                if text.is_empty() {
                    None
                } else {
                    Some(text.clone())
                }
            }
            Self::Select { name } | Self::Status { name } => {
                if name.is_empty() {
                    None
                } else {
                    Some(name.clone())
                }
            }
            Self::MultiSelect { names } => {
                if names.is_empty() {
                    None
                } else {
                    Some(names.join(", "))
                }
            }
            Self::Date { start } => {
                if start.is_empty() {
                    None
                } else {
                    Some(start.clone())
                }
            }
            Self::Checkbox { checked } => Some(if *checked { "Yes" } else { "No" }.to_owned()),
            Self::Number { value } => Some(value.to_string()),
            Self::Relation { .. } => None,
        }
    }
}

/// A task from the task-list service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasklistRecord {
    /// Task id.
    pub id: RecordId,
    /// Task content (the title line).
    pub content: String,
    /// Long-form description, if any.
    #[serde(default)]
    pub description: Option<String>,
    /// Concrete due date, if any.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Natural-language due string (may encode recurrence), if any.
    #[serde(default)]
    pub due_string: Option<String>,
    /// Native priority, 1..4 with 4 most urgent.
    pub priority: u8,
    /// Project name, if the task belongs to one.
    #[serde(default)]
    pub project: Option<String>,
    /// Labels attached to the task.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Parent task id, if the task is nested.
    #[serde(default)]
    pub parent_id: Option<RecordId>,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Last modification timestamp reported by the backend.
    pub last_modified: DateTime<Utc>,
}
