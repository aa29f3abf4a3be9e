//! Relation-field inspection helpers.

use crate::backend::record::{DatabaseRecord, PropertyValue};
use crate::identity::RecordId;
use serde::{Deserialize, Serialize};

/// Fallback title when the configured title field is absent on the parent.
const UNTITLED_PARENT: &str = "Untitled parent";

/// Configuration for deriving task hierarchy from a relation field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentTaskConfig {
    /// Database-side property holding the reference to the parent record.
    pub relation_field: String,

    /// Whether an unsynced parent is materialized as a task on the tasklist
    /// side. When false, children are created unlinked and re-linked once
    /// the parent syncs.
    #[serde(default)]
    pub create_parent: bool,

    /// Which property of the parent record becomes its task title.
    pub title_field: String,
}

/// Extracts the parent reference from a record's relation field, if the
/// field is populated.
///
/// Only the first related id counts; a multi-valued relation carries no
/// hierarchy semantics beyond its head entry.
#[must_use]
pub fn parent_reference(record: &DatabaseRecord, config: &ParentTaskConfig) -> Option<RecordId> {
    match record.property(&config.relation_field) {
        Some(PropertyValue::Relation { ids }) => ids.first().cloned(),
        _ => None,
    }
}

/// Title for a parent task synthesized from the parent record.
///
/// Falls back to a placeholder when the configured title field is missing
/// or empty, so parent creation never fails on sparse records.
#[must_use]
pub fn synthesized_parent_title(record: &DatabaseRecord, config: &ParentTaskConfig) -> String {
    record
        .property(&config.title_field)
        .and_then(PropertyValue::as_plain_text)
        .unwrap_or_else(|| UNTITLED_PARENT.to_owned())
}
