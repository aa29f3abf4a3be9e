//! Declarative mapping configuration.

use crate::mapping::error::MappingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full mapping configuration for one sync pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Database property name to tasklist field name. Source fields not
    /// listed here are dropped silently.
    #[serde(default)]
    pub field_mapping: BTreeMap<String, String>,

    /// Description assembly settings.
    #[serde(default)]
    pub description: DescriptionAssembly,

    /// Which database property tracks completion, if any.
    #[serde(default)]
    pub completion: Option<CompletionConfig>,
}

impl MappingConfig {
    /// Returns the database property name mapped to the given tasklist
    /// field, if the table declares one.
    #[must_use]
    pub fn source_field_for(&self, field: TasklistField) -> Option<&str> {
        self.field_mapping
            .iter()
            .find(|(_, destination)| {
                TasklistField::parse(destination).is_ok_and(|parsed| parsed == field)
            })
            .map(|(source, _)| source.as_str())
    }
}

/// The tasklist-side fields a mapping table may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TasklistField {
    /// Task content (title line).
    Content,
    /// Long-form description.
    Description,
    /// Concrete due date.
    DueDate,
    /// Natural-language due string.
    DueString,
    /// Priority.
    Priority,
    /// Project name.
    Project,
    /// Label set.
    Labels,
}

impl TasklistField {
    /// Parses a destination field name from the mapping table.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::UnknownDestinationField`] for names the
    /// tasklist side does not have; that is malformed configuration.
    pub fn parse(name: &str) -> Result<Self, MappingError> {
        match name {
            "content" => Ok(Self::Content),
            "description" => Ok(Self::Description),
            "due_date" => Ok(Self::DueDate),
            "due_string" => Ok(Self::DueString),
            "priority" => Ok(Self::Priority),
            "project" => Ok(Self::Project),
            "labels" => Ok(Self::Labels),
            other => Err(MappingError::UnknownDestinationField(other.to_owned())),
        }
    }
}

/// Configuration for assembling a description out of several source fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionAssembly {
    /// Gates the whole feature.
    #[serde(default)]
    pub enabled: bool,

    /// Separator joining the rendered parts.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Fields to render, in declared order.
    #[serde(default)]
    pub fields: Vec<DescriptionField>,
}

impl Default for DescriptionAssembly {
    fn default() -> Self {
        Self {
            enabled: false,
            separator: default_separator(),
            fields: Vec::new(),
        }
    }
}

fn default_separator() -> String {
    "\n\n".to_owned()
}

/// One source field contributing to the assembled description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionField {
    /// Database property name to read.
    pub name: String,
    /// Label exposed to the format template.
    pub label: String,
    /// Format template; supports `{label}` and `{value}` placeholders.
    pub format: String,
}

/// Which database property tracks completion and which value means done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Status property name.
    pub field: String,
    /// Status value that counts as completed.
    pub done_value: String,
}
