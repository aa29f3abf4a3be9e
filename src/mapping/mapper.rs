//! Record normalization and destination payload construction.

use crate::backend::payload::{DatabasePayload, DestinationPayload, TasklistPayload};
use crate::backend::record::{DatabaseRecord, PropertyValue, RawRecord, TasklistRecord};
use crate::identity::{RecordIdentity, SystemSide};
use crate::mapping::config::{DescriptionAssembly, MappingConfig, TasklistField};
use crate::mapping::error::MappingError;
use crate::mapping::normalized::{DueSpec, NormalizedPriority, NormalizedTask};
use chrono::NaiveDate;
use minijinja::{Environment, UndefinedBehavior};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::warn;

/// Normalizes a raw record into the pipeline's task form.
///
/// Source fields absent from the record are skipped, never an error; the
/// whole mapping table is validated regardless, so a malformed table fails
/// every record deterministically.
///
/// # Errors
///
/// Returns [`MappingError`] on malformed configuration or malformed field
/// data (unknown destination field, broken template, unparseable date,
/// missing title).
pub fn to_normalized(
    record: &RawRecord,
    config: &MappingConfig,
) -> Result<NormalizedTask, MappingError> {
    match record {
        RawRecord::Database(page) => normalize_database(page, config),
        RawRecord::Tasklist(task) => Ok(normalize_tasklist(task)),
    }
}

fn normalize_database(
    page: &DatabaseRecord,
    config: &MappingConfig,
) -> Result<NormalizedTask, MappingError> {
    let mut title: Option<String> = None;
    let mut due_date: Option<NaiveDate> = None;
    let mut due_string: Option<String> = None;
    let mut priority = NormalizedPriority::LOWEST;
    let mut project: Option<String> = None;
    let mut labels: BTreeSet<String> = BTreeSet::new();
    let mut direct_description: Option<String> = None;

    for (source, destination) in &config.field_mapping {
        let field = TasklistField::parse(destination)?;
        let Some(property) = page.property(source) else {
            continue;
        };
        match field {
            TasklistField::Content => title = property.as_plain_text(),
            TasklistField::Description => direct_description = property.as_plain_text(),
            TasklistField::DueDate => {
                if let Some(text) = property.as_plain_text() {
                    due_date = Some(parse_due_date(source, &text)?);
                }
            }
            TasklistField::DueString => due_string = property.as_plain_text(),
            TasklistField::Priority => {
                if let Some(text) = property.as_plain_text() {
                    priority = database_priority(source, &text);
                }
            }
            TasklistField::Project => project = property.as_plain_text(),
            TasklistField::Labels => match property {
                PropertyValue::MultiSelect { names } => {
                    labels = names.iter().cloned().collect();
                }
                other => {
                    if let Some(text) = other.as_plain_text() {
                        labels.insert(text);
                    }
                }
            },
        }
    }

    let description = if config.description.enabled {
        assemble_description(page, &config.description)?
    } else {
        direct_description
    };

    let completed = config.completion.as_ref().is_some_and(|completion| {
        matches!(
            page.property(&completion.field),
            Some(PropertyValue::Status { name }) if *name == completion.done_value
        )
    });

    let title = title.ok_or_else(|| MappingError::MissingTitle(page.id.to_string()))?;

    Ok(NormalizedTask {
        title,
        due: build_due(due_date, due_string),
        priority,
        project,
        labels,
        description,
        completed,
        parent_key: None,
        source: RecordIdentity {
            side: SystemSide::Database,
            id: page.id.clone(),
        },
        source_last_modified: page.last_edited,
    })
}

fn normalize_tasklist(task: &TasklistRecord) -> NormalizedTask {
    NormalizedTask {
        title: task.content.clone(),
        due: build_due(task.due_date, task.due_string.clone()),
        priority: NormalizedPriority::from_tasklist_native(i64::from(task.priority)),
        project: task.project.clone(),
        labels: task.labels.iter().cloned().collect(),
        description: task
            .description
            .clone()
            .filter(|description| !description.is_empty()),
        completed: task.completed,
        parent_key: task.parent_id.clone(),
        source: RecordIdentity {
            side: SystemSide::Tasklist,
            id: task.id.clone(),
        },
        source_last_modified: task.last_modified,
    }
}

/// Builds the write payload for the given destination side.
///
/// Only fields declared in the mapping table are reproduced on the database
/// side; the tasklist side takes the normalized form structurally.
///
/// # Errors
///
/// Returns [`MappingError::UnknownDestinationField`] when the mapping table
/// is malformed.
pub fn to_destination_payload(
    task: &NormalizedTask,
    config: &MappingConfig,
    destination: SystemSide,
) -> Result<DestinationPayload, MappingError> {
    match destination {
        SystemSide::Tasklist => Ok(DestinationPayload::Tasklist(tasklist_payload(task))),
        SystemSide::Database => database_payload(task, config).map(DestinationPayload::Database),
    }
}

fn tasklist_payload(task: &NormalizedTask) -> TasklistPayload {
    TasklistPayload {
        origin: task.source.clone(),
        content: task.title.clone(),
        description: task.description.clone(),
        due_date: task.due.as_ref().and_then(|due| due.date),
        due_string: task.due.as_ref().and_then(|due| due.recurrence.clone()),
        priority: task.priority.to_tasklist_native(),
        project: task.project.clone(),
        labels: task.labels.iter().cloned().collect(),
        parent_id: None,
        completed: task.completed,
    }
}

fn database_payload(
    task: &NormalizedTask,
    config: &MappingConfig,
) -> Result<DatabasePayload, MappingError> {
    let mut properties = std::collections::BTreeMap::new();

    for (source, destination) in &config.field_mapping {
        let field = TasklistField::parse(destination)?;
        let value = match field {
            TasklistField::Content => Some(PropertyValue::Title {
                text: task.title.clone(),
            }),
            TasklistField::Description => task
                .description
                .clone()
                .map(|text| PropertyValue::RichText { text }),
            TasklistField::DueDate => task
                .due
                .as_ref()
                .and_then(|due| due.date)
                .map(|date| PropertyValue::Date {
                    start: date.to_string(),
                }),
            TasklistField::DueString => task
                .due
                .as_ref()
                .and_then(|due| due.recurrence.clone())
                .map(|text| PropertyValue::RichText { text }),
            TasklistField::Priority => Some(PropertyValue::Select {
                name: task.priority.to_database_native().to_string(),
            }),
            TasklistField::Project => task
                .project
                .clone()
                .map(|text| PropertyValue::RichText { text }),
            TasklistField::Labels => {
                if task.labels.is_empty() {
                    None
                } else {
                    Some(PropertyValue::MultiSelect {
                        names: task.labels.iter().cloned().collect(),
                    })
                }
            }
        };
        if let Some(value) = value {
            properties.insert(source.clone(), value);
        }
    }

    // Completion can only be expressed when the record is done: the config
    // names a single done-value, not the full status vocabulary.
    if let Some(completion) = &config.completion
        && task.completed
    {
        properties.insert(
            completion.field.clone(),
            PropertyValue::Status {
                name: completion.done_value.clone(),
            },
        );
    }

    Ok(DatabasePayload {
        origin: task.source.clone(),
        properties,
    })
}

fn build_due(date: Option<NaiveDate>, recurrence: Option<String>) -> Option<DueSpec> {
    let recurrence = recurrence.filter(|value| !value.is_empty());
    let due = DueSpec { date, recurrence };
    if due.is_empty() { None } else { Some(due) }
}

fn parse_due_date(field: &str, value: &str) -> Result<NaiveDate, MappingError> {
    // Datetime values keep only the date part, matching destination
    // granularity.
    let date_part = value.split('T').next().unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| MappingError::InvalidDate {
        field: field.to_owned(),
        value: value.to_owned(),
    })
}

fn database_priority(field: &str, text: &str) -> NormalizedPriority {
    text.trim().parse::<i64>().map_or_else(
        |_| {
            warn!(field, value = text, "non-numeric priority, using lowest");
            NormalizedPriority::LOWEST
        },
        |native| {
            if !(1..=4).contains(&native) {
                warn!(field, value = native, "priority outside 1..=4, clamping");
            }
            NormalizedPriority::from_database_native(native)
        },
    )
}

fn assemble_description(
    page: &DatabaseRecord,
    assembly: &DescriptionAssembly,
) -> Result<Option<String>, MappingError> {
    let mut environment = Environment::new();
    environment.set_undefined_behavior(UndefinedBehavior::Strict);

    let mut parts = Vec::new();
    for field in &assembly.fields {
        let Some(value) = page.property(&field.name).and_then(PropertyValue::as_plain_text) else {
            continue;
        };
        let template = translate_placeholders(&field.format);
        let mut context = Map::new();
        context.insert("label".to_owned(), Value::String(field.label.clone()));
        context.insert("value".to_owned(), Value::String(value));
        let rendered =
            environment
                .render_str(&template, context)
                .map_err(|error| MappingError::Template {
                    field: field.name.clone(),
                    reason: error.to_string(),
                })?;
        parts.push(rendered);
    }

    if parts.is_empty() {
        // No present fields: leave the destination description untouched
        // rather than overwriting manual edits with emptiness.
        Ok(None)
    } else {
        Ok(Some(parts.join(&assembly.separator)))
    }
}

/// Rewrites `{name}` placeholders into template syntax the renderer
/// understands; non-identifier brace contents pass through literally.
fn translate_placeholders(format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut pending = String::new();
    let mut in_brace = false;
    for ch in format.chars() {
        if in_brace {
            if ch == '}' {
                if !pending.is_empty()
                    && pending
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    out.push_str("{{ ");
                    out.push_str(&pending);
                    out.push_str(" }}");
                } else {
                    out.push('{');
                    out.push_str(&pending);
                    out.push('}');
                }
                pending.clear();
                in_brace = false;
            } else if ch == '{' {
                out.push('{');
                out.push_str(&pending);
                pending.clear();
            } else {
                pending.push(ch);
            }
        } else if ch == '{' {
            in_brace = true;
        } else {
            out.push(ch);
        }
    }
    if in_brace {
        out.push('{');
        out.push_str(&pending);
    }
    out
}
