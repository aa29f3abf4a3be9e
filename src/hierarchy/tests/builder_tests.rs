//! Relation-field extraction behaviour.

use crate::backend::record::{DatabaseRecord, PropertyValue};
use crate::hierarchy::{ParentTaskConfig, parent_reference, synthesized_parent_title};
use crate::identity::RecordId;
use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};

#[fixture]
fn config() -> ParentTaskConfig {
    ParentTaskConfig {
        relation_field: "Parent".to_owned(),
        create_parent: false,
        title_field: "Name".to_owned(),
    }
}

fn page(properties: Vec<(&str, PropertyValue)>) -> DatabaseRecord {
    DatabaseRecord {
        id: RecordId::new("page-1"),
        last_edited: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().expect("valid timestamp"),
        properties: properties
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect(),
    }
}

#[rstest]
fn extracts_first_relation_entry(config: ParentTaskConfig) {
    let record = page(vec![(
        "Parent",
        PropertyValue::Relation {
            ids: vec![RecordId::new("parent-1"), RecordId::new("parent-2")],
        },
    )]);

    assert_eq!(
        parent_reference(&record, &config),
        Some(RecordId::new("parent-1"))
    );
}

#[rstest]
fn empty_or_missing_relation_yields_none(config: ParentTaskConfig) {
    let empty = page(vec![("Parent", PropertyValue::Relation { ids: Vec::new() })]);
    assert_eq!(parent_reference(&empty, &config), None);

    let missing = page(Vec::new());
    assert_eq!(parent_reference(&missing, &config), None);
}

#[rstest]
fn non_relation_property_yields_none(config: ParentTaskConfig) {
    let record = page(vec![(
        "Parent",
        PropertyValue::RichText {
            text: "parent-1".to_owned(),
        },
    )]);
    assert_eq!(parent_reference(&record, &config), None);
}

#[rstest]
fn parent_title_comes_from_the_configured_field(config: ParentTaskConfig) {
    let record = page(vec![(
        "Name",
        PropertyValue::Title {
            text: "Quarterly planning".to_owned(),
        },
    )]);

    assert_eq!(
        synthesized_parent_title(&record, &config),
        "Quarterly planning"
    );
}

#[rstest]
fn missing_title_field_falls_back_to_placeholder(config: ParentTaskConfig) {
    let record = page(Vec::new());
    assert_eq!(synthesized_parent_title(&record, &config), "Untitled parent");
}
