//! Resolution decisions across change combinations.

use crate::conflict::{ConflictPolicy, ConflictResolver, Resolution, SyncDirection};
use crate::correlation::CorrelationRecord;
use crate::identity::{RecordId, RecordIdentity, SystemSide};
use crate::mapping::{NormalizedPriority, NormalizedTask, fingerprint};
use chrono::{DateTime, TimeZone, Utc};
use mockable::DefaultClock;
use rstest::rstest;
use std::collections::BTreeSet;

fn task(side: SystemSide, title: &str, modified: DateTime<Utc>) -> NormalizedTask {
    NormalizedTask {
        title: title.to_owned(),
        due: None,
        priority: NormalizedPriority::LOWEST,
        project: None,
        labels: BTreeSet::new(),
        description: None,
        completed: false,
        parent_key: None,
        source: RecordIdentity::new(
            side,
            match side {
                SystemSide::Database => "page-1",
                SystemSide::Tasklist => "task-9",
            },
        ),
        source_last_modified: modified,
    }
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).single().expect("valid timestamp")
}

fn known(database: &NormalizedTask, tasklist: &NormalizedTask) -> CorrelationRecord {
    CorrelationRecord::new(
        RecordId::new("page-1"),
        RecordId::new("task-9"),
        fingerprint(database),
        fingerprint(tasklist),
        &DefaultClock,
    )
}

#[rstest]
fn unchanged_content_is_a_noop_even_when_notified() {
    let database = task(SystemSide::Database, "Task", at(10));
    let tasklist = task(SystemSide::Tasklist, "Task", at(10));
    let correlation = known(&database, &tasklist);
    let resolver = ConflictResolver::default();

    for _ in 0..5 {
        assert_eq!(
            resolver.resolve(&correlation, &database, &tasklist),
            Resolution::Noop
        );
    }
}

#[rstest]
fn single_sided_database_change_flows_to_tasklist() {
    let database = task(SystemSide::Database, "Task", at(10));
    let tasklist = task(SystemSide::Tasklist, "Task", at(10));
    let correlation = known(&database, &tasklist);

    let mut edited = database.clone();
    edited.title = "Task (edited)".to_owned();

    assert_eq!(
        ConflictResolver::default().resolve(&correlation, &edited, &tasklist),
        Resolution::Apply(SyncDirection::DatabaseToTasklist)
    );
}

#[rstest]
fn single_sided_tasklist_change_flows_to_database() {
    let database = task(SystemSide::Database, "Task", at(10));
    let tasklist = task(SystemSide::Tasklist, "Task", at(10));
    let correlation = known(&database, &tasklist);

    let mut edited = tasklist.clone();
    edited.completed = true;

    assert_eq!(
        ConflictResolver::default().resolve(&correlation, &database, &edited),
        Resolution::Apply(SyncDirection::TasklistToDatabase)
    );
}

#[rstest]
fn later_edit_wins_concurrent_changes() {
    let database = task(SystemSide::Database, "Task", at(10));
    let tasklist = task(SystemSide::Tasklist, "Task", at(10));
    let correlation = known(&database, &tasklist);

    let mut database_edit = database.clone();
    database_edit.title = "Database edit".to_owned();
    database_edit.source_last_modified = at(11);

    let mut tasklist_edit = tasklist.clone();
    tasklist_edit.title = "Tasklist edit".to_owned();
    tasklist_edit.source_last_modified = at(12);

    assert_eq!(
        ConflictResolver::default().resolve(&correlation, &database_edit, &tasklist_edit),
        Resolution::Apply(SyncDirection::TasklistToDatabase),
        "the later edit (tasklist, T2 > T1) must win"
    );
}

#[rstest]
fn mirrored_timestamps_yield_the_mirrored_outcome() {
    let database = task(SystemSide::Database, "Task", at(10));
    let tasklist = task(SystemSide::Tasklist, "Task", at(10));
    let correlation = known(&database, &tasklist);

    let mut database_edit = database.clone();
    database_edit.title = "Database edit".to_owned();
    database_edit.source_last_modified = at(12);

    let mut tasklist_edit = tasklist.clone();
    tasklist_edit.title = "Tasklist edit".to_owned();
    tasklist_edit.source_last_modified = at(11);

    assert_eq!(
        ConflictResolver::default().resolve(&correlation, &database_edit, &tasklist_edit),
        Resolution::Apply(SyncDirection::DatabaseToTasklist),
        "swapping which side is later mirrors the outcome"
    );
}

#[rstest]
fn timestamp_ties_favor_the_database_side_and_are_recorded() {
    let database = task(SystemSide::Database, "Task", at(10));
    let tasklist = task(SystemSide::Tasklist, "Task", at(10));
    let correlation = known(&database, &tasklist);

    let mut database_edit = database.clone();
    database_edit.title = "Database edit".to_owned();
    database_edit.source_last_modified = at(11);

    let mut tasklist_edit = tasklist.clone();
    tasklist_edit.title = "Tasklist edit".to_owned();
    tasklist_edit.source_last_modified = at(11);

    assert_eq!(
        ConflictResolver::default().resolve(&correlation, &database_edit, &tasklist_edit),
        Resolution::ConflictLogged(SyncDirection::DatabaseToTasklist)
    );
}

#[rstest]
#[case(ConflictPolicy::DatabaseWins, SyncDirection::DatabaseToTasklist)]
#[case(ConflictPolicy::TasklistWins, SyncDirection::TasklistToDatabase)]
fn fixed_policies_ignore_timestamps(
    #[case] policy: ConflictPolicy,
    #[case] expected: SyncDirection,
) {
    let database = task(SystemSide::Database, "Task", at(10));
    let tasklist = task(SystemSide::Tasklist, "Task", at(10));
    let correlation = known(&database, &tasklist);

    let mut database_edit = database.clone();
    database_edit.title = "Database edit".to_owned();
    database_edit.source_last_modified = at(11);

    let mut tasklist_edit = tasklist.clone();
    tasklist_edit.title = "Tasklist edit".to_owned();
    tasklist_edit.source_last_modified = at(23);

    assert_eq!(
        ConflictResolver::new(policy).resolve(&correlation, &database_edit, &tasklist_edit),
        Resolution::Apply(expected)
    );
}
