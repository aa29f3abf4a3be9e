//! Poll scan batching, ordering, and windowing.

use super::harness::{IntakeHarness, base_config, intake_harness};
use crate::backend::adapters::memory::WriteEvent;
use crate::backend::record::{DatabaseRecord, PropertyValue, RawRecord};
use crate::config::{PollConfig, PollWindow, SyncConfig};
use crate::identity::RecordId;
use crate::intake::PollScanner;
use chrono::{Duration, Local, TimeZone, Utc};
use rstest::rstest;
use std::collections::BTreeMap;
use std::sync::Arc;

fn scanner(fixture: &IntakeHarness) -> PollScanner<
    crate::correlation::adapters::memory::InMemoryCorrelationStore,
    mockable::DefaultClock,
> {
    PollScanner::new(
        Arc::clone(&fixture.engine),
        Arc::clone(&fixture.database) as Arc<dyn crate::backend::TaskBackend>,
        Arc::clone(&fixture.config),
        Arc::new(mockable::DefaultClock),
    )
}

fn seed_pages(fixture: &IntakeHarness, count: usize) {
    let base = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).single().expect("valid timestamp");
    for index in 0..count {
        let mut properties = BTreeMap::new();
        properties.insert(
            "Name".to_owned(),
            PropertyValue::Title {
                text: format!("Task {index:03}"),
            },
        );
        fixture.database.seed(RawRecord::Database(DatabaseRecord {
            id: RecordId::new(format!("page-{index:03}")),
            last_edited: base + Duration::seconds(i64::try_from(index).unwrap_or(0)),
            properties,
        }));
    }
}

fn capped_config(cap: usize) -> SyncConfig {
    SyncConfig {
        poll: PollConfig {
            interval_secs: 60,
            window: None,
            max_records_per_run: cap,
        },
        ..base_config()
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cap_defers_overflow_to_the_next_run_in_change_order() {
    let fixture = intake_harness(capped_config(100));
    seed_pages(&fixture, 150);
    let scanner = scanner(&fixture);

    let first = scanner.run_once().await.expect("poll should succeed");
    assert_eq!(first.processed, 100, "exactly the cap is processed");
    assert!(first.deferred > 0, "overflow is reported as deferred");

    // Creations happened in original change order.
    let created_titles: Vec<String> = fixture
        .tasklist
        .writes()
        .iter()
        .filter_map(|event| match event {
            WriteEvent::Created(id) => fixture.tasklist.record(id),
            _ => None,
        })
        .filter_map(|record| match record {
            RawRecord::Tasklist(task) => Some(task.content),
            RawRecord::Database(_) => None,
        })
        .collect();
    let expected: Vec<String> = (0..100).map(|index| format!("Task {index:03}")).collect();
    assert_eq!(created_titles, expected);

    let second = scanner.run_once().await.expect("poll should succeed");
    assert_eq!(second.processed, 50, "the deferred records follow untouched");

    let third = scanner.run_once().await.expect("poll should succeed");
    assert_eq!(third.processed, 0, "watermark absorbs already-processed records");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn window_outside_the_current_time_skips_the_run() {
    let now = Local::now().time();
    let config = SyncConfig {
        poll: PollConfig {
            interval_secs: 60,
            window: Some(PollWindow {
                start: now + Duration::hours(2),
                end: now + Duration::hours(3),
            }),
            max_records_per_run: 100,
        },
        ..base_config()
    };
    let fixture = intake_harness(config);
    seed_pages(&fixture, 3);
    let scanner = scanner(&fixture);

    let report = scanner.run_once().await.expect("poll should succeed");

    assert!(report.skipped_by_window);
    assert_eq!(report.processed, 0);
    assert!(fixture.tasklist.writes().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unchanged_state_polls_to_nothing() {
    let fixture = intake_harness(capped_config(100));
    seed_pages(&fixture, 5);
    let scanner = scanner(&fixture);

    let first = scanner.run_once().await.expect("poll should succeed");
    assert_eq!(first.processed, 5);

    let second = scanner.run_once().await.expect("poll should succeed");
    assert_eq!(second.processed, 0);
}
