//! Parsing, defaults, and poll-window behaviour.

use crate::config::{ConfigHandle, PollWindow, SyncConfig};
use crate::conflict::ConflictPolicy;
use chrono::NaiveTime;
use rstest::rstest;

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

#[rstest]
fn full_config_parses() {
    let raw = r####"{
        "mapping": {
            "field_mapping": {
                "Name": "content",
                "Due": "due_date",
                "Priority": "priority",
                "Tags": "labels"
            },
            "description": {
                "enabled": true,
                "separator": "\n\n",
                "fields": [
                    {"name": "Notes", "label": "Notes", "format": "### {label}\n{value}"}
                ]
            },
            "completion": {"field": "Status", "done_value": "Done"}
        },
        "parent_task": {
            "relation_field": "Parent",
            "create_parent": true,
            "title_field": "Name"
        },
        "conflict_policy": "last_modified_wins",
        "poll": {
            "interval_secs": 120,
            "window": {"start": "09:00", "end": "17:00"},
            "max_records_per_run": 100
        },
        "retry": {
            "max_attempts": 4,
            "initial_delay_ms": 250,
            "max_delay_ms": 10000,
            "timeout_ms": 5000
        },
        "workers": 8,
        "webhooks": {"tasklist_secret": "shhh"}
    }"####;

    let config: SyncConfig = serde_json::from_str(raw).expect("config should parse");

    assert_eq!(config.mapping.field_mapping.len(), 4);
    assert!(config.mapping.description.enabled);
    assert_eq!(config.conflict_policy, ConflictPolicy::LastModifiedWins);
    assert_eq!(config.poll.interval_secs, 120);
    assert_eq!(config.poll.max_records_per_run, 100);
    assert_eq!(config.retry.max_attempts, 4);
    assert_eq!(config.workers, 8);
    assert_eq!(config.webhooks.tasklist_secret.as_deref(), Some("shhh"));
    let window = config.poll.window.expect("window should be set");
    assert_eq!(window.start, time(9, 0));
    assert_eq!(window.end, time(17, 0));
    let parent = config.parent_task.expect("parent config should be set");
    assert!(parent.create_parent);
}

#[rstest]
fn empty_config_gets_defaults() {
    let config: SyncConfig = serde_json::from_str("{}").expect("config should parse");

    assert_eq!(config.poll.interval_secs, 60);
    assert_eq!(config.poll.max_records_per_run, 100);
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.workers, 4);
    assert_eq!(config.conflict_policy, ConflictPolicy::LastModifiedWins);
    assert!(config.parent_task.is_none());
    assert!(config.poll.window.is_none());
}

#[rstest]
fn unknown_fields_are_rejected() {
    let result: Result<SyncConfig, _> = serde_json::from_str(r#"{"field_maping": {}}"#);
    assert!(result.is_err(), "typos must fail loudly, not sync wrongly");
}

#[rstest]
fn daytime_window_contains_only_daytime() {
    let window = PollWindow {
        start: time(9, 0),
        end: time(17, 0),
    };
    assert!(window.contains(time(9, 0)));
    assert!(window.contains(time(12, 30)));
    assert!(!window.contains(time(17, 0)));
    assert!(!window.contains(time(3, 0)));
}

#[rstest]
fn overnight_window_wraps_midnight() {
    let window = PollWindow {
        start: time(22, 0),
        end: time(6, 0),
    };
    assert!(window.contains(time(23, 0)));
    assert!(window.contains(time(2, 0)));
    assert!(!window.contains(time(12, 0)));
}

#[rstest]
fn fixed_handle_survives_reload() {
    let handle = ConfigHandle::fixed(SyncConfig {
        workers: 2,
        ..SyncConfig::default()
    });

    let reloaded = handle.reload().expect("reload should succeed");
    assert_eq!(reloaded.workers, 2);
}
