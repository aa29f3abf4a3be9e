//! Correlation aggregate behaviour.

use crate::correlation::domain::CorrelationRecord;
use crate::identity::{RecordId, SystemSide};
use crate::mapping::Fingerprint;
use mockable::DefaultClock;
use rstest::rstest;

fn record() -> CorrelationRecord {
    CorrelationRecord::new(
        RecordId::new("page-1"),
        RecordId::new("task-9"),
        Fingerprint::from_hex("aa"),
        Fingerprint::from_hex("bb"),
        &DefaultClock,
    )
}

#[rstest]
fn exposes_ids_per_side() {
    let correlation = record();
    assert_eq!(correlation.id_on(SystemSide::Database).as_str(), "page-1");
    assert_eq!(correlation.id_on(SystemSide::Tasklist).as_str(), "task-9");
    assert_eq!(
        correlation.identity_on(SystemSide::Database).side,
        SystemSide::Database
    );
}

#[rstest]
fn record_sync_replaces_both_fingerprints() {
    let mut correlation = record();
    let before = correlation.last_synced_at();

    correlation.record_sync(
        Fingerprint::from_hex("cc"),
        Fingerprint::from_hex("dd"),
        &DefaultClock,
    );

    assert_eq!(correlation.fingerprint_on(SystemSide::Database).as_str(), "cc");
    assert_eq!(correlation.fingerprint_on(SystemSide::Tasklist).as_str(), "dd");
    assert!(correlation.last_synced_at() >= before);
}

#[rstest]
fn tombstone_is_idempotent() {
    let mut correlation = record();
    assert!(!correlation.is_tombstoned());

    correlation.tombstone(&DefaultClock);
    let first = correlation.tombstoned_at();
    assert!(correlation.is_tombstoned());

    correlation.tombstone(&DefaultClock);
    assert_eq!(correlation.tombstoned_at(), first);
}

#[rstest]
fn persisted_round_trip_preserves_every_field() {
    let mut original = record();
    original.tombstone(&DefaultClock);

    let data = crate::correlation::PersistedCorrelationData {
        id: original.id(),
        database_id: original.id_on(SystemSide::Database).clone(),
        tasklist_id: original.id_on(SystemSide::Tasklist).clone(),
        database_fingerprint: original.fingerprint_on(SystemSide::Database).clone(),
        tasklist_fingerprint: original.fingerprint_on(SystemSide::Tasklist).clone(),
        last_synced_at: original.last_synced_at(),
        parent: original.parent(),
        tombstoned_at: original.tombstoned_at(),
    };

    assert_eq!(CorrelationRecord::from_persisted(data), original);
}
