//! Identity gate admission and coalescing behaviour.

use crate::engine::{Admission, IdentityGate};
use crate::identity::{RecordIdentity, SystemSide};
use crate::intake::ChangeKind;
use rstest::rstest;

fn identity(id: &str) -> RecordIdentity {
    RecordIdentity::new(SystemSide::Database, id)
}

#[rstest]
fn first_notification_starts_a_run() {
    let gate = IdentityGate::new();
    assert_eq!(
        gate.begin(&identity("page-1"), ChangeKind::Changed),
        Admission::Started
    );
    assert_eq!(gate.in_flight(), 1);
}

#[rstest]
fn overlapping_notifications_coalesce_into_one_rerun() {
    let gate = IdentityGate::new();
    let record = identity("page-1");
    assert_eq!(gate.begin(&record, ChangeKind::Changed), Admission::Started);

    // Three duplicates while in flight collapse into a single queued pass.
    for _ in 0..3 {
        assert_eq!(gate.begin(&record, ChangeKind::Changed), Admission::Coalesced);
    }

    assert_eq!(gate.finish(&record), Some(ChangeKind::Changed));
    assert_eq!(gate.finish(&record), None, "exactly one rerun");
    assert_eq!(gate.in_flight(), 0);
}

#[rstest]
fn latest_coalesced_kind_wins() {
    let gate = IdentityGate::new();
    let record = identity("page-1");
    assert_eq!(gate.begin(&record, ChangeKind::Changed), Admission::Started);

    assert_eq!(gate.begin(&record, ChangeKind::Changed), Admission::Coalesced);
    assert_eq!(gate.begin(&record, ChangeKind::Deleted), Admission::Coalesced);

    assert_eq!(gate.finish(&record), Some(ChangeKind::Deleted));
    assert_eq!(gate.finish(&record), None);
}

#[rstest]
fn distinct_identities_do_not_interfere() {
    let gate = IdentityGate::new();
    assert_eq!(
        gate.begin(&identity("page-1"), ChangeKind::Changed),
        Admission::Started
    );
    assert_eq!(
        gate.begin(&identity("page-2"), ChangeKind::Changed),
        Admission::Started
    );
    assert_eq!(gate.in_flight(), 2);

    assert_eq!(gate.finish(&identity("page-1")), None);
    assert_eq!(gate.finish(&identity("page-2")), None);
    assert_eq!(gate.in_flight(), 0);
}

#[rstest]
fn release_after_finish_allows_a_fresh_run() {
    let gate = IdentityGate::new();
    let record = identity("page-1");
    assert_eq!(gate.begin(&record, ChangeKind::Changed), Admission::Started);
    assert_eq!(gate.finish(&record), None);
    assert_eq!(gate.begin(&record, ChangeKind::Changed), Admission::Started);
}
