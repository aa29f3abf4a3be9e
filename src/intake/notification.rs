//! Change notifications.

use crate::identity::RecordIdentity;
use serde::{Deserialize, Serialize};

/// What kind of change a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The record was created or updated; current state must be fetched.
    Changed,
    /// The record was deleted on its side.
    Deleted,
}

/// "A record changed": the unit of work entering the apply engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// Identity of the changed record.
    pub identity: RecordIdentity,
    /// Kind of change reported.
    pub kind: ChangeKind,
}

impl ChangeNotification {
    /// Creates a change notification.
    #[must_use]
    pub const fn new(identity: RecordIdentity, kind: ChangeKind) -> Self {
        Self { identity, kind }
    }
}
