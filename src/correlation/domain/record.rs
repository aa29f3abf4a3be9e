//! Correlation aggregate root.

use crate::identity::{RecordId, RecordIdentity, SystemSide};
use crate::mapping::Fingerprint;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a correlation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Creates a new random correlation identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a correlation identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The durable link between one database-side record and its tasklist-side
/// counterpart, plus the sync metadata needed to tell real change from
/// webhook noise.
///
/// Correlations are never removed: a deletion on either side tombstones the
/// row so delayed duplicate events cannot re-create the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    id: CorrelationId,
    database_id: RecordId,
    tasklist_id: RecordId,
    database_fingerprint: Fingerprint,
    tasklist_fingerprint: Fingerprint,
    last_synced_at: DateTime<Utc>,
    parent: Option<CorrelationId>,
    tombstoned_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedCorrelationData {
    /// Persisted correlation identifier.
    pub id: CorrelationId,
    /// Database-side record id.
    pub database_id: RecordId,
    /// Tasklist-side record id.
    pub tasklist_id: RecordId,
    /// Database-side content fingerprint as last synced.
    pub database_fingerprint: Fingerprint,
    /// Tasklist-side content fingerprint as last synced.
    pub tasklist_fingerprint: Fingerprint,
    /// Timestamp of the last successful reconciliation.
    pub last_synced_at: DateTime<Utc>,
    /// Parent correlation mirroring record hierarchy, if any.
    pub parent: Option<CorrelationId>,
    /// Tombstone timestamp, if either side was deleted.
    pub tombstoned_at: Option<DateTime<Utc>>,
}

impl CorrelationRecord {
    /// Creates a correlation for a freshly cross-created pair.
    #[must_use]
    pub fn new(
        database_id: RecordId,
        tasklist_id: RecordId,
        database_fingerprint: Fingerprint,
        tasklist_fingerprint: Fingerprint,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: CorrelationId::new(),
            database_id,
            tasklist_id,
            database_fingerprint,
            tasklist_fingerprint,
            last_synced_at: clock.utc(),
            parent: None,
            tombstoned_at: None,
        }
    }

    /// Reconstructs a correlation from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedCorrelationData) -> Self {
        Self {
            id: data.id,
            database_id: data.database_id,
            tasklist_id: data.tasklist_id,
            database_fingerprint: data.database_fingerprint,
            tasklist_fingerprint: data.tasklist_fingerprint,
            last_synced_at: data.last_synced_at,
            parent: data.parent,
            tombstoned_at: data.tombstoned_at,
        }
    }

    /// Returns the correlation identifier.
    #[must_use]
    pub const fn id(&self) -> CorrelationId {
        self.id
    }

    /// Returns the record id on the given side.
    #[must_use]
    pub const fn id_on(&self, side: SystemSide) -> &RecordId {
        match side {
            SystemSide::Database => &self.database_id,
            SystemSide::Tasklist => &self.tasklist_id,
        }
    }

    /// Returns the full identity of the record on the given side.
    #[must_use]
    pub fn identity_on(&self, side: SystemSide) -> RecordIdentity {
        RecordIdentity {
            side,
            id: self.id_on(side).clone(),
        }
    }

    /// Returns the stored fingerprint for the given side.
    #[must_use]
    pub const fn fingerprint_on(&self, side: SystemSide) -> &Fingerprint {
        match side {
            SystemSide::Database => &self.database_fingerprint,
            SystemSide::Tasklist => &self.tasklist_fingerprint,
        }
    }

    /// Returns the last successful reconciliation timestamp.
    #[must_use]
    pub const fn last_synced_at(&self) -> DateTime<Utc> {
        self.last_synced_at
    }

    /// Returns the parent correlation, if hierarchy was mirrored.
    #[must_use]
    pub const fn parent(&self) -> Option<CorrelationId> {
        self.parent
    }

    /// Whether either side has been deleted.
    #[must_use]
    pub const fn is_tombstoned(&self) -> bool {
        self.tombstoned_at.is_some()
    }

    /// Returns the tombstone timestamp, if set.
    #[must_use]
    pub const fn tombstoned_at(&self) -> Option<DateTime<Utc>> {
        self.tombstoned_at
    }

    /// Records a successful reconciliation: fresh fingerprints for both
    /// sides and a new sync timestamp.
    pub fn record_sync(
        &mut self,
        database_fingerprint: Fingerprint,
        tasklist_fingerprint: Fingerprint,
        clock: &impl Clock,
    ) {
        self.database_fingerprint = database_fingerprint;
        self.tasklist_fingerprint = tasklist_fingerprint;
        self.last_synced_at = clock.utc();
    }

    /// Links this correlation under a parent correlation.
    pub fn set_parent(&mut self, parent: CorrelationId) {
        self.parent = Some(parent);
    }

    /// Marks the pair deleted-on-one-side. Idempotent: an existing
    /// tombstone timestamp is kept.
    pub fn tombstone(&mut self, clock: &impl Clock) {
        if self.tombstoned_at.is_none() {
            self.tombstoned_at = Some(clock.utc());
        }
    }
}
