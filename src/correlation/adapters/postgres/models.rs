//! Diesel row models for correlation persistence.

use super::schema::{correlations, pending_parent_links};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for correlations.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = correlations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CorrelationRow {
    /// Correlation identifier.
    pub id: uuid::Uuid,
    /// Database-side record id.
    pub database_id: String,
    /// Tasklist-side record id.
    pub tasklist_id: String,
    /// Database-side fingerprint.
    pub database_fingerprint: String,
    /// Tasklist-side fingerprint.
    pub tasklist_fingerprint: String,
    /// Last successful reconciliation timestamp.
    pub last_synced_at: DateTime<Utc>,
    /// Parent correlation id, if any.
    pub parent_id: Option<uuid::Uuid>,
    /// Tombstone timestamp, if set.
    pub tombstoned_at: Option<DateTime<Utc>>,
}

/// Insert model for correlations.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = correlations)]
pub struct NewCorrelationRow {
    /// Correlation identifier.
    pub id: uuid::Uuid,
    /// Database-side record id.
    pub database_id: String,
    /// Tasklist-side record id.
    pub tasklist_id: String,
    /// Database-side fingerprint.
    pub database_fingerprint: String,
    /// Tasklist-side fingerprint.
    pub tasklist_fingerprint: String,
    /// Last successful reconciliation timestamp.
    pub last_synced_at: DateTime<Utc>,
    /// Parent correlation id, if any.
    pub parent_id: Option<uuid::Uuid>,
    /// Tombstone timestamp, if set.
    pub tombstoned_at: Option<DateTime<Utc>>,
}

/// Query result row for pending parent links.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pending_parent_links)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PendingParentLinkRow {
    /// Row identifier.
    pub id: uuid::Uuid,
    /// Side of the waiting child record.
    pub child_side: String,
    /// Id of the waiting child record.
    pub child_id: String,
    /// Source-side id of the awaited parent record.
    pub parent_source_id: String,
}

/// Insert model for pending parent links.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pending_parent_links)]
pub struct NewPendingParentLinkRow {
    /// Row identifier.
    pub id: uuid::Uuid,
    /// Side of the waiting child record.
    pub child_side: String,
    /// Id of the waiting child record.
    pub child_id: String,
    /// Source-side id of the awaited parent record.
    pub parent_source_id: String,
}
