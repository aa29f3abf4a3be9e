//! Diesel schema for correlation persistence.

diesel::table! {
    /// Correlation rows linking the two backends' record ids.
    correlations (id) {
        /// Correlation identifier.
        id -> Uuid,
        /// Database-side record id.
        #[max_length = 255]
        database_id -> Varchar,
        /// Tasklist-side record id.
        #[max_length = 255]
        tasklist_id -> Varchar,
        /// Database-side content fingerprint as last synced.
        #[max_length = 64]
        database_fingerprint -> Varchar,
        /// Tasklist-side content fingerprint as last synced.
        #[max_length = 64]
        tasklist_fingerprint -> Varchar,
        /// Last successful reconciliation timestamp.
        last_synced_at -> Timestamptz,
        /// Parent correlation mirroring record hierarchy.
        parent_id -> Nullable<Uuid>,
        /// Tombstone timestamp set when either side is deleted.
        tombstoned_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Children waiting for a parent record to gain a correlation.
    pending_parent_links (id) {
        /// Row identifier.
        id -> Uuid,
        /// Side of the waiting child record.
        #[max_length = 16]
        child_side -> Varchar,
        /// Id of the waiting child record.
        #[max_length = 255]
        child_id -> Varchar,
        /// Source-side id of the awaited parent record.
        #[max_length = 255]
        parent_source_id -> Varchar,
    }
}

diesel::allow_tables_to_appear_in_same_query!(correlations, pending_parent_links);
