//! `PostgreSQL` correlation store implementation.

use super::{
    models::{CorrelationRow, NewCorrelationRow, NewPendingParentLinkRow, PendingParentLinkRow},
    schema::{correlations, pending_parent_links},
};
use crate::correlation::{
    domain::{CorrelationId, CorrelationRecord, PersistedCorrelationData},
    ports::{CorrelationStore, CorrelationStoreError, CorrelationStoreResult},
};
use crate::identity::{RecordId, RecordIdentity, SystemSide};
use crate::mapping::Fingerprint;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by the correlation adapter.
pub type CorrelationPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed correlation store.
///
/// Row-level serialization comes from the database: reads and writes for one
/// correlation run inside a transaction.
#[derive(Debug, Clone)]
pub struct PostgresCorrelationStore {
    pool: CorrelationPgPool,
}

impl PostgresCorrelationStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: CorrelationPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> CorrelationStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> CorrelationStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(CorrelationStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(CorrelationStoreError::persistence)?
    }
}

#[async_trait]
impl CorrelationStore for PostgresCorrelationStore {
    async fn insert(&self, record: &CorrelationRecord) -> CorrelationStoreResult<()> {
        let new_row = to_new_row(record);
        let database_identity = record.identity_on(SystemSide::Database);
        let tasklist_identity = record.identity_on(SystemSide::Tasklist);

        self.run_blocking(move |connection| {
            diesel::insert_into(correlations::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) => {
                        duplicate_for_constraint(info.as_ref(), database_identity, tasklist_identity)
                    }
                    _ => CorrelationStoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, record: &CorrelationRecord) -> CorrelationStoreResult<()> {
        let row = to_new_row(record);
        let correlation_id = record.id();

        self.run_blocking(move |connection| {
            let updated = diesel::update(
                correlations::table.filter(correlations::id.eq(row.id)),
            )
            .set((
                correlations::database_fingerprint.eq(&row.database_fingerprint),
                correlations::tasklist_fingerprint.eq(&row.tasklist_fingerprint),
                correlations::last_synced_at.eq(row.last_synced_at),
                correlations::parent_id.eq(row.parent_id),
                correlations::tombstoned_at.eq(row.tombstoned_at),
            ))
            .execute(connection)
            .map_err(CorrelationStoreError::persistence)?;

            if updated == 0 {
                return Err(CorrelationStoreError::NotFound(correlation_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_identity(
        &self,
        identity: &RecordIdentity,
    ) -> CorrelationStoreResult<Option<CorrelationRecord>> {
        let side = identity.side;
        let id_value = identity.id.as_str().to_owned();

        self.run_blocking(move |connection| {
            let query = match side {
                SystemSide::Database => correlations::table
                    .filter(correlations::database_id.eq(id_value))
                    .select(CorrelationRow::as_select())
                    .into_boxed(),
                SystemSide::Tasklist => correlations::table
                    .filter(correlations::tasklist_id.eq(id_value))
                    .select(CorrelationRow::as_select())
                    .into_boxed(),
            };
            let row = query
                .first::<CorrelationRow>(connection)
                .optional()
                .map_err(CorrelationStoreError::persistence)?;
            Ok(row.map(row_to_record))
        })
        .await
    }

    async fn find_by_id(
        &self,
        id: CorrelationId,
    ) -> CorrelationStoreResult<Option<CorrelationRecord>> {
        self.run_blocking(move |connection| {
            let row = correlations::table
                .filter(correlations::id.eq(id.into_inner()))
                .select(CorrelationRow::as_select())
                .first::<CorrelationRow>(connection)
                .optional()
                .map_err(CorrelationStoreError::persistence)?;
            Ok(row.map(row_to_record))
        })
        .await
    }

    async fn add_pending_parent_link(
        &self,
        child: &RecordIdentity,
        parent_source_id: &RecordId,
    ) -> CorrelationStoreResult<()> {
        let new_row = NewPendingParentLinkRow {
            id: uuid::Uuid::new_v4(),
            child_side: child.side.as_str().to_owned(),
            child_id: child.id.as_str().to_owned(),
            parent_source_id: parent_source_id.as_str().to_owned(),
        };

        self.run_blocking(move |connection| {
            let already_waiting = pending_parent_links::table
                .filter(pending_parent_links::child_side.eq(&new_row.child_side))
                .filter(pending_parent_links::child_id.eq(&new_row.child_id))
                .filter(pending_parent_links::parent_source_id.eq(&new_row.parent_source_id))
                .count()
                .get_result::<i64>(connection)
                .map_err(CorrelationStoreError::persistence)?;
            if already_waiting > 0 {
                return Ok(());
            }
            diesel::insert_into(pending_parent_links::table)
                .values(&new_row)
                .execute(connection)
                .map_err(CorrelationStoreError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn take_pending_children(
        &self,
        parent_source_id: &RecordId,
    ) -> CorrelationStoreResult<Vec<RecordIdentity>> {
        let parent = parent_source_id.as_str().to_owned();

        self.run_blocking(move |connection| {
            connection.transaction(|connection| {
                let rows = pending_parent_links::table
                    .filter(pending_parent_links::parent_source_id.eq(&parent))
                    .select(PendingParentLinkRow::as_select())
                    .load::<PendingParentLinkRow>(connection)?;
                diesel::delete(
                    pending_parent_links::table
                        .filter(pending_parent_links::parent_source_id.eq(&parent)),
                )
                .execute(connection)?;
                Ok::<_, DieselError>(rows)
            })
            .map_err(CorrelationStoreError::persistence)?
            .into_iter()
            .map(row_to_identity)
            .collect()
        })
        .await
    }

    async fn count(&self) -> CorrelationStoreResult<u64> {
        self.run_blocking(|connection| {
            let total = correlations::table
                .count()
                .get_result::<i64>(connection)
                .map_err(CorrelationStoreError::persistence)?;
            Ok(u64::try_from(total).unwrap_or(0))
        })
        .await
    }

    async fn ping(&self) -> CorrelationStoreResult<()> {
        self.run_blocking(|connection| {
            diesel::sql_query("SELECT 1")
                .execute(connection)
                .map_err(CorrelationStoreError::persistence)?;
            Ok(())
        })
        .await
    }
}

fn to_new_row(record: &CorrelationRecord) -> NewCorrelationRow {
    NewCorrelationRow {
        id: record.id().into_inner(),
        database_id: record.id_on(SystemSide::Database).as_str().to_owned(),
        tasklist_id: record.id_on(SystemSide::Tasklist).as_str().to_owned(),
        database_fingerprint: record.fingerprint_on(SystemSide::Database).as_str().to_owned(),
        tasklist_fingerprint: record.fingerprint_on(SystemSide::Tasklist).as_str().to_owned(),
        last_synced_at: record.last_synced_at(),
        parent_id: record.parent().map(CorrelationId::into_inner),
        tombstoned_at: record.tombstoned_at(),
    }
}

fn row_to_record(row: CorrelationRow) -> CorrelationRecord {
    CorrelationRecord::from_persisted(PersistedCorrelationData {
        id: CorrelationId::from_uuid(row.id),
        database_id: RecordId::new(row.database_id),
        tasklist_id: RecordId::new(row.tasklist_id),
        database_fingerprint: Fingerprint::from_hex(row.database_fingerprint),
        tasklist_fingerprint: Fingerprint::from_hex(row.tasklist_fingerprint),
        last_synced_at: row.last_synced_at,
        parent: row.parent_id.map(CorrelationId::from_uuid),
        tombstoned_at: row.tombstoned_at,
    })
}

fn row_to_identity(row: PendingParentLinkRow) -> CorrelationStoreResult<RecordIdentity> {
    let side = match row.child_side.as_str() {
        "database" => SystemSide::Database,
        "tasklist" => SystemSide::Tasklist,
        other => {
            return Err(CorrelationStoreError::persistence(std::io::Error::other(
                format!("unknown side in pending link: {other}"),
            )));
        }
    };
    Ok(RecordIdentity {
        side,
        id: RecordId::new(row.child_id),
    })
}

fn duplicate_for_constraint(
    info: &dyn DatabaseErrorInformation,
    database_identity: RecordIdentity,
    tasklist_identity: RecordIdentity,
) -> CorrelationStoreError {
    let is_tasklist = info
        .constraint_name()
        .is_some_and(|name| name.contains("tasklist"));
    if is_tasklist {
        CorrelationStoreError::DuplicateIdentity(tasklist_identity)
    } else {
        CorrelationStoreError::DuplicateIdentity(database_identity)
    }
}
