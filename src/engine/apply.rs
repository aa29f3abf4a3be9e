//! The reconciliation pipeline.

use crate::backend::{
    BackendError, DestinationPayload, RawRecord, TaskBackend, WriteOutcome,
};
use crate::config::{ConfigHandle, SyncConfig};
use crate::conflict::{ConflictResolver, Resolution, SyncDirection};
use crate::correlation::{
    CorrelationId, CorrelationRecord, CorrelationStore, CorrelationStoreError,
};
use crate::engine::error::EngineError;
use crate::engine::gate::{Admission, IdentityGate};
use crate::engine::health::{HealthSnapshot, HealthState};
use crate::engine::retry::RetryPolicy;
use crate::hierarchy::{ParentTaskConfig, parent_reference, synthesized_parent_title};
use crate::identity::{RecordId, RecordIdentity, SystemSide};
use crate::intake::{ChangeKind, ChangeNotification};
use crate::mapping::{
    MappingError, NormalizedPriority, NormalizedTask, fingerprint, to_destination_payload,
    to_normalized,
};
use mockable::Clock;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, info, warn};

/// Terminal state of one processed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing needed doing (duplicate event, tombstoned pair, noise).
    Noop,
    /// A counterpart record was created (or adopted) and correlated.
    Created {
        /// Identity of the counterpart record.
        counterpart: RecordIdentity,
    },
    /// An update flowed in the given direction.
    Applied {
        /// Direction content flowed.
        direction: SyncDirection,
    },
    /// Concurrent edits were resolved by policy; recorded for audit.
    ConflictApplied {
        /// Direction content flowed.
        direction: SyncDirection,
    },
    /// Only a deferred parent link was applied; content was unchanged.
    Linked,
    /// A deletion was propagated and the correlation tombstoned.
    Deleted,
    /// A completed record with no counterpart was left uncreated.
    SkippedCompleted,
    /// The record failed mapping or exhausted its retries; logged and
    /// counted, the rest of the batch is unaffected.
    Failed,
    /// The notification coalesced into an already-running reconciliation.
    Coalesced,
    /// The engine is shutting down and the work had not started.
    Abandoned,
}

/// Result of one pipeline pass plus children to opportunistically re-link.
struct PassResult {
    outcome: ReconcileOutcome,
    relink: Vec<RecordIdentity>,
}

impl PassResult {
    const fn noop() -> Self {
        Self {
            outcome: ReconcileOutcome::Noop,
            relink: Vec::new(),
        }
    }

    const fn of(outcome: ReconcileOutcome, relink: Vec<RecordIdentity>) -> Self {
        Self { outcome, relink }
    }
}

/// Parent resolution result for one record.
#[derive(Debug, Default)]
struct ParentOutcome {
    /// Tasklist-side id to link the child under, with its correlation.
    link: Option<(RecordId, CorrelationId)>,
    /// Parent source id the child must wait on.
    pending: Option<RecordId>,
    /// Children freed up by a newly created parent correlation.
    relink: Vec<RecordIdentity>,
}

/// Orchestrates the full reconciliation pipeline for change notifications
/// from both intake paths.
pub struct ApplyEngine<S, C>
where
    S: CorrelationStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    database: Arc<dyn TaskBackend>,
    tasklist: Arc<dyn TaskBackend>,
    config: Arc<ConfigHandle>,
    clock: Arc<C>,
    health: Arc<HealthState>,
    gate: IdentityGate,
    limiter: Semaphore,
    accepting: AtomicBool,
    in_flight: AtomicUsize,
    drained: Notify,
}

impl<S, C> ApplyEngine<S, C>
where
    S: CorrelationStore,
    C: Clock + Send + Sync,
{
    /// Creates an engine over the given store, backends, and configuration.
    ///
    /// `workers` bounds concurrent reconciliations; saturation blocks new
    /// work (backpressure) rather than dropping it.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        database: Arc<dyn TaskBackend>,
        tasklist: Arc<dyn TaskBackend>,
        config: Arc<ConfigHandle>,
        clock: Arc<C>,
        health: Arc<HealthState>,
        workers: usize,
    ) -> Self {
        Self {
            store,
            database,
            tasklist,
            config,
            clock,
            health,
            gate: IdentityGate::new(),
            limiter: Semaphore::new(workers.max(1)),
            accepting: AtomicBool::new(true),
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    /// Shared health counters (webhook ingress reports through these too).
    #[must_use]
    pub fn health(&self) -> Arc<HealthState> {
        Arc::clone(&self.health)
    }

    /// Stops admitting new work. Queued-but-unstarted notifications are
    /// abandoned; they will be re-derived from the next poll scan or a
    /// redelivered webhook.
    pub fn begin_shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// Waits until every in-flight reconciliation has reached a terminal
    /// state. A reconciliation past its API write always runs on to
    /// correlation persistence, so draining never strands a half-synced
    /// pair.
    pub async fn drain(&self) {
        loop {
            let notified = self.drained.notified();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Builds the health snapshot served by the status endpoint.
    pub async fn health_snapshot(&self) -> HealthSnapshot {
        let store_reachable = self.store.ping().await.is_ok();
        let correlation_count = self.store.count().await.unwrap_or(0);
        HealthSnapshot {
            last_successful_sync: self.health.last_success(),
            failed_count: self.health.failed_count(),
            conflict_count: self.health.conflict_count(),
            store_reachable,
            correlation_count,
        }
    }

    /// Processes one change notification through the full pipeline,
    /// including any opportunistic child re-links it unlocks.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] only for failures that poison the whole run
    /// (correlation store I/O, config reload); record-scoped failures are
    /// reported through [`ReconcileOutcome::Failed`].
    pub async fn process(
        &self,
        notification: ChangeNotification,
    ) -> Result<ReconcileOutcome, EngineError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = self.process_guarded(notification).await;
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
        result
    }

    async fn process_guarded(
        &self,
        notification: ChangeNotification,
    ) -> Result<ReconcileOutcome, EngineError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Ok(ReconcileOutcome::Abandoned);
        }
        let Ok(_permit) = self.limiter.acquire().await else {
            return Ok(ReconcileOutcome::Abandoned);
        };
        // Shutdown may have begun while this notification was queued behind
        // the worker pool; queued-but-unstarted work is abandoned cleanly.
        if !self.accepting.load(Ordering::SeqCst) {
            return Ok(ReconcileOutcome::Abandoned);
        }
        self.process_inner(notification).await
    }

    async fn process_inner(
        &self,
        notification: ChangeNotification,
    ) -> Result<ReconcileOutcome, EngineError> {
        let mut queue = VecDeque::new();
        queue.push_back((notification.identity, notification.kind));
        let mut first_outcome = None;

        while let Some((identity, kind)) = queue.pop_front() {
            if self.gate.begin(&identity, kind) == Admission::Coalesced {
                debug!(record = %identity, "notification coalesced into in-flight reconciliation");
                first_outcome.get_or_insert(ReconcileOutcome::Coalesced);
                continue;
            }

            let mut run_kind = kind;
            loop {
                let pass = match self.reconcile_once(&identity, run_kind).await {
                    Ok(pass) => pass,
                    Err(fatal) => {
                        self.release_gate(&identity);
                        return Err(fatal);
                    }
                };
                queue.extend(
                    pass.relink
                        .into_iter()
                        .map(|child| (child, ChangeKind::Changed)),
                );
                first_outcome.get_or_insert(pass.outcome);
                match self.gate.finish(&identity) {
                    Some(queued_kind) => run_kind = queued_kind,
                    None => break,
                }
            }
        }

        Ok(first_outcome.unwrap_or(ReconcileOutcome::Noop))
    }

    fn release_gate(&self, identity: &RecordIdentity) {
        while self.gate.finish(identity).is_some() {}
    }

    const fn backend_for(&self, side: SystemSide) -> &Arc<dyn TaskBackend> {
        match side {
            SystemSide::Database => &self.database,
            SystemSide::Tasklist => &self.tasklist,
        }
    }

    async fn reconcile_once(
        &self,
        identity: &RecordIdentity,
        kind: ChangeKind,
    ) -> Result<PassResult, EngineError> {
        let config = self.config.snapshot()?;
        let retry = RetryPolicy::from(config.retry);
        debug!(record = %identity, ?kind, "reconciliation received");

        let correlation = self.store.find_by_identity(identity).await?;
        if let Some(existing) = &correlation
            && existing.is_tombstoned()
        {
            debug!(record = %identity, "pair is tombstoned, suppressing re-creation");
            return Ok(PassResult::noop());
        }

        match kind {
            ChangeKind::Deleted => self.apply_deletion(identity, correlation, &retry).await,
            ChangeKind::Changed => {
                let origin = self.backend_for(identity.side);
                match retry.run(|| origin.fetch(&identity.id)).await {
                    Err(backend_error) => {
                        Ok(self.record_failed(identity, "fetch", &backend_error, Vec::new()))
                    }
                    // A record that vanished mid-pipeline is a delete signal,
                    // not a crash.
                    Ok(None) => self.apply_deletion(identity, correlation, &retry).await,
                    Ok(Some(record)) => {
                        self.reconcile_record(identity, &record, correlation, config.as_ref(), &retry)
                            .await
                    }
                }
            }
        }
    }

    fn record_failed(
        &self,
        identity: &RecordIdentity,
        stage: &str,
        backend_error: &BackendError,
        relink: Vec<RecordIdentity>,
    ) -> PassResult {
        error!(record = %identity, stage, error = %backend_error, "reconciliation failed");
        self.health.record_failure();
        PassResult::of(ReconcileOutcome::Failed, relink)
    }

    fn record_mapping_failed(
        &self,
        identity: &RecordIdentity,
        mapping_error: &MappingError,
        relink: Vec<RecordIdentity>,
    ) -> PassResult {
        error!(record = %identity, error = %mapping_error, "mapping failed, record skipped");
        self.health.record_failure();
        PassResult::of(ReconcileOutcome::Failed, relink)
    }

    async fn apply_deletion(
        &self,
        identity: &RecordIdentity,
        correlation: Option<CorrelationRecord>,
        retry: &RetryPolicy,
    ) -> Result<PassResult, EngineError> {
        let Some(mut correlation) = correlation else {
            debug!(record = %identity, "deletion of never-synced record, nothing to do");
            return Ok(PassResult::noop());
        };

        let counterpart_side = identity.side.counterpart();
        let counterpart_id = correlation.id_on(counterpart_side).clone();
        let destination = self.backend_for(counterpart_side);
        // Deleting an already-absent counterpart is success.
        if let Err(backend_error) = retry.run(|| destination.delete(&counterpart_id)).await {
            return Ok(self.record_failed(identity, "delete", &backend_error, Vec::new()));
        }

        correlation.tombstone(self.clock.as_ref());
        self.store.update(&correlation).await?;
        self.health.record_success(self.clock.utc());
        info!(
            record = %identity,
            counterpart = %counterpart_id,
            "deletion propagated, correlation tombstoned"
        );
        Ok(PassResult::of(ReconcileOutcome::Deleted, Vec::new()))
    }

    async fn reconcile_record(
        &self,
        identity: &RecordIdentity,
        record: &RawRecord,
        correlation: Option<CorrelationRecord>,
        config: &SyncConfig,
        retry: &RetryPolicy,
    ) -> Result<PassResult, EngineError> {
        let normalized = match to_normalized(record, &config.mapping) {
            Ok(normalized) => normalized,
            Err(mapping_error) => {
                return Ok(self.record_mapping_failed(identity, &mapping_error, Vec::new()));
            }
        };

        let parent = match (record, &config.parent_task) {
            (RawRecord::Database(page), Some(parent_config)) => {
                self.resolve_parent(page, parent_config, config, retry)
                    .await?
            }
            _ => ParentOutcome::default(),
        };

        match correlation {
            None => {
                self.first_sync(identity, &normalized, parent, config, retry)
                    .await
            }
            Some(existing) => {
                self.correlated_sync(identity, &normalized, existing, parent, config, retry)
                    .await
            }
        }
    }

    /// Resolves the parent link for a database-side record.
    ///
    /// Bounded to one level: the parent record's own relation field is
    /// sibling data and is never walked.
    async fn resolve_parent(
        &self,
        page: &crate::backend::DatabaseRecord,
        parent_config: &ParentTaskConfig,
        config: &SyncConfig,
        retry: &RetryPolicy,
    ) -> Result<ParentOutcome, EngineError> {
        let Some(parent_db_id) = parent_reference(page, parent_config) else {
            return Ok(ParentOutcome::default());
        };
        let parent_identity = RecordIdentity {
            side: SystemSide::Database,
            id: parent_db_id.clone(),
        };

        if let Some(parent_correlation) = self.store.find_by_identity(&parent_identity).await? {
            if parent_correlation.is_tombstoned() {
                return Ok(ParentOutcome::default());
            }
            return Ok(ParentOutcome {
                link: Some((
                    parent_correlation.id_on(SystemSide::Tasklist).clone(),
                    parent_correlation.id(),
                )),
                pending: None,
                relink: Vec::new(),
            });
        }

        if !parent_config.create_parent {
            // The child is created unlinked and re-linked once the parent
            // syncs.
            return Ok(ParentOutcome {
                link: None,
                pending: Some(parent_db_id),
                relink: Vec::new(),
            });
        }

        let fetched = match retry.run(|| self.database.fetch(&parent_db_id)).await {
            Ok(fetched) => fetched,
            Err(backend_error) => {
                warn!(
                    parent = %parent_identity,
                    error = %backend_error,
                    "parent fetch failed, creating child unlinked"
                );
                return Ok(ParentOutcome {
                    link: None,
                    pending: Some(parent_db_id),
                    relink: Vec::new(),
                });
            }
        };
        let Some(RawRecord::Database(parent_page)) = fetched else {
            return Ok(ParentOutcome::default());
        };

        let parent_task = NormalizedTask {
            title: synthesized_parent_title(&parent_page, parent_config),
            due: None,
            priority: NormalizedPriority::LOWEST,
            project: None,
            labels: BTreeSet::new(),
            description: None,
            completed: false,
            parent_key: None,
            source: parent_identity.clone(),
            source_last_modified: parent_page.last_edited,
        };
        let payload = match to_destination_payload(&parent_task, &config.mapping, SystemSide::Tasklist)
        {
            Ok(payload) => payload,
            Err(mapping_error) => {
                warn!(
                    parent = %parent_identity,
                    error = %mapping_error,
                    "parent payload mapping failed, creating child unlinked"
                );
                return Ok(ParentOutcome {
                    link: None,
                    pending: Some(parent_db_id),
                    relink: Vec::new(),
                });
            }
        };

        let probe = retry.run(|| self.tasklist.find_by_origin(&parent_identity)).await;
        let tasklist_id = match probe {
            Ok(Some(existing_id)) => existing_id,
            Ok(None) => match retry.run(|| self.tasklist.create(&payload)).await {
                Ok(created_id) => created_id,
                Err(backend_error) => {
                    warn!(
                        parent = %parent_identity,
                        error = %backend_error,
                        "parent creation failed, creating child unlinked"
                    );
                    return Ok(ParentOutcome {
                        link: None,
                        pending: Some(parent_db_id),
                        relink: Vec::new(),
                    });
                }
            },
            Err(backend_error) => {
                warn!(
                    parent = %parent_identity,
                    error = %backend_error,
                    "parent probe failed, creating child unlinked"
                );
                return Ok(ParentOutcome {
                    link: None,
                    pending: Some(parent_db_id),
                    relink: Vec::new(),
                });
            }
        };

        let parent_fingerprint = fingerprint(&parent_task);
        let parent_correlation = CorrelationRecord::new(
            parent_db_id.clone(),
            tasklist_id.clone(),
            parent_fingerprint.clone(),
            parent_fingerprint,
            self.clock.as_ref(),
        );
        match self.store.insert(&parent_correlation).await {
            Ok(()) => {}
            Err(CorrelationStoreError::DuplicateIdentity(_)) => {
                // Lost a race; whatever is stored wins.
                if let Some(existing) = self.store.find_by_identity(&parent_identity).await? {
                    return Ok(ParentOutcome {
                        link: Some((
                            existing.id_on(SystemSide::Tasklist).clone(),
                            existing.id(),
                        )),
                        pending: None,
                        relink: Vec::new(),
                    });
                }
                return Ok(ParentOutcome::default());
            }
            Err(store_error) => return Err(store_error.into()),
        }
        info!(parent = %parent_identity, task = %tasklist_id, "synthesized parent task");

        let relink = self.store.take_pending_children(&parent_db_id).await?;
        Ok(ParentOutcome {
            link: Some((tasklist_id, parent_correlation.id())),
            pending: None,
            relink,
        })
    }

    async fn first_sync(
        &self,
        identity: &RecordIdentity,
        normalized: &NormalizedTask,
        parent: ParentOutcome,
        config: &SyncConfig,
        retry: &RetryPolicy,
    ) -> Result<PassResult, EngineError> {
        let destination_side = identity.side.counterpart();
        let destination = self.backend_for(destination_side);
        let ParentOutcome {
            link: parent_link,
            pending: parent_pending,
            relink: mut unlocked,
        } = parent;

        let payload = match to_destination_payload(normalized, &config.mapping, destination_side) {
            Ok(payload) => payload,
            Err(mapping_error) => {
                return Ok(self.record_mapping_failed(identity, &mapping_error, unlocked));
            }
        };
        let payload = attach_parent(payload, parent_link.as_ref());

        // Idempotency probe: a crashed run may have written the counterpart
        // without persisting the correlation. Adopt it rather than create a
        // duplicate.
        let probe = match retry.run(|| destination.find_by_origin(identity)).await {
            Ok(probe) => probe,
            Err(backend_error) => {
                return Ok(self.record_failed(identity, "origin probe", &backend_error, unlocked));
            }
        };

        let counterpart_id = match probe {
            Some(existing_id) => {
                debug!(record = %identity, counterpart = %existing_id, "adopting counterpart from interrupted run");
                match retry.run(|| destination.update(&existing_id, &payload)).await {
                    Ok(WriteOutcome::Applied) => existing_id,
                    Ok(WriteOutcome::NotFound) => {
                        match retry.run(|| destination.create(&payload)).await {
                            Ok(created_id) => created_id,
                            Err(backend_error) => {
                                return Ok(self.record_failed(
                                    identity,
                                    "create",
                                    &backend_error,
                                    unlocked,
                                ));
                            }
                        }
                    }
                    Err(backend_error) => {
                        return Ok(self.record_failed(identity, "adopt", &backend_error, unlocked));
                    }
                }
            }
            None => {
                if normalized.completed {
                    // A completed record with no counterpart stays
                    // uncreated; its counterpart may have been closed and
                    // filtered out on the other side already.
                    debug!(record = %identity, "completed record without counterpart, skipping creation");
                    return Ok(PassResult::of(ReconcileOutcome::SkippedCompleted, unlocked));
                }
                match retry.run(|| destination.create(&payload)).await {
                    Ok(created_id) => created_id,
                    Err(backend_error) => {
                        return Ok(self.record_failed(identity, "create", &backend_error, unlocked));
                    }
                }
            }
        };

        let content_fingerprint = fingerprint(normalized);
        let (database_id, tasklist_id) = match identity.side {
            SystemSide::Database => (identity.id.clone(), counterpart_id.clone()),
            SystemSide::Tasklist => (counterpart_id.clone(), identity.id.clone()),
        };
        let mut correlation = CorrelationRecord::new(
            database_id,
            tasklist_id,
            content_fingerprint.clone(),
            content_fingerprint,
            self.clock.as_ref(),
        );
        if let Some((_, parent_correlation_id)) = &parent_link {
            correlation.set_parent(*parent_correlation_id);
        }
        self.store.insert(&correlation).await?;

        if let Some(parent_source) = parent_pending {
            self.store
                .add_pending_parent_link(identity, &parent_source)
                .await?;
        }
        if identity.side == SystemSide::Database {
            unlocked.extend(self.store.take_pending_children(&identity.id).await?);
        }

        self.health.record_success(self.clock.utc());
        let counterpart = RecordIdentity {
            side: destination_side,
            id: counterpart_id,
        };
        info!(record = %identity, counterpart = %counterpart, "first sync complete");
        Ok(PassResult::of(
            ReconcileOutcome::Created { counterpart },
            unlocked,
        ))
    }

    async fn correlated_sync(
        &self,
        identity: &RecordIdentity,
        origin_normalized: &NormalizedTask,
        mut correlation: CorrelationRecord,
        parent: ParentOutcome,
        config: &SyncConfig,
        retry: &RetryPolicy,
    ) -> Result<PassResult, EngineError> {
        let counterpart_side = identity.side.counterpart();
        let counterpart_id = correlation.id_on(counterpart_side).clone();
        let counterpart_backend = self.backend_for(counterpart_side);
        let ParentOutcome {
            link: parent_link,
            pending: parent_pending,
            relink: unlocked,
        } = parent;

        if let Some(parent_source) = parent_pending {
            self.store
                .add_pending_parent_link(identity, &parent_source)
                .await?;
        }

        let fetched = match retry.run(|| counterpart_backend.fetch(&counterpart_id)).await {
            Ok(fetched) => fetched,
            Err(backend_error) => {
                return Ok(self.record_failed(identity, "counterpart fetch", &backend_error, unlocked));
            }
        };
        let Some(counterpart_record) = fetched else {
            // The counterpart was removed on the other side; propagate the
            // deletion back to the origin and tombstone the pair.
            return self
                .propagate_vanished(identity, correlation, counterpart_side, retry, unlocked)
                .await;
        };

        let counterpart_normalized = match to_normalized(&counterpart_record, &config.mapping) {
            Ok(normalized) => normalized,
            Err(mapping_error) => {
                return Ok(self.record_mapping_failed(identity, &mapping_error, unlocked));
            }
        };

        let (database_state, tasklist_state) = match identity.side {
            SystemSide::Database => (origin_normalized, &counterpart_normalized),
            SystemSide::Tasklist => (&counterpart_normalized, origin_normalized),
        };

        let resolver = ConflictResolver::new(config.conflict_policy);
        let resolution = resolver.resolve(&correlation, database_state, tasklist_state);

        let (direction, conflict) = match resolution {
            Resolution::Noop => {
                return self
                    .link_only_pass(
                        identity,
                        tasklist_state,
                        correlation,
                        parent_link,
                        config,
                        retry,
                        unlocked,
                    )
                    .await;
            }
            Resolution::Apply(direction) => (direction, false),
            Resolution::ConflictLogged(direction) => {
                warn!(
                    record = %identity,
                    winner = %direction.winner(),
                    "concurrent edits tied on timestamp, fixed preference applied"
                );
                self.health.record_conflict();
                (direction, true)
            }
        };

        let (winner_state, loser_state) = match direction.winner() {
            SystemSide::Database => (database_state, tasklist_state),
            SystemSide::Tasklist => (tasklist_state, database_state),
        };
        let destination_side = direction.loser();
        let destination_id = correlation.id_on(destination_side).clone();
        let destination = self.backend_for(destination_side);

        let payload = match to_destination_payload(winner_state, &config.mapping, destination_side) {
            Ok(payload) => payload,
            Err(mapping_error) => {
                return Ok(self.record_mapping_failed(identity, &mapping_error, unlocked));
            }
        };
        let payload = attach_parent(payload, parent_link.as_ref());

        match retry.run(|| destination.update(&destination_id, &payload)).await {
            Ok(WriteOutcome::Applied) => {}
            Ok(WriteOutcome::NotFound) => {
                return self
                    .propagate_vanished(identity, correlation, destination_side, retry, unlocked)
                    .await;
            }
            Err(backend_error) => {
                return Ok(self.record_failed(identity, "apply", &backend_error, unlocked));
            }
        }

        // The destination now mirrors the winner, except an unset winner
        // description leaves the destination's alone.
        let mut expected_destination = winner_state.clone();
        if expected_destination.description.is_none() {
            expected_destination.description = loser_state.description.clone();
        }
        let winner_fingerprint = fingerprint(winner_state);
        let destination_fingerprint = fingerprint(&expected_destination);
        let (database_fingerprint, tasklist_fingerprint) = match destination_side {
            SystemSide::Database => (destination_fingerprint, winner_fingerprint),
            SystemSide::Tasklist => (winner_fingerprint, destination_fingerprint),
        };
        if let Some((_, parent_correlation_id)) = &parent_link
            && correlation.parent().is_none()
        {
            correlation.set_parent(*parent_correlation_id);
        }
        correlation.record_sync(
            database_fingerprint,
            tasklist_fingerprint,
            self.clock.as_ref(),
        );
        self.store.update(&correlation).await?;
        self.health.record_success(self.clock.utc());
        info!(record = %identity, ?direction, conflict, "reconciliation applied");

        let outcome = if conflict {
            ReconcileOutcome::ConflictApplied { direction }
        } else {
            ReconcileOutcome::Applied { direction }
        };
        Ok(PassResult::of(outcome, unlocked))
    }

    /// Content is unchanged, but a previously unresolved parent link may
    /// now be applicable.
    #[expect(clippy::too_many_arguments, reason = "pipeline context threading")]
    async fn link_only_pass(
        &self,
        identity: &RecordIdentity,
        tasklist_state: &NormalizedTask,
        mut correlation: CorrelationRecord,
        parent_link: Option<(RecordId, CorrelationId)>,
        config: &SyncConfig,
        retry: &RetryPolicy,
        unlocked: Vec<RecordIdentity>,
    ) -> Result<PassResult, EngineError> {
        let Some((parent_task_id, parent_correlation_id)) = parent_link else {
            debug!(record = %identity, "no effective change, reconciliation is a no-op");
            return Ok(PassResult::of(ReconcileOutcome::Noop, unlocked));
        };
        if correlation.parent().is_some() {
            debug!(record = %identity, "no effective change, reconciliation is a no-op");
            return Ok(PassResult::of(ReconcileOutcome::Noop, unlocked));
        }

        let tasklist_id = correlation.id_on(SystemSide::Tasklist).clone();
        let payload =
            match to_destination_payload(tasklist_state, &config.mapping, SystemSide::Tasklist) {
                Ok(payload) => payload,
                Err(mapping_error) => {
                    return Ok(self.record_mapping_failed(identity, &mapping_error, unlocked));
                }
            };
        let payload = attach_parent(payload, Some(&(parent_task_id.clone(), parent_correlation_id)));

        match retry.run(|| self.tasklist.update(&tasklist_id, &payload)).await {
            Ok(WriteOutcome::Applied) => {}
            Ok(WriteOutcome::NotFound) => {
                return self
                    .propagate_vanished(
                        identity,
                        correlation,
                        SystemSide::Tasklist,
                        retry,
                        unlocked,
                    )
                    .await;
            }
            Err(backend_error) => {
                return Ok(self.record_failed(identity, "link", &backend_error, unlocked));
            }
        }

        correlation.set_parent(parent_correlation_id);
        self.store.update(&correlation).await?;
        self.health.record_success(self.clock.utc());
        info!(record = %identity, parent_task = %parent_task_id, "deferred parent link applied");
        Ok(PassResult::of(ReconcileOutcome::Linked, unlocked))
    }

    /// One side of a correlated pair turned out to be gone mid-pipeline.
    /// The deletion is propagated to the surviving side and the pair
    /// tombstoned.
    async fn propagate_vanished(
        &self,
        identity: &RecordIdentity,
        mut correlation: CorrelationRecord,
        vanished_side: SystemSide,
        retry: &RetryPolicy,
        unlocked: Vec<RecordIdentity>,
    ) -> Result<PassResult, EngineError> {
        let surviving_side = vanished_side.counterpart();
        let surviving_id = correlation.id_on(surviving_side).clone();
        let surviving_backend = self.backend_for(surviving_side);
        if let Err(backend_error) = retry.run(|| surviving_backend.delete(&surviving_id)).await {
            return Ok(self.record_failed(identity, "propagate delete", &backend_error, unlocked));
        }
        correlation.tombstone(self.clock.as_ref());
        self.store.update(&correlation).await?;
        self.health.record_success(self.clock.utc());
        info!(
            record = %identity,
            vanished = %vanished_side,
            "record vanished mid-pipeline, deletion propagated and correlation tombstoned"
        );
        Ok(PassResult::of(ReconcileOutcome::Deleted, unlocked))
    }
}

fn attach_parent(
    payload: DestinationPayload,
    parent_link: Option<&(RecordId, CorrelationId)>,
) -> DestinationPayload {
    match (payload, parent_link) {
        (DestinationPayload::Tasklist(mut task), Some((parent_task_id, _))) => {
            task.parent_id = Some(parent_task_id.clone());
            DestinationPayload::Tasklist(task)
        }
        (payload, _) => payload,
    }
}
