//! Periodic poll scan: the pull-side change producer.
//!
//! The scan lists database-side records modified since the watermark and
//! feeds at most `max_records_per_run` of them through the engine in
//! original change order. The watermark only advances past records
//! actually processed, so deferred overflow reappears first on the next
//! run. The tasklist side is webhook-only, so the scan never re-ingests
//! the engine's own tasklist writes.

use crate::backend::{RawRecord, TaskBackend};
use crate::config::ConfigHandle;
use crate::correlation::CorrelationStore;
use crate::engine::{ApplyEngine, EngineError, ReconcileOutcome, RetryPolicy};
use crate::intake::{ChangeKind, ChangeNotification};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Outcome of one poll run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Records fed through the engine this run.
    pub processed: usize,
    /// Records listed beyond the cap and deferred to the next run. A lower
    /// bound: the listing itself is capped one past the run limit.
    pub deferred: usize,
    /// Whether the run was skipped by the time-of-day window.
    pub skipped_by_window: bool,
}

/// Batch change producer driven by a scheduler interval.
pub struct PollScanner<S, C>
where
    S: CorrelationStore,
    C: Clock + Send + Sync,
{
    engine: Arc<ApplyEngine<S, C>>,
    database: Arc<dyn TaskBackend>,
    config: Arc<ConfigHandle>,
    clock: Arc<C>,
    watermark: Mutex<DateTime<Utc>>,
}

impl<S, C> PollScanner<S, C>
where
    S: CorrelationStore,
    C: Clock + Send + Sync,
{
    /// Creates a scanner starting from the epoch: a fresh process performs
    /// a full resync, which an empty correlation store makes valid.
    #[must_use]
    pub fn new(
        engine: Arc<ApplyEngine<S, C>>,
        database: Arc<dyn TaskBackend>,
        config: Arc<ConfigHandle>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            engine,
            database,
            config,
            clock,
            watermark: Mutex::new(DateTime::UNIX_EPOCH),
        }
    }

    /// Runs one poll scan.
    ///
    /// Configuration is reloaded at run start, never mid-run; a reload
    /// failure keeps the previous snapshot rather than skipping the scan.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the correlation store fails; one bad
    /// record never aborts the batch, a broken store always does.
    pub async fn run_once(&self) -> Result<PollReport, EngineError> {
        let config = match self.config.reload() {
            Ok(config) => config,
            Err(config_error) => {
                warn!(error = %config_error, "config reload failed, keeping previous snapshot");
                self.config.snapshot()?
            }
        };

        if let Some(window) = config.poll.window {
            let now = self.clock.local().time();
            if !window.contains(now) {
                debug!("poll skipped, outside configured time window");
                return Ok(PollReport {
                    skipped_by_window: true,
                    ..PollReport::default()
                });
            }
        }

        let cap = config.poll.max_records_per_run;
        let retry = RetryPolicy::from(config.retry);
        let since = self.current_watermark();

        // One extra record tells us whether anything was deferred.
        let mut changed = match retry
            .run(|| self.database.changed_since(since, cap + 1))
            .await
        {
            Ok(records) => records,
            Err(backend_error) => {
                warn!(error = %backend_error, "change listing failed, run skipped");
                return Ok(PollReport::default());
            }
        };

        changed.sort_by_key(RawRecord::last_modified);
        let deferred = changed.len().saturating_sub(cap);
        changed.truncate(cap);

        let mut processed = 0usize;
        for record in changed {
            let identity = record.identity();
            let modified = record.last_modified();
            let outcome = self
                .engine
                .process(ChangeNotification::new(identity.clone(), ChangeKind::Changed))
                .await?;
            if outcome == ReconcileOutcome::Abandoned {
                debug!(record = %identity, "engine shutting down, rest of batch abandoned");
                break;
            }
            processed += 1;
            self.advance_watermark(modified);
        }

        info!(processed, deferred, "poll scan complete");
        Ok(PollReport {
            processed,
            deferred,
            skipped_by_window: false,
        })
    }

    fn current_watermark(&self) -> DateTime<Utc> {
        *self
            .watermark
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn advance_watermark(&self, to: DateTime<Utc>) {
        let mut watermark = self
            .watermark
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if to > *watermark {
            *watermark = to;
        }
    }
}
