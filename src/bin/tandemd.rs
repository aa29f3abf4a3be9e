//! Tandem sync daemon.
//!
//! Wires the correlation store, both backend adapters, the webhook ingress
//! server, and the poll scheduler into one process.
//!
//! Environment:
//!
//! - `TANDEM_CONFIG` — path to the JSON sync configuration
//! - `DATABASE_URL` — `PostgreSQL` connection string for the correlation
//!   store
//! - `DATABASE_API_URL` / `DATABASE_API_TOKEN` — structured-database
//!   service
//! - `TASKLIST_API_URL` / `TASKLIST_API_TOKEN` — task-list service
//! - `TANDEM_BIND` — webhook listen address (default `0.0.0.0:8080`)
//! - `RUST_LOG` — tracing filter (default `info`)

use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use std::sync::Arc;
use std::time::Duration;
use tandem::backend::adapters::rest::{DatabaseRestBackend, TasklistRestBackend};
use tandem::backend::{BackendError, TaskBackend};
use tandem::config::{ConfigError, ConfigHandle};
use tandem::correlation::adapters::postgres::PostgresCorrelationStore;
use tandem::engine::{ApplyEngine, HealthState};
use tandem::intake::PollScanner;
use tandem::intake::webhook::{self, WebhookState};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Errors that prevent the daemon from starting or force it down.
#[derive(Debug, Error)]
enum ServerError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build connection pool: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn require_env(name: &'static str) -> Result<String, ServerError> {
    std::env::var(name).map_err(|_| ServerError::MissingEnv(name))
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = require_env("TANDEM_CONFIG")?;
    let store_url = require_env("DATABASE_URL")?;
    let database_api_url = require_env("DATABASE_API_URL")?;
    let database_api_token = require_env("DATABASE_API_TOKEN")?;
    let tasklist_api_url = require_env("TASKLIST_API_URL")?;
    let tasklist_api_token = require_env("TASKLIST_API_TOKEN")?;
    let bind_addr =
        std::env::var("TANDEM_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());

    let config = Arc::new(ConfigHandle::from_file(config_path)?);
    let snapshot = config.snapshot()?;
    let timeout = Duration::from_millis(snapshot.retry.timeout_ms);

    let pool = Pool::builder().build(ConnectionManager::new(store_url))?;
    let store = Arc::new(PostgresCorrelationStore::new(pool));

    let database: Arc<dyn TaskBackend> = Arc::new(DatabaseRestBackend::new(
        database_api_url,
        database_api_token,
        timeout,
    )?);
    let tasklist: Arc<dyn TaskBackend> = Arc::new(TasklistRestBackend::new(
        tasklist_api_url,
        tasklist_api_token,
        timeout,
    )?);

    let clock = Arc::new(DefaultClock);
    let health = Arc::new(HealthState::new());
    let engine = Arc::new(ApplyEngine::new(
        Arc::clone(&store),
        Arc::clone(&database),
        Arc::clone(&tasklist),
        Arc::clone(&config),
        Arc::clone(&clock),
        health,
        snapshot.workers,
    ));
    let scanner = Arc::new(PollScanner::new(
        Arc::clone(&engine),
        database,
        Arc::clone(&config),
        clock,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let router = webhook::router(Arc::new(WebhookState {
        engine: Arc::clone(&engine),
        config: Arc::clone(&config),
    }));
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "webhook ingress listening");
    let mut server_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    let poll_engine_config = Arc::clone(&config);
    let mut poll_shutdown = shutdown_rx;
    let poller = tokio::spawn(async move {
        loop {
            let interval = poll_engine_config
                .snapshot()
                .map(|snapshot| snapshot.poll.interval_secs)
                .unwrap_or(60);
            tokio::select! {
                changed = poll_shutdown.changed() => {
                    if changed.is_ok() {
                        break;
                    }
                }
                () = tokio::time::sleep(Duration::from_secs(interval)) => {
                    if let Err(run_error) = scanner.run_once().await {
                        // Store failures abort the batch; the next interval
                        // retries against a possibly recovered store.
                        error!(error = %run_error, "poll run aborted");
                    }
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, draining in-flight reconciliations");
    engine.begin_shutdown();
    let _ = shutdown_tx.send(true);
    engine.drain().await;
    let _ = poller.await;
    if let Ok(Err(serve_error)) = server.await {
        error!(error = %serve_error, "ingress server terminated abnormally");
    }
    info!("shutdown complete");
    Ok(())
}
