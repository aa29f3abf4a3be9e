//! Webhook ingress: the push-side change producer.
//!
//! Two logical endpoints feed the engine:
//!
//! - `/webhooks/database`: answers the provider's GET challenge, surfaces
//!   one-time verification tokens for out-of-band operator confirmation,
//!   and accepts change events.
//! - `/webhooks/tasklist`: requires an HMAC-SHA256 signature over the raw
//!   body; unsigned or mis-signed payloads are rejected before any of
//!   their content is trusted.
//!
//! Handlers acknowledge with 202 and process asynchronously; at-least-once
//! redelivery is harmless because the engine is idempotent.

pub mod signature;

use crate::config::ConfigHandle;
use crate::correlation::CorrelationStore;
use crate::engine::{ApplyEngine, HealthSnapshot};
use crate::identity::{RecordIdentity, SystemSide};
use crate::intake::{ChangeKind, ChangeNotification};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mockable::Clock;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared state behind the webhook routes.
pub struct WebhookState<S, C>
where
    S: CorrelationStore,
    C: Clock + Send + Sync,
{
    /// The engine notifications are submitted to.
    pub engine: Arc<ApplyEngine<S, C>>,
    /// Configuration handle for webhook secrets.
    pub config: Arc<ConfigHandle>,
}

/// Builds the ingress router: both webhook endpoints plus `/health`.
pub fn router<S, C>(state: Arc<WebhookState<S, C>>) -> Router
where
    S: CorrelationStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/webhooks/database",
            get(database_challenge).post(database_event::<S, C>),
        )
        .route("/webhooks/tasklist", post(tasklist_event::<S, C>))
        .route("/health", get(health::<S, C>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ChallengeParams {
    challenge: String,
}

/// GET verification: echo the challenge token back.
async fn database_challenge(Query(params): Query<ChallengeParams>) -> Json<Value> {
    Json(json!({ "challenge": params.challenge }))
}

async fn database_event<S, C>(
    State(state): State<Arc<WebhookState<S, C>>>,
    body: Bytes,
) -> Response
where
    S: CorrelationStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Ok(event) = serde_json::from_slice::<Value>(&body) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid json"}))).into_response();
    };

    // One-time setup token: the operator must confirm it with the provider
    // out of band; it is never auto-confirmed.
    if let Some(token) = event.get("verification_token").and_then(Value::as_str) {
        info!(
            verification_token = token,
            "database webhook verification token received, confirm it with the provider"
        );
        return (StatusCode::OK, Json(json!({"status": "accepted"}))).into_response();
    }

    let Some(event_type) = event.get("type").and_then(Value::as_str) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "missing event type"})),
        )
            .into_response();
    };
    let Some(record_id) = event
        .pointer("/entity/id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "missing entity id"})),
        )
            .into_response();
    };

    let kind = if event_type.ends_with("deleted") {
        ChangeKind::Deleted
    } else {
        ChangeKind::Changed
    };
    submit(
        &state.engine,
        ChangeNotification::new(RecordIdentity::new(SystemSide::Database, record_id), kind),
    );
    (
        StatusCode::ACCEPTED,
        Json(json!({"status": "accepted", "type": event_type})),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct TasklistEvent {
    event_name: String,
    event_data: TasklistEventData,
}

#[derive(Debug, Deserialize)]
struct TasklistEventData {
    id: String,
}

/// Header carrying the hex HMAC-SHA256 signature of the raw body.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

async fn tasklist_event<S, C>(
    State(state): State<Arc<WebhookState<S, C>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: CorrelationStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Ok(config) = state.config.snapshot() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let Some(secret) = config.webhooks.tasklist_secret.as_deref() else {
        warn!("tasklist webhook rejected: no shared secret configured");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let Some(provided) = provided else {
        warn!("tasklist webhook rejected: signature header missing");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if !signature::verify_signature(provided, secret, &body) {
        warn!("tasklist webhook rejected: signature mismatch");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    // Only now is the payload trusted enough to parse.
    let Ok(event) = serde_json::from_slice::<TasklistEvent>(&body) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid event"}))).into_response();
    };
    let kind = if event.event_name.ends_with("deleted") {
        ChangeKind::Deleted
    } else {
        ChangeKind::Changed
    };
    submit(
        &state.engine,
        ChangeNotification::new(
            RecordIdentity::new(SystemSide::Tasklist, event.event_data.id),
            kind,
        ),
    );
    (
        StatusCode::ACCEPTED,
        Json(json!({"status": "accepted", "event": event.event_name})),
    )
        .into_response()
}

async fn health<S, C>(State(state): State<Arc<WebhookState<S, C>>>) -> Json<HealthSnapshot>
where
    S: CorrelationStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    Json(state.engine.health_snapshot().await)
}

fn submit<S, C>(engine: &Arc<ApplyEngine<S, C>>, notification: ChangeNotification)
where
    S: CorrelationStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    let engine = Arc::clone(engine);
    tokio::spawn(async move {
        let record = notification.identity.clone();
        if let Err(engine_error) = engine.process(notification).await {
            error!(record = %record, error = %engine_error, "reconciliation aborted");
        }
    });
}
