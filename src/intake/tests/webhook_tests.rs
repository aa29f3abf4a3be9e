//! Webhook ingress routing, verification, and rejection.

use super::harness::{IntakeHarness, base_config, harness_page, intake_harness};
use crate::backend::record::{RawRecord, TasklistRecord};
use crate::correlation::CorrelationStore;
use crate::identity::{RecordId, RecordIdentity, SystemSide};
use crate::intake::webhook::{SIGNATURE_HEADER, WebhookState, router, signature};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app(fixture: &IntakeHarness) -> Router {
    router(Arc::new(WebhookState {
        engine: Arc::clone(&fixture.engine),
        config: Arc::clone(&fixture.config),
    }))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be json")
}

/// Polls the store until the identity is correlated; handlers process
/// asynchronously after acknowledging.
async fn wait_for_correlation(fixture: &IntakeHarness, identity: &RecordIdentity) {
    for _ in 0..200 {
        let found = fixture
            .store
            .find_by_identity(identity)
            .await
            .expect("lookup should succeed");
        if found.is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("correlation for {identity} never appeared");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn database_get_echoes_the_challenge() {
    let fixture = intake_harness(base_config());

    let response = app(&fixture)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/webhooks/database?challenge=abc123")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should route");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"challenge": "abc123"}));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn database_verification_token_is_acknowledged_not_processed() {
    let fixture = intake_harness(base_config());

    let response = app(&fixture)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/database")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"verification_token": "tok-123"}).to_string(),
                ))
                .expect("request should build"),
        )
        .await
        .expect("request should route");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(fixture.tasklist.writes().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn database_event_reaches_the_engine() {
    let fixture = intake_harness(base_config());
    fixture.database.seed(harness_page("page-1", "From webhook"));

    let response = app(&fixture)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/database")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "type": "page.content_updated",
                        "id": "evt-1",
                        "entity": {"id": "page-1"}
                    })
                    .to_string(),
                ))
                .expect("request should build"),
        )
        .await
        .expect("request should route");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    wait_for_correlation(
        &fixture,
        &RecordIdentity::new(SystemSide::Database, "page-1"),
    )
    .await;
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn database_event_without_entity_id_is_rejected() {
    let fixture = intake_harness(base_config());

    let response = app(&fixture)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/database")
                .header("content-type", "application/json")
                .body(Body::from(json!({"type": "page.created"}).to_string()))
                .expect("request should build"),
        )
        .await
        .expect("request should route");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn tasklist_event_body() -> String {
    json!({
        "event_name": "item:updated",
        "event_data": {"id": "tl-5"}
    })
    .to_string()
}

fn seeded_tasklist_fixture() -> IntakeHarness {
    let fixture = intake_harness(base_config());
    fixture.tasklist.seed(RawRecord::Tasklist(TasklistRecord {
        id: RecordId::new("tl-5"),
        content: "Signed task".to_owned(),
        description: None,
        due_date: None,
        due_string: None,
        priority: 1,
        project: None,
        labels: Vec::new(),
        parent_id: None,
        completed: false,
        last_modified: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().expect("valid timestamp"),
    }));
    fixture
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unsigned_tasklist_event_is_rejected() {
    let fixture = seeded_tasklist_fixture();

    let response = app(&fixture)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/tasklist")
                .header("content-type", "application/json")
                .body(Body::from(tasklist_event_body()))
                .expect("request should build"),
        )
        .await
        .expect("request should route");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(fixture.database.writes().is_empty(), "payload must never reach the engine");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn mis_signed_tasklist_event_is_rejected() {
    let fixture = seeded_tasklist_fixture();
    let wrong = signature::compute_signature("wrong-secret", tasklist_event_body().as_bytes());

    let response = app(&fixture)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/tasklist")
                .header("content-type", "application/json")
                .header(SIGNATURE_HEADER, wrong)
                .body(Body::from(tasklist_event_body()))
                .expect("request should build"),
        )
        .await
        .expect("request should route");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(fixture.database.writes().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn signed_tasklist_event_is_processed() {
    let fixture = seeded_tasklist_fixture();
    let body = tasklist_event_body();
    let signed = signature::compute_signature("shared-secret", body.as_bytes());

    let response = app(&fixture)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/tasklist")
                .header("content-type", "application/json")
                .header(SIGNATURE_HEADER, signed)
                .body(Body::from(body))
                .expect("request should build"),
        )
        .await
        .expect("request should route");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    wait_for_correlation(
        &fixture,
        &RecordIdentity::new(SystemSide::Tasklist, "tl-5"),
    )
    .await;
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn health_reports_store_and_counters() {
    let fixture = intake_harness(base_config());

    let response = app(&fixture)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should route");

    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["store_reachable"], json!(true));
    assert_eq!(health["failed_count"], json!(0));
    assert_eq!(health["correlation_count"], json!(0));
}
