use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use gatepass_api::{app, registry_from_config, seed_from_config, AppState};
use gatepass_scan::InMemoryRegistry;
use gatepass_store::app_config::Config;
use serde_json::{json, Value};
use tower::ServiceExt;

const T1: &str = "MI3AD-TICKET-TC240001-user1-1";
const USED: &str = "MI3AD-TICKET-MF240003-user3-3";
const EXPIRED: &str = "MI3AD-TICKET-AF230104-user4-4";
const UNKNOWN: &str = "MI3AD-TICKET-XXXXXX-userZ-99";

fn seed_path() -> String {
    format!("{}/../config/seed-tickets.json", env!("CARGO_MANIFEST_DIR"))
}

async fn test_state() -> AppState {
    let tickets = gatepass_store::load_seed_file(seed_path()).unwrap();
    let registry = InMemoryRegistry::with_tickets(tickets).await.unwrap();
    AppState::new(Arc::new(registry), 16)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn open_session(app: &Router, operator: &str) -> String {
    let (status, body) = send(app, "POST", "/v1/sessions", Some(json!({ "operator": operator }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

async fn scan(app: &Router, session: &str, token: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        &format!("/v1/sessions/{}/scan", session),
        Some(json!({ "token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn acknowledge(app: &Router, session: &str) -> StatusCode {
    send(app, "POST", &format!("/v1/sessions/{}/acknowledge", session), None).await.0
}

#[tokio::test]
async fn test_accept_then_reject_reuse() {
    let app = app(test_state().await);
    let session = open_session(&app, "north-gate").await;

    let first = scan(&app, &session, T1).await;
    assert_eq!(first["processed"], true);
    assert_eq!(first["outcome"]["result"], "ACCEPTED");
    assert_eq!(first["outcome"]["ticket"]["status"], "used");

    let (status, ticket) = send(&app, "GET", &format!("/v1/tickets/{}", T1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticket["status"], "used");

    assert_eq!(acknowledge(&app, &session).await, StatusCode::OK);

    let second = scan(&app, &session, T1).await;
    assert_eq!(second["outcome"]["result"], "REJECTED_ALREADY_USED");
    assert_eq!(second["rejection"], "ALREADY_USED");
}

#[tokio::test]
async fn test_rejections() {
    let app = app(test_state().await);
    let session = open_session(&app, "south-gate").await;

    let unknown = scan(&app, &session, UNKNOWN).await;
    assert_eq!(unknown["outcome"]["result"], "REJECTED_INVALID");
    assert_eq!(unknown["outcome"]["token"], UNKNOWN);
    assert_eq!(unknown["rejection"], "NOT_FOUND");
    acknowledge(&app, &session).await;

    let expired = scan(&app, &session, EXPIRED).await;
    assert_eq!(expired["outcome"]["result"], "REJECTED_EXPIRED");
    acknowledge(&app, &session).await;

    let (_, ticket) = send(&app, "GET", &format!("/v1/tickets/{}", EXPIRED), None).await;
    assert_eq!(ticket["status"], "expired");

    let used = scan(&app, &session, USED).await;
    assert_eq!(used["outcome"]["result"], "REJECTED_ALREADY_USED");
    assert_eq!(used["outcome"]["reason"], "STATUS_USED");
}

#[tokio::test]
async fn test_busy_session_ignores_tokens() {
    let app = app(test_state().await);
    let session = open_session(&app, "east-gate").await;

    scan(&app, &session, UNKNOWN).await;

    let ignored = scan(&app, &session, T1).await;
    assert_eq!(ignored["processed"], false);
    assert!(ignored.get("outcome").is_none());

    let (_, ticket) = send(&app, "GET", &format!("/v1/tickets/{}", T1), None).await;
    assert_eq!(ticket["status"], "valid");

    let (status, info) = send(&app, "GET", &format!("/v1/sessions/{}", session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["status"]["state"], "SHOWING_OUTCOME");
    assert_eq!(info["stats"]["ignored"], 1);
    assert_eq!(info["processed"], 1);

    assert_eq!(acknowledge(&app, &session).await, StatusCode::OK);
    assert_eq!(acknowledge(&app, &session).await, StatusCode::CONFLICT);

    let accepted = scan(&app, &session, T1).await;
    assert_eq!(accepted["outcome"]["result"], "ACCEPTED");
}

#[tokio::test]
async fn test_reset_and_close() {
    let app = app(test_state().await);
    let session = open_session(&app, "west-gate").await;

    scan(&app, &session, EXPIRED).await;
    let (status, info) = send(&app, "POST", &format!("/v1/sessions/{}/reset", session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["status"]["state"], "IDLE");

    let (status, _) = send(&app, "DELETE", &format!("/v1/sessions/{}", session), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &format!("/v1/sessions/{}", session), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_sessions_share_registry() {
    let app = app(test_state().await);
    let north = open_session(&app, "north-gate").await;
    let south = open_session(&app, "south-gate").await;

    assert_eq!(scan(&app, &north, T1).await["outcome"]["result"], "ACCEPTED");
    assert_eq!(
        scan(&app, &south, T1).await["outcome"]["result"],
        "REJECTED_ALREADY_USED"
    );
}

#[tokio::test]
async fn test_bad_requests() {
    let app = app(test_state().await);

    let (status, _) = send(&app, "POST", "/v1/sessions", Some(json!({ "operator": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", &format!("/v1/tickets/{}", UNKNOWN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/sessions/{}/scan", missing),
        Some(json!({ "token": T1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_counts() {
    let app = app(test_state().await);
    open_session(&app, "north-gate").await;

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tickets"], 4);
    assert_eq!(body["sessions"], 1);
}

#[tokio::test]
async fn test_scan_events_published() {
    let state = test_state().await;
    let mut rx = state.scan_tx.subscribe();
    let app = app(state);
    let session = open_session(&app, "north-gate").await;

    scan(&app, &session, T1).await;
    scan(&app, &session, UNKNOWN).await; // ignored, no event

    let event = rx.try_recv().unwrap();
    assert_eq!(event.token, T1);
    assert_eq!(event.outcome, "ACCEPTED");
    assert_eq!(event.operator, "north-gate");
    assert_eq!(event.event_id.as_deref(), Some("1"));
    assert!(rx.try_recv().is_err());
}

fn memory_config() -> Config {
    Config::from_toml(&format!(
        r#"
        [server]
        port = 3000

        [registry]
        backend = "memory"
        seed_path = "{}"
        "#,
        seed_path()
    ))
    .unwrap()
}

#[tokio::test]
async fn test_registry_from_config_seeds_memory_backend() {
    let config = memory_config();
    let registry = registry_from_config(&config).await.unwrap();
    assert_eq!(registry.len().await.unwrap(), 4);
    assert!(registry.lookup(T1).await.unwrap().is_some());
}

#[tokio::test]
async fn test_second_gate_seeding_shared_registry_starts() {
    let config = memory_config();
    let registry = registry_from_config(&config).await.unwrap();

    // Another gate process starting against the same registry.
    let summary = seed_from_config(registry.as_ref(), &config).await.unwrap();
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.already_present, 4);
    assert_eq!(registry.len().await.unwrap(), 4);
}
