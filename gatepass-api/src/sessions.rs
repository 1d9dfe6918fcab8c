use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use gatepass_scan::{ScanOutcome, ScanRejection, ScanSession, SessionState, SessionStats, Submission};
use gatepass_shared::models::events::TicketScannedEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::{AppState, SharedSession}};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub operator: String,
}

#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub operator: String,
    pub opened_at: DateTime<Utc>,
    pub status: SessionState,
    /// Tokens that reached the registry.
    pub processed: u64,
    pub stats: SessionStats,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    /// False when the session was still showing a previous outcome.
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ScanOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<ScanRejection>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/sessions", post(open_session))
        .route("/v1/sessions/{id}", axum::routing::get(get_session).delete(close_session))
        .route("/v1/sessions/{id}/scan", post(scan_token))
        .route("/v1/sessions/{id}/acknowledge", post(acknowledge))
        .route("/v1/sessions/{id}/reset", post(reset_session))
}

// ============================================================================
// Handlers
// ============================================================================

async fn find_session(state: &AppState, id: Uuid) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFoundError(format!("Scan session {} not found", id)))
}

fn describe(session: &ScanSession) -> SessionResponse {
    SessionResponse {
        session_id: session.id(),
        operator: session.operator().to_string(),
        opened_at: session.opened_at(),
        status: session.state().clone(),
        processed: session.stats().processed(),
        stats: session.stats().clone(),
    }
}

fn publish(state: &AppState, session: &ScanSession, outcome: &ScanOutcome) {
    let event = TicketScannedEvent {
        session_id: session.id(),
        operator: session.operator().to_string(),
        token: outcome.token().to_string(),
        ticket_number: outcome.ticket().map(|t| t.ticket_number.clone()),
        event_id: outcome.ticket().map(|t| t.event_id.clone()),
        outcome: outcome.code().to_string(),
        scanned_at: Utc::now().timestamp(),
    };
    if let Err(e) = state.scan_tx.send(event) {
        tracing::debug!("Scan event for session {} not delivered: {}", session.id(), e);
    }
}

/// Pick up a scan whose request was dropped mid-validation.
async fn settle(state: &AppState, session: &mut ScanSession) -> Result<(), AppError> {
    if let Some(outcome) = session.settle().await? {
        tracing::warn!("Scan session {} recovered an abandoned scan", session.id());
        publish(state, session, &outcome);
    }
    Ok(())
}

/// POST /v1/sessions
async fn open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<OpenSessionResponse>), AppError> {
    let operator = req.operator.trim();
    if operator.is_empty() {
        return Err(AppError::ValidationError("operator must not be empty".to_string()));
    }

    let session = ScanSession::new(operator, state.registry.clone());
    let session_id = state.sessions.open(session).await;
    tracing::info!("Scan session {} opened for {}", session_id, operator);

    Ok((StatusCode::CREATED, Json(OpenSessionResponse { session_id })))
}

/// GET /v1/sessions/{id}
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    settle(&state, &mut session).await?;
    Ok(Json(describe(&session)))
}

/// DELETE /v1/sessions/{id}
async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.close(&id).await {
        return Err(AppError::NotFoundError(format!("Scan session {} not found", id)));
    }
    tracing::info!("Scan session {} closed", id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/sessions/{id}/scan
async fn scan_token(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    settle(&state, &mut session).await?;

    let outcome = match session.submit(&req.token).await? {
        Submission::Processed(outcome) => outcome,
        Submission::Ignored => {
            return Ok(Json(ScanResponse {
                processed: false,
                outcome: None,
                rejection: None,
            }))
        }
    };

    publish(&state, &session, &outcome);

    Ok(Json(ScanResponse {
        processed: true,
        rejection: outcome.rejection(),
        outcome: Some(outcome),
    }))
}

/// POST /v1/sessions/{id}/acknowledge
async fn acknowledge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScanOutcome>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    settle(&state, &mut session).await?;
    let outcome = session.acknowledge()?;
    Ok(Json(outcome))
}

/// POST /v1/sessions/{id}/reset
async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    if let Some(outcome) = session.reset().await? {
        publish(&state, &session, &outcome);
    }
    Ok(Json(describe(&session)))
}
