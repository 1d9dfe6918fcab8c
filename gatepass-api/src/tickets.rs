use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use gatepass_core::Ticket;
use serde::Serialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub tickets: usize,
    pub sessions: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/tickets/{token}", get(get_ticket))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    Ok(Json(HealthResponse {
        status: "ok",
        tickets: state.registry.len().await?,
        sessions: state.sessions.len().await,
    }))
}

/// GET /v1/tickets/{token}
async fn get_ticket(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Ticket>, AppError> {
    state
        .registry
        .lookup(&token)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError(format!("Ticket {} not found", token)))
}
