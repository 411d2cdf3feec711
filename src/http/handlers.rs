use super::state::AppState;
use crate::session::CallStats;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StartCallRequest {
    /// Room to join (if not provided, generate one)
    pub call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartCallResponse {
    pub call_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /calls
/// Join a room and run a call session in the background
pub async fn start_call(
    State(state): State<AppState>,
    Json(req): Json<StartCallRequest>,
) -> impl IntoResponse {
    let call_id = req
        .call_id
        .unwrap_or_else(|| format!("call-{}", uuid::Uuid::new_v4()));

    info!("Starting call session for: {}", call_id);

    let session = {
        let mut sessions = state.sessions.write().await;
        if sessions.contains_key(&call_id) {
            return error_response(
                StatusCode::CONFLICT,
                format!("Call {} is already active", call_id),
            );
        }

        let session = match state.launcher.create_session(&call_id).await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to create session: {:#}", e);
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to create session: {}", e),
                );
            }
        };

        sessions.insert(call_id.clone(), session.clone());
        session
    };

    let sessions = state.sessions.clone();
    let task_call_id = call_id.clone();
    tokio::spawn(async move {
        match session.run().await {
            Ok(report) => info!(
                "Call {} ended: {} (analytics sent: {})",
                report.call_id, report.close_reason, report.analytics_sent
            ),
            Err(e) => warn!("Call {} did not start: {:#}", task_call_id, e),
        }
        sessions.write().await.remove(&task_call_id);
    });

    (
        StatusCode::ACCEPTED,
        Json(StartCallResponse {
            call_id: call_id.clone(),
            status: "connecting".to_string(),
            message: format!("Call session started for {}", call_id),
        }),
    )
        .into_response()
}

/// GET /calls
/// List active calls
pub async fn list_calls(State(state): State<AppState>) -> impl IntoResponse {
    let sessions: Vec<_> = state.sessions.read().await.values().cloned().collect();

    let mut calls: Vec<CallStats> = Vec::with_capacity(sessions.len());
    for session in sessions {
        calls.push(session.get_stats().await);
    }
    calls.sort_by(|a, b| a.call_id.cmp(&b.call_id));

    (StatusCode::OK, Json(calls))
}

/// GET /calls/:call_id/status
/// Get status of a call session
pub async fn get_call_status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    let session = state.sessions.read().await.get(&call_id).cloned();

    match session {
        Some(session) => (StatusCode::OK, Json(session.get_stats().await)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Call {} not found", call_id)),
    }
}

/// POST /calls/:call_id/end
/// Drain and close a call
pub async fn end_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    info!("Ending call: {}", call_id);

    let session = state.sessions.read().await.get(&call_id).cloned();

    match session {
        Some(session) => match session.end_call("ended via control API").await {
            Ok(()) => (StatusCode::OK, Json(session.get_stats().await)).into_response(),
            Err(e) => {
                error!("Failed to end call: {:#}", e);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to end call: {}", e),
                )
            }
        },
        None => error_response(StatusCode::NOT_FOUND, format!("Call {} not found", call_id)),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
