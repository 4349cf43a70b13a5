use super::state::AppState;
use crate::error::SessionError;
use crate::notify::Alert;
use crate::session::{SessionState, SessionStatus};
use crate::transcript::TranscriptEntry;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SessionCommandResponse {
    pub session: SessionState,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SendChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start a new session; ignored if one is already in progress
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    let current = state.session.state();
    info!("Start requested while {}", current);

    state.session.start();

    let message = if current.is_idle() {
        "Session starting".to_string()
    } else {
        format!("Session already {}", current.name())
    };

    (
        StatusCode::ACCEPTED,
        Json(SessionCommandResponse {
            session: current,
            message,
        }),
    )
}

/// POST /session/stop
/// Leave the current session
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    let current = state.session.state();
    info!("Stop requested while {}", current);

    state.session.disconnect();

    (
        StatusCode::ACCEPTED,
        Json(SessionCommandResponse {
            session: current,
            message: "Session stopping".to_string(),
        }),
    )
}

/// POST /session/chat
/// Send a chat message to the agent
pub async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<SendChatRequest>,
) -> impl IntoResponse {
    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Message must not be empty".to_string(),
            }),
        )
            .into_response();
    }

    match state.session.send_chat_message(req.message).await {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(SessionError::NotActive) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "No session is connected".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to send chat message: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to send chat message: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /session/status
pub async fn get_session_status(State(state): State<AppState>) -> impl IntoResponse {
    let cached = state.credentials.latest().is_some();
    (
        StatusCode::OK,
        Json(SessionStatus::capture(&state.session, cached)),
    )
}

/// GET /session/transcript
/// Get the merged transcript for the current session
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let transcript: Vec<TranscriptEntry> = state.session.current_entries().to_vec();
    (StatusCode::OK, Json(transcript))
}

/// GET /session/alerts
pub async fn get_alerts(State(state): State<AppState>) -> impl IntoResponse {
    let alerts: Vec<Alert> = state.alerts.recent();
    (StatusCode::OK, Json(alerts))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
