use super::state::AppState;
use crate::error::SessionError;
use crate::session::{ConnectionStatus, SessionSnapshot};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::info;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartConversationResponse {
    pub conversation_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct EndConversationResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MuteResponse {
    pub is_muted: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    pub status_line: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Ask the service to open a session for the configured agent.
///
/// Rejected with 403 while permission is missing and 409 while already
/// connected; the start affordance is unavailable in both states.
pub async fn start_conversation(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.controller.snapshot().await;

    if !snapshot.permission_granted {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "Microphone permission has not been granted".to_string(),
            }),
        )
            .into_response();
    }
    if snapshot.connection_status == ConnectionStatus::Connected {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "A conversation is already active".to_string(),
            }),
        )
            .into_response();
    }

    match state.controller.start_conversation().await {
        Ok(conversation_id) => {
            info!("Conversation start accepted: {}", conversation_id);
            (
                StatusCode::OK,
                Json(StartConversationResponse {
                    conversation_id,
                    status: "pending".to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => {
            let code = match err {
                SessionError::ConfigurationMissing(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                code,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /session/end
/// Ask the service to close the active session.
pub async fn end_conversation(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.controller.snapshot().await;

    if snapshot.connection_status != ConnectionStatus::Connected {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "No active conversation".to_string(),
            }),
        )
            .into_response();
    }

    match state.controller.end_conversation().await {
        Ok(()) => (
            StatusCode::OK,
            Json(EndConversationResponse {
                status: "ending".to_string(),
            }),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /session/mute
/// Toggle agent output between muted and full volume.
///
/// Only available while connected.
pub async fn toggle_mute(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.controller.snapshot().await;

    if snapshot.connection_status != ConnectionStatus::Connected {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "No active conversation".to_string(),
            }),
        )
            .into_response();
    }

    match state.controller.toggle_mute().await {
        Ok(is_muted) => (StatusCode::OK, Json(MuteResponse { is_muted })).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/status
/// Current state record plus the derived status line.
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.controller.snapshot().await;
    let status_line = snapshot.status_line();

    (
        StatusCode::OK,
        Json(StatusResponse {
            snapshot,
            status_line,
        }),
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
