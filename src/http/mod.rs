//! HTTP API server for session control
//!
//! This module provides a REST API mirroring the voice-chat surface:
//! - POST /session/start - Ask the service to open a session
//! - POST /session/end - Ask the service to close the session
//! - POST /session/mute - Toggle agent output volume
//! - GET /session/status - State record + derived status line
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
