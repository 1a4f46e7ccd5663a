use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection state of the single conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No active session
    Idle,
    /// Session established and confirmed by the service
    Connected,
}

/// Point-in-time copy of the controller's state record.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Whether microphone access succeeded
    pub permission_granted: bool,

    /// Current session state
    pub connection_status: ConnectionStatus,

    /// Whether agent output volume is zeroed
    pub is_muted: bool,

    /// Whether the remote agent is currently producing audio
    pub is_speaking: bool,

    /// Most recent failure description, if any
    pub last_error: Option<String>,

    /// Identifier returned by the service for the active conversation
    pub conversation_id: Option<String>,

    /// When the service confirmed the connection
    pub connected_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// The single status line shown by the control surface.
    ///
    /// Connected state wins over a stale error text; an error wins over the
    /// permission prompt.
    pub fn status_line(&self) -> String {
        match self.connection_status {
            ConnectionStatus::Connected => {
                if self.is_speaking {
                    "Agent is speaking...".to_string()
                } else {
                    "Listening...".to_string()
                }
            }
            ConnectionStatus::Idle => {
                if let Some(err) = &self.last_error {
                    err.clone()
                } else if !self.permission_granted {
                    "Please allow microphone access to use voice chat".to_string()
                } else {
                    "Ready to start a conversation".to_string()
                }
            }
        }
    }
}
