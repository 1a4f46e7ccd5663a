use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Configuration for a conversation session.
///
/// Both values are supplied out of band (config file or environment) and
/// passed in explicitly so the controller never reads ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Credential authorizing use of the session service
    pub api_key: String,

    /// Opaque identifier of the remote conversational agent
    pub agent_id: String,
}

impl SessionConfig {
    pub fn new(api_key: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            agent_id: agent_id.into(),
        }
    }

    /// Both values must be non-empty before the service is contacted.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.api_key.trim().is_empty() {
            return Err(SessionError::ConfigurationMissing("API key"));
        }
        if self.agent_id.trim().is_empty() {
            return Err(SessionError::ConfigurationMissing("Agent ID"));
        }
        Ok(())
    }
}
