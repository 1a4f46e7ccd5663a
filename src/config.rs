use anyhow::Result;
use serde::Deserialize;

use crate::service::DEFAULT_ENDPOINT;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Credential and agent identity, supplied out of band. Both values may be
/// left empty here; `start_conversation` fails without contacting the
/// network until they are set.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub api_key: String,
    pub agent_id: String,
    pub endpoint: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voicelink".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            agent_id: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    /// Load from an optional file plus environment overrides
    /// (e.g. VOICELINK_AGENT__API_KEY).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOICELINK").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// The explicit per-session configuration handed to the controller.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.agent.api_key.clone(), self.agent.agent_id.clone())
    }
}
