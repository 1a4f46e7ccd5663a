use anyhow::Result;
use tokio::sync::mpsc;

/// Notification pushed by the session service.
///
/// The service emits these asynchronously after `start_session`; consumers do
/// not acknowledge them.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    /// The service confirmed the session is established
    Connected,
    /// The session ended (remote close or a completed local end request)
    Disconnected,
    /// Conversational payload (transcripts, agent responses); logged only
    Message(serde_json::Value),
    /// Service-level error while the session is up
    Error(String),
    /// The remote agent started or stopped producing audio
    SpeakingChange(bool),
}

/// What `start_session` needs to open a session.
#[derive(Debug, Clone)]
pub struct StartSessionRequest {
    /// Identifier of the remote conversational agent
    pub agent_id: String,
    /// Credential authorizing use of the service
    pub api_key: String,
}

/// A successfully opened session.
///
/// The returned id only confirms the request was accepted; the session is not
/// considered live until `ServiceEvent::Connected` arrives on `events`.
#[derive(Debug)]
pub struct SessionStarted {
    pub conversation_id: String,
    pub events: mpsc::UnboundedReceiver<ServiceEvent>,
}

/// Conversational session service contract.
///
/// Implementations:
/// - ElevenLabs: Conversational AI WebSocket client
/// - Scripted: in-memory mock for tests, driven through a handle
#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Open a session for the given agent.
    ///
    /// Fails if the remote rejects the connection or a session is already
    /// active.
    async fn start_session(&mut self, request: StartSessionRequest) -> Result<SessionStarted>;

    /// Close the active session.
    ///
    /// Fails if no session is active or the close request errors. The
    /// resulting `Disconnected` notification arrives on the event stream.
    async fn end_session(&mut self) -> Result<()>;

    /// Set agent output volume, in [0.0, 1.0].
    ///
    /// Fails if the volume is out of range or no session is active.
    async fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Service name for logging
    fn name(&self) -> &str;
}

/// Reject volumes outside the closed [0, 1] range.
pub(crate) fn check_volume(volume: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&volume) {
        anyhow::bail!("Volume {} is out of range [0.0, 1.0]", volume);
    }
    Ok(())
}
