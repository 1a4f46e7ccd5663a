use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::status::{ConnectionStatus, SessionSnapshot};
use crate::error::SessionError;
use crate::permission::PermissionProvider;
use crate::service::{ServiceEvent, SessionService, SessionStarted, StartSessionRequest};

/// The controller's single state record.
struct SessionState {
    permission_granted: bool,
    connection_status: ConnectionStatus,
    is_muted: bool,
    is_speaking: bool,
    last_error: Option<String>,
    conversation_id: Option<String>,
    connected_at: Option<chrono::DateTime<Utc>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            permission_granted: false,
            connection_status: ConnectionStatus::Idle,
            is_muted: false,
            is_speaking: false,
            last_error: None,
            conversation_id: None,
            connected_at: None,
        }
    }
}

/// Session lifecycle controller
///
/// Mediates the four user intents (permission request, start, end, mute
/// toggle) against the permission provider and the session service. User
/// calls only *request* lifecycle transitions; the committed
/// Connected/Idle transitions are always driven by the service's
/// asynchronous notifications, pumped into state by a spawned task. Every
/// failure is caught at the operation boundary and recorded as `last_error`;
/// nothing propagates further.
pub struct SessionController {
    config: SessionConfig,
    permission: Box<dyn PermissionProvider>,
    service: Mutex<Box<dyn SessionService>>,
    state: Arc<Mutex<SessionState>>,
    pump_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        permission: Box<dyn PermissionProvider>,
        service: Box<dyn SessionService>,
    ) -> Self {
        Self {
            config,
            permission,
            service: Mutex::new(service),
            state: Arc::new(Mutex::new(SessionState::new())),
            pump_handle: Mutex::new(None),
        }
    }

    /// Request microphone permission. Called once at startup; a denial is
    /// final for the lifetime of the process.
    pub async fn request_permission(&self) {
        info!(
            "Requesting microphone permission via {} provider",
            self.permission.name()
        );

        match self.permission.request_audio_capture().await {
            Ok(()) => {
                let mut state = self.state.lock().await;
                state.permission_granted = true;
                info!("Microphone permission granted");
            }
            Err(e) => {
                error!("Error accessing microphone: {}", e);
                let mut state = self.state.lock().await;
                state.permission_granted = false;
                state.last_error = Some(SessionError::PermissionDenied.to_string());
            }
        }
    }

    /// Ask the service to open a session for the configured agent.
    ///
    /// Success means the request was accepted: the returned conversation id
    /// is live, but `connection_status` stays Idle until the service's
    /// connect notification arrives.
    pub async fn start_conversation(&self) -> Result<String, SessionError> {
        // Permission and configuration gates run before the service is
        // contacted.
        {
            let mut state = self.state.lock().await;

            if state.connection_status == ConnectionStatus::Connected {
                warn!("Conversation already active");
                return Ok(state.conversation_id.clone().unwrap_or_default());
            }
            if !state.permission_granted {
                let err = SessionError::PermissionDenied;
                state.last_error = Some(err.to_string());
                return Err(err);
            }
            if let Err(err) = self.config.validate() {
                error!("Error starting conversation: {}", err);
                state.last_error = Some(err.to_string());
                return Err(err);
            }
        }

        let request = StartSessionRequest {
            agent_id: self.config.agent_id.clone(),
            api_key: self.config.api_key.clone(),
        };

        let started = {
            let mut service = self.service.lock().await;
            service.start_session(request).await
        };

        match started {
            Ok(SessionStarted {
                conversation_id,
                events,
            }) => {
                {
                    let mut state = self.state.lock().await;
                    state.last_error = None;
                    state.conversation_id = Some(conversation_id.clone());
                }
                self.spawn_pump(events).await;
                info!("Started conversation: {}", conversation_id);
                Ok(conversation_id)
            }
            Err(e) => {
                error!("Error starting conversation: {}", e);
                let err = SessionError::start_failed(&e);
                let mut state = self.state.lock().await;
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Ask the service to close the session. The Idle transition arrives via
    /// the disconnect notification, not from this call's return.
    pub async fn end_conversation(&self) -> Result<(), SessionError> {
        info!("Ending conversation");

        let result = {
            let mut service = self.service.lock().await;
            service.end_session().await
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Error ending conversation: {}", e);
                let err = SessionError::EndFailed;
                self.state.lock().await.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Flip the mute state by setting agent output volume to 0 or 1.
    ///
    /// The flag only flips after the service accepts the volume change, so
    /// flag and volume never diverge.
    pub async fn toggle_mute(&self) -> Result<bool, SessionError> {
        let muted = self.state.lock().await.is_muted;
        let target = if muted { 1.0 } else { 0.0 };

        let result = {
            let mut service = self.service.lock().await;
            service.set_volume(target).await
        };

        match result {
            Ok(()) => {
                let mut state = self.state.lock().await;
                state.is_muted = !muted;
                info!(
                    "Agent audio {}",
                    if state.is_muted { "muted" } else { "unmuted" }
                );
                Ok(state.is_muted)
            }
            Err(e) => {
                error!("Error changing volume: {}", e);
                let err = SessionError::VolumeChangeFailed;
                self.state.lock().await.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Point-in-time copy of the state record.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            permission_granted: state.permission_granted,
            connection_status: state.connection_status,
            is_muted: state.is_muted,
            is_speaking: state.is_speaking,
            last_error: state.last_error.clone(),
            conversation_id: state.conversation_id.clone(),
            connected_at: state.connected_at,
        }
    }

    /// Spawn the notification pump for a freshly accepted session.
    async fn spawn_pump(&self, mut events: mpsc::UnboundedReceiver<ServiceEvent>) {
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            debug!("Notification pump started");

            while let Some(event) = events.recv().await {
                apply_event(&state, event).await;
            }

            // Stream ended without a disconnect notification: treat it as
            // one, so a dying service cannot strand the controller in
            // Connected.
            let mut state = state.lock().await;
            if state.connection_status == ConnectionStatus::Connected {
                warn!("Event stream ended while connected");
                state.connection_status = ConnectionStatus::Idle;
                state.is_speaking = false;
                state.conversation_id = None;
                state.connected_at = None;
            }

            debug!("Notification pump stopped");
        });

        // A previous pump has already drained by the time a new session is
        // accepted; dropping its handle just detaches it.
        let mut pump = self.pump_handle.lock().await;
        *pump = Some(task);
    }
}

/// Apply one service notification to the state record. Notifications are
/// applied strictly in arrival order by the single pump task.
async fn apply_event(state: &Mutex<SessionState>, event: ServiceEvent) {
    match event {
        ServiceEvent::Connected => {
            info!("Connected to the session service");
            let mut state = state.lock().await;
            state.connection_status = ConnectionStatus::Connected;
            state.last_error = None;
            state.connected_at = Some(Utc::now());
        }
        ServiceEvent::Disconnected => {
            info!("Disconnected from the session service");
            let mut state = state.lock().await;
            state.connection_status = ConnectionStatus::Idle;
            state.is_speaking = false;
            state.conversation_id = None;
            state.connected_at = None;
        }
        ServiceEvent::Message(payload) => {
            debug!("Received message: {}", payload);
        }
        ServiceEvent::Error(message) => {
            error!("Service error: {}", message);
            let mut state = state.lock().await;
            state.last_error = Some(SessionError::Remote(message).to_string());
        }
        ServiceEvent::SpeakingChange(speaking) => {
            debug!("Agent speaking: {}", speaking);
            let mut state = state.lock().await;
            state.is_speaking = speaking;
        }
    }
}
