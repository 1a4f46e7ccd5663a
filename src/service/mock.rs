use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use super::backend::{
    check_volume, ServiceEvent, SessionService, SessionStarted, StartSessionRequest,
};

#[derive(Default)]
struct Shared {
    active: bool,
    start_calls: usize,
    end_calls: usize,
    volume_calls: Vec<f32>,
    fail_start: Option<String>,
    fail_end: Option<String>,
    fail_volume: Option<String>,
    events: Option<mpsc::UnboundedSender<ServiceEvent>>,
}

/// In-memory session service driven entirely from tests.
///
/// The paired [`ScriptedHandle`] can fail the next operation with a chosen
/// message, emit arbitrary notification sequences into a live session, and
/// inspect which calls the controller actually made.
pub struct ScriptedService {
    shared: Arc<Mutex<Shared>>,
}

impl ScriptedService {
    pub fn new() -> (Self, ScriptedHandle) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ScriptedHandle { shared },
        )
    }
}

#[async_trait::async_trait]
impl SessionService for ScriptedService {
    async fn start_session(&mut self, request: StartSessionRequest) -> Result<SessionStarted> {
        let mut shared = self.shared.lock().unwrap();
        shared.start_calls += 1;

        if let Some(msg) = shared.fail_start.take() {
            anyhow::bail!(msg);
        }
        if shared.active {
            anyhow::bail!("Session already active");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        shared.active = true;
        shared.events = Some(tx);

        let conversation_id = format!("conv-{}", uuid::Uuid::new_v4());
        info!(
            "Scripted session started for agent {} ({})",
            request.agent_id, conversation_id
        );

        Ok(SessionStarted {
            conversation_id,
            events: rx,
        })
    }

    async fn end_session(&mut self) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.end_calls += 1;

        if let Some(msg) = shared.fail_end.take() {
            anyhow::bail!(msg);
        }
        if !shared.active {
            anyhow::bail!("No active session");
        }

        // The session stays open for event emission: the disconnect
        // notification is scripted by the test, matching the two-phase
        // lifecycle of the real service.
        shared.active = false;
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        check_volume(volume)?;

        let mut shared = self.shared.lock().unwrap();
        if let Some(msg) = shared.fail_volume.take() {
            anyhow::bail!(msg);
        }
        if !shared.active {
            anyhow::bail!("No active session");
        }

        shared.volume_calls.push(volume);
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Test-side control for a [`ScriptedService`].
#[derive(Clone)]
pub struct ScriptedHandle {
    shared: Arc<Mutex<Shared>>,
}

impl ScriptedHandle {
    /// Fail the next `start_session` call with the given message.
    pub fn fail_next_start(&self, msg: impl Into<String>) {
        self.shared.lock().unwrap().fail_start = Some(msg.into());
    }

    /// Fail the next `end_session` call with the given message.
    pub fn fail_next_end(&self, msg: impl Into<String>) {
        self.shared.lock().unwrap().fail_end = Some(msg.into());
    }

    /// Fail the next `set_volume` call with the given message.
    pub fn fail_next_volume(&self, msg: impl Into<String>) {
        self.shared.lock().unwrap().fail_volume = Some(msg.into());
    }

    /// Push a notification into the most recently started session.
    pub fn emit(&self, event: ServiceEvent) -> Result<()> {
        let shared = self.shared.lock().unwrap();
        let tx = shared
            .events
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No session has been started"))?;
        tx.send(event)
            .map_err(|_| anyhow::anyhow!("Event receiver dropped"))
    }

    pub fn start_calls(&self) -> usize {
        self.shared.lock().unwrap().start_calls
    }

    pub fn end_calls(&self) -> usize {
        self.shared.lock().unwrap().end_calls
    }

    /// Volumes passed to `set_volume`, in call order.
    pub fn volumes(&self) -> Vec<f32> {
        self.shared.lock().unwrap().volume_calls.clone()
    }
}
