use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::backend::{
    check_volume, ServiceEvent, SessionService, SessionStarted, StartSessionRequest,
};

/// Conversational AI WebSocket endpoint
pub const DEFAULT_ENDPOINT: &str = "wss://api.elevenlabs.io/v1/convai/conversation";

type WsSink = futures::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Outcome of parsing one server message.
#[derive(Debug)]
pub enum ServerMessage {
    /// Forward a notification to the event stream
    Event(ServiceEvent),
    /// Send a control message back through the WebSocket
    Reply(Value),
    /// Nothing to do
    Ignore,
}

/// ElevenLabs Conversational AI session client.
///
/// `start_session` performs the WebSocket handshake and waits for the
/// conversation initiation metadata; a spawned reader then maps server
/// messages onto the [`ServiceEvent`] stream. The protocol carries no
/// explicit speaking flag, so the reader derives it: agent audio chunks mark
/// the agent speaking, `interruption` and `user_transcript` mark it silent.
pub struct ElevenLabsService {
    endpoint: String,
    sink: Option<Arc<Mutex<WsSink>>>,
    reader: Option<JoinHandle<()>>,
    gain_bits: AtomicU32,
    active: bool,
}

impl ElevenLabsService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            sink: None,
            reader: None,
            gain_bits: AtomicU32::new(1.0f32.to_bits()),
            active: false,
        }
    }

    /// Current playback gain for agent audio (0.0 = muted, 1.0 = full).
    pub fn volume(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::Relaxed))
    }
}

impl Default for ElevenLabsService {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[async_trait::async_trait]
impl SessionService for ElevenLabsService {
    async fn start_session(&mut self, request: StartSessionRequest) -> Result<SessionStarted> {
        if self.active {
            anyhow::bail!("Session already active");
        }

        let url = format!("{}?agent_id={}", self.endpoint, request.agent_id);
        let mut ws_request = url
            .into_client_request()
            .context("Invalid session endpoint")?;
        let api_key: HeaderValue = request
            .api_key
            .parse()
            .context("API key is not a valid header value")?;
        ws_request.headers_mut().insert("xi-api-key", api_key);

        info!("Opening session for agent {}", request.agent_id);

        let (stream, _) = connect_async(ws_request)
            .await
            .context("Failed to reach the session service")?;
        let (sink, mut source) = stream.split();
        let sink = Arc::new(Mutex::new(sink));

        // No deadline here: the controller waits indefinitely for the service
        // to answer the start request.
        let conversation_id = wait_for_conversation_id(&mut source).await?;
        info!("Session accepted, conversation {}", conversation_id);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(source, Arc::clone(&sink), events_tx));

        self.sink = Some(sink);
        self.reader = Some(reader);
        self.active = true;

        Ok(SessionStarted {
            conversation_id,
            events: events_rx,
        })
    }

    async fn end_session(&mut self) -> Result<()> {
        if !self.active {
            anyhow::bail!("No active session");
        }
        let Some(sink) = self.sink.clone() else {
            anyhow::bail!("No active session");
        };

        {
            let mut sink = sink.lock().await;
            sink.send(Message::Close(None))
                .await
                .context("Failed to send close frame")?;
        }

        // The reader sees the close handshake, emits Disconnected, and exits
        // on its own.
        self.active = false;
        self.sink = None;
        self.reader = None;
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        check_volume(volume)?;
        if !self.active {
            anyhow::bail!("No active session");
        }

        // Volume is applied locally to agent audio playback; the protocol has
        // no server-side volume control.
        self.gain_bits.store(volume.to_bits(), Ordering::Relaxed);
        debug!("Playback gain set to {}", volume);
        Ok(())
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}

/// Consume pre-session traffic until the initiation metadata arrives.
async fn wait_for_conversation_id(source: &mut WsSource) -> Result<String> {
    while let Some(msg) = source.next().await {
        let msg = msg.context("Connection failed before the session was established")?;
        let Message::Text(text) = msg else { continue };

        let value: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(_) => continue,
        };
        if value.get("type").and_then(Value::as_str) == Some("conversation_initiation_metadata") {
            if let Some(id) = value
                .pointer("/conversation_initiation_metadata_event/conversation_id")
                .and_then(Value::as_str)
            {
                return Ok(id.to_string());
            }
            anyhow::bail!("Initiation metadata carried no conversation id");
        }
    }
    anyhow::bail!("Connection closed before the session was established")
}

/// Map server messages onto the event stream until the socket closes.
async fn read_loop(
    mut source: WsSource,
    sink: Arc<Mutex<WsSink>>,
    events: mpsc::UnboundedSender<ServiceEvent>,
) {
    debug!("Session reader started");

    // The handshake and initiation metadata are done; the session is live.
    if events.send(ServiceEvent::Connected).is_err() {
        return;
    }

    let mut speaking = false;

    'outer: while let Some(msg) = source.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                let _ = events.send(ServiceEvent::Error(e.to_string()));
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // Binary/ping/pong frames are handled by the transport
            _ => continue,
        };

        for outcome in parse_server_message(&text) {
            match outcome {
                ServerMessage::Event(ServiceEvent::SpeakingChange(state)) => {
                    // Forward transitions only; every audio chunk re-asserts
                    // the speaking state.
                    if state != speaking {
                        speaking = state;
                        if events.send(ServiceEvent::SpeakingChange(state)).is_err() {
                            break 'outer;
                        }
                    }
                }
                ServerMessage::Event(event) => {
                    if events.send(event).is_err() {
                        break 'outer;
                    }
                }
                ServerMessage::Reply(value) => {
                    let mut sink = sink.lock().await;
                    if let Err(e) = sink.send(Message::Text(value.to_string().into())).await {
                        warn!("Failed to answer service ping: {}", e);
                    }
                }
                ServerMessage::Ignore => {}
            }
        }
    }

    let _ = events.send(ServiceEvent::Disconnected);
    debug!("Session reader stopped");
}

/// Parse one text frame from the service.
///
/// Pure so the mapping is testable without a socket. Unknown message types
/// are ignored rather than surfaced as errors.
pub fn parse_server_message(text: &str) -> Vec<ServerMessage> {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!("Unparseable service message: {}", e);
            return vec![ServerMessage::Ignore];
        }
    };

    match value.get("type").and_then(Value::as_str) {
        Some("audio") => {
            if let Some(b64) = value
                .pointer("/audio_event/audio_base_64")
                .and_then(Value::as_str)
            {
                match base64::engine::general_purpose::STANDARD.decode(b64) {
                    Ok(bytes) => debug!("Agent audio chunk: {} bytes", bytes.len()),
                    Err(e) => warn!("Undecodable agent audio payload: {}", e),
                }
            }
            vec![ServerMessage::Event(ServiceEvent::SpeakingChange(true))]
        }
        Some("agent_response") | Some("agent_response_correction") => {
            vec![ServerMessage::Event(ServiceEvent::Message(value))]
        }
        Some("user_transcript") => vec![
            ServerMessage::Event(ServiceEvent::Message(value)),
            ServerMessage::Event(ServiceEvent::SpeakingChange(false)),
        ],
        Some("interruption") => vec![ServerMessage::Event(ServiceEvent::SpeakingChange(false))],
        Some("ping") => {
            let event_id = value
                .pointer("/ping_event/event_id")
                .cloned()
                .unwrap_or(Value::Null);
            vec![ServerMessage::Reply(json!({
                "type": "pong",
                "event_id": event_id,
            }))]
        }
        Some("error") => {
            let message = value
                .pointer("/error_event/message")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("Service error")
                .to_string();
            vec![ServerMessage::Event(ServiceEvent::Error(message))]
        }
        // Consumed during start_session
        Some("conversation_initiation_metadata") => vec![ServerMessage::Ignore],
        _ => vec![ServerMessage::Ignore],
    }
}
