//! Voice agent session service
//!
//! The contract the controller programs against: open/close a session, set
//! output volume, and consume the push stream of
//! connect/disconnect/message/error/speaking notifications.

pub mod backend;
pub mod elevenlabs;
pub mod mock;

pub use backend::{ServiceEvent, SessionService, SessionStarted, StartSessionRequest};
pub use elevenlabs::{parse_server_message, ElevenLabsService, ServerMessage, DEFAULT_ENDPOINT};
pub use mock::{ScriptedHandle, ScriptedService};
