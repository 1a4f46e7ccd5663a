//! Session lifecycle management
//!
//! This module provides the `SessionController` abstraction that manages:
//! - Microphone permission state
//! - Conversation start/end against the session service
//! - Mute state via agent output volume
//! - Connection/speaking/error state driven by service notifications

mod config;
mod controller;
mod status;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use status::{ConnectionStatus, SessionSnapshot};
