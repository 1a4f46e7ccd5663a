pub mod config;
pub mod error;
pub mod http;
pub mod permission;
pub mod service;
pub mod session;

pub use config::Config;
pub use error::SessionError;
pub use http::{create_router, AppState};
pub use permission::{
    PermissionProvider, PermissionProviderFactory, PermissionSource, StaticPermission,
};
pub use service::{
    ElevenLabsService, ScriptedHandle, ScriptedService, ServiceEvent, SessionService,
    SessionStarted, StartSessionRequest,
};
pub use session::{ConnectionStatus, SessionConfig, SessionController, SessionSnapshot};
