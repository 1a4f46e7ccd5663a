use thiserror::Error;

/// Failures surfaced by the session controller.
///
/// None of these are fatal: every variant is caught at the operation boundary
/// and recorded as the controller's `last_error` string. The `Display` text is
/// exactly what the status surface shows, so variants that reach users carry
/// the full message.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The permission provider rejected the audio capture request.
    #[error("Microphone access denied")]
    PermissionDenied,

    /// Credential or agent identifier was empty at start time.
    #[error("{0} is not configured")]
    ConfigurationMissing(&'static str),

    /// The service rejected or could not establish a session.
    #[error("{0}")]
    StartFailed(String),

    /// The service could not close the active session cleanly.
    #[error("Failed to end conversation")]
    EndFailed,

    /// The service rejected a volume change.
    #[error("Failed to change volume")]
    VolumeChangeFailed,

    /// An asynchronous error notification arrived from the service.
    #[error("{0}")]
    Remote(String),
}

impl SessionError {
    /// Wrap a service start failure, falling back to a generic message when
    /// the underlying error has none.
    pub fn start_failed(err: &anyhow::Error) -> Self {
        let msg = err.to_string();
        if msg.trim().is_empty() {
            SessionError::StartFailed("Failed to start conversation".to_string())
        } else {
            SessionError::StartFailed(msg)
        }
    }
}
