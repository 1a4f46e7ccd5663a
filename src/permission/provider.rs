use anyhow::Result;

/// Microphone permission provider trait
///
/// One capability: request audio capture. The environment grants or denies
/// it once per process run; there is no re-request affordance.
#[async_trait::async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Request access to the audio capture modality.
    async fn request_audio_capture(&self) -> Result<()>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Where the permission decision comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSource {
    /// Probe the default audio input device
    Device,
    /// Fixed decision (tests, builds without a capture backend)
    Static(bool),
}

/// Permission provider factory
pub struct PermissionProviderFactory;

impl PermissionProviderFactory {
    pub fn create(source: PermissionSource) -> Result<Box<dyn PermissionProvider>> {
        match source {
            PermissionSource::Device => {
                #[cfg(feature = "backend-cpal")]
                {
                    Ok(Box::new(super::cpal::CpalPermission::new()))
                }

                #[cfg(not(feature = "backend-cpal"))]
                {
                    anyhow::bail!(
                        "Microphone probing requires the backend-cpal feature"
                    )
                }
            }

            PermissionSource::Static(granted) => Ok(Box::new(StaticPermission::new(granted))),
        }
    }
}

/// Fixed grant/deny decision.
pub struct StaticPermission {
    granted: bool,
}

impl StaticPermission {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }

    pub fn granted() -> Self {
        Self::new(true)
    }

    pub fn denied() -> Self {
        Self::new(false)
    }
}

#[async_trait::async_trait]
impl PermissionProvider for StaticPermission {
    async fn request_audio_capture(&self) -> Result<()> {
        if self.granted {
            Ok(())
        } else {
            anyhow::bail!("Audio capture denied")
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}
