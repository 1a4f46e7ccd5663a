use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use tracing::info;

use super::provider::PermissionProvider;

/// Grants capture access when a usable default input device exists.
#[derive(Default)]
pub struct CpalPermission;

impl CpalPermission {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl PermissionProvider for CpalPermission {
    async fn request_audio_capture(&self) -> Result<()> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No audio input device available")?;
        let config = device
            .default_input_config()
            .context("Input device has no usable capture config")?;

        info!(
            "Capture access granted via {} ({} Hz, {} ch)",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate().0,
            config.channels()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "cpal"
    }
}
