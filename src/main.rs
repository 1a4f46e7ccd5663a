use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use voicelink::{
    AppState, Config, ElevenLabsService, PermissionProvider, PermissionProviderFactory,
    PermissionSource, SessionController, StaticPermission,
};

#[derive(Debug, Parser)]
#[command(name = "voicelink", about = "Voice agent session client")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/voicelink")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        "HTTP server will bind to {}:{}",
        cfg.service.http.bind, cfg.service.http.port
    );

    let permission: Box<dyn PermissionProvider> =
        match PermissionProviderFactory::create(PermissionSource::Device) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(
                    "Microphone probing unavailable ({}), assuming capture access",
                    e
                );
                Box::new(StaticPermission::granted())
            }
        };

    let service = Box::new(ElevenLabsService::new(cfg.agent.endpoint.clone()));
    let controller = Arc::new(SessionController::new(
        cfg.session_config(),
        permission,
        service,
    ));

    // Permission is requested exactly once, up front.
    controller.request_permission().await;

    let app = voicelink::create_router(AppState::new(Arc::clone(&controller)));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);
    axum::serve(listener, app).await.context("HTTP server error")?;

    Ok(())
}
