//! Server binary for the Wall commenting service.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`WALL_CONFIG` or `wall-config.yaml`, then env)
//! 2. Initialize structured logging (tracing)
//! 3. Open the configured storage backend
//! 4. Serve the HTTP API until `Ctrl-C`

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wall_api::{AppState, start_server};
use wall_core::{LogFormat, LoggingConfig, WallConfig, open_repository};

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage, or the server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration. Logging is not up yet, so errors go to stderr
    //    through the returned error.
    let config = WallConfig::load().context("failed to load configuration")?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        backend = %config.storage.backend,
        addr = %config.server.bind_addr(),
        "wall-server starting"
    );

    // 3. Open storage.
    let repo = open_repository(&config.storage)
        .await
        .with_context(|| format!("failed to open {} storage", config.storage.backend))?;

    // 4. Serve.
    let state = Arc::new(AppState::new(repo));
    start_server(&config.server, state)
        .await
        .context("HTTP server failed")?;

    info!("wall-server stopped");
    Ok(())
}

/// `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
