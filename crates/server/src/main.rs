//! Impostor game server
//!
//! Usage: `impostor-server [CONFIG]`. Without an argument the config is
//! taken from `$IMPOSTOR_CONFIG`, then the platform config directory, then
//! built-in defaults.

use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use impostor_core::{ServerConfig, WordBank};
use impostor_net::Server;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let (config, source) = match ServerConfig::discover(explicit) {
        Ok(found) => found,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            std::process::exit(1);
        }
    };
    match &source {
        Some(path) => tracing::info!(path = %path.display(), "Loaded config"),
        None => tracing::info!("No config file found; using defaults"),
    }

    let server = match Server::start(&config, Box::new(WordBank::builtin())).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(addr = %config.socket_addr(), error = %e, "Failed to start server");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for ctrl-c");
    }
    server.shutdown();
}
