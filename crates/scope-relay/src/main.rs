//! # scope-relay
//!
//! Microscope relay binary: loads settings, builds the media store and runs
//! the relay server until Ctrl-C.

#![deny(unsafe_code)]

mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use scope_server::{RelayServer, ServerConfig};
use scope_settings::RelaySettings;

/// Microscope sensor relay.
#[derive(Parser, Debug)]
#[command(name = "scope-relay", about = "Microscope sensor and command relay")]
struct Cli {
    /// JSON settings file, deep-merged over the defaults.
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Require the shared API key on ingestion and image routes.
    #[arg(long)]
    authenticated: bool,
}

impl Cli {
    /// Apply command-line flags over loaded settings.
    fn apply(&self, settings: &mut RelaySettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.authenticated {
            settings.auth.enabled = true;
        }
    }
}

fn load(cli: &Cli) -> Result<RelaySettings> {
    let mut settings = scope_settings::load_settings_from_path(cli.config.as_deref())
        .context("Failed to load settings")?;
    cli.apply(&mut settings);
    scope_settings::validate(&settings).context("Invalid settings")?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;
    logging::init_subscriber(&settings.logging);

    let metrics = scope_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;
    let store = scope_media::build_store(&settings.media).context("Failed to build media store")?;

    let server = Arc::new(
        RelayServer::new(ServerConfig::from(&settings), store).with_metrics(metrics),
    );
    let handle = server.listen().await.context("Failed to bind server")?;
    tracing::info!("Microscope relay listening on http://{}", handle.addr);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    if !server.shutdown().drain(handle.into_tasks(), None).await {
        tracing::warn!("shutdown did not complete cleanly");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
