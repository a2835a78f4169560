//! # liveness-gateway
//!
//! Binary entry point: loads settings, starts the `WebSocket` gateway and
//! shuts it down on Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use liveness_server::{LivenessServer, ServerConfig};
use liveness_settings::LivenessSettings;

/// `WebSocket` echo gateway with keepalive probing.
#[derive(Parser, Debug)]
#[command(name = "liveness-gateway", about = "WebSocket keepalive gateway")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Milliseconds between probe sweeps (overrides settings).
    #[arg(long)]
    probe_interval_ms: Option<u64>,

    /// Inactivity deadline in milliseconds (overrides settings).
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Settings file (defaults to `~/.liveness/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `liveness_core=trace` (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(liveness_settings::settings_path)
    }

    /// Flags win over file and environment.
    fn apply(&self, settings: &mut LivenessSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ms) = self.probe_interval_ms {
            settings.keepalive.probe_interval_ms = ms;
        }
        if let Some(ms) = self.deadline_ms {
            settings.keepalive.deadline_ms = ms;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

fn resolve_settings(cli: &Cli) -> Result<LivenessSettings> {
    let path = cli.settings_path();
    let mut settings = liveness_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    if settings.logging.json {
        liveness_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        liveness_core::logging::init_subscriber(&settings.logging.level);
    }

    let policy = settings
        .keepalive
        .policy()
        .context("Invalid keepalive settings")?;
    if !policy.tolerates_lost_probe() {
        tracing::warn!(
            probe_interval_ms = settings.keepalive.probe_interval_ms,
            deadline_ms = settings.keepalive.deadline_ms,
            "deadline is shorter than two probe intervals; a single lost pong evicts a client"
        );
    }

    let metrics_handle = match liveness_server::metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics disabled");
            None
        }
    };

    let config = ServerConfig::from(&settings.server);
    let server = LivenessServer::new(config, policy, metrics_handle);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;

    tracing::info!(
        probe_interval_ms = settings.keepalive.probe_interval_ms,
        deadline_ms = settings.keepalive.deadline_ms,
        "liveness gateway listening on ws://{addr}/ws"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    if !server.shutdown().await {
        tracing::warn!("shutdown timed out");
    }
    let _ = handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
