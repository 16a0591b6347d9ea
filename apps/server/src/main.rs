//! Deckstream Server - standalone event server for a DJ-equipment status feed.
//!
//! Serves the `/events` websocket and the admin HTTP surface. Without a live
//! network attached, the feed is driven by replaying a capture file.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use deckstream_core::feed::{DetachedNetwork, FeedReplay, TrackCatalog};
use deckstream_core::{bootstrap_services, start_server, AppState};
use tokio::signal;

use crate::config::ServerConfig;

/// Deckstream Server - filtered, replayable event streams from CDJ status.
#[derive(Parser, Debug)]
#[command(name = "deckstream-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "DECKSTREAM_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file and `DECKSTREAM_BIND_PORT`).
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Feed capture to replay (newline-delimited JSON).
    #[arg(short = 'r', long, value_name = "FILE")]
    replay: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Deckstream Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(replay) = args.replay {
        config.replay = Some(replay);
    }

    log::info!(
        "Configuration: bind_port={}, history_ttl={}s, queue_capacity={}",
        config.bind_port,
        config.history_ttl,
        config.outbound_queue_capacity
    );

    let network = Arc::new(DetachedNetwork::new());
    let catalog = Arc::new(TrackCatalog::new());

    let core_config = config.to_core_config();
    let services = bootstrap_services(&core_config, network.clone(), catalog.clone())
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    let app_state = AppState::new(&services);
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    if let Some(path) = config.replay.clone() {
        let replay = FeedReplay::new(services.adapters.clone(), network, catalog);
        tokio::spawn(async move {
            match replay.run_file(&path).await {
                Ok(count) => log::info!("Replay finished: {} record(s)", count),
                Err(e) => log::error!("Replay of {} failed: {}", path.display(), e),
            }
        });
    }

    // Wait for a shutdown signal, or for the server to stop on its own
    let server_exited = tokio::select! {
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, cleaning up...");
            false
        }
        _ = &mut server_handle => true,
    };

    services.shutdown();

    if !server_exited {
        // Graceful shutdown completes once the cancelled connections drain.
        if let Err(e) = server_handle.await {
            log::warn!("Server task ended abnormally: {}", e);
        }
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
