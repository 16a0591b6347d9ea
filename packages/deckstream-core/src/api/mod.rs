//! HTTP/WebSocket API layer.
//!
//! Thin handlers over the bootstrapped services: the `/events` websocket
//! feeds connections into the [`EventBus`], and the admin routes pass
//! through to the network and track collaborators.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::bootstrap::BootstrappedServices;
use crate::events::EventBus;
use crate::prolink::{Network, TrackLookup};
use crate::state::CoreState;

pub mod http;
pub mod ws;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Fallback port range when no preferred port is configured.
const FALLBACK_PORTS: (u16, u16) = (5002, 5012);

/// Shared application state for the API layer.
///
/// Holds references to services; all logic lives in the services.
#[derive(Clone)]
pub struct AppState {
    /// Fan-out engine and history.
    pub bus: Arc<EventBus>,
    /// Device topology and configuration collaborator.
    pub network: Arc<dyn Network>,
    /// Track database collaborator.
    pub tracks: Arc<dyn TrackLookup>,
    /// Runtime-mutable configuration.
    pub core: Arc<CoreState>,
    /// Parent of every connection's cancellation token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(services: &BootstrappedServices) -> Self {
        Self {
            bus: Arc::clone(&services.bus),
            network: Arc::clone(&services.network),
            tracks: Arc::clone(&services.tracks),
            core: Arc::clone(&services.state),
            shutdown: services.cancel_token.clone(),
        }
    }

    /// Per-connection outbound queue capacity.
    pub fn outbound_queue_capacity(&self) -> usize {
        self.core.config.read().outbound_queue_capacity
    }

    /// Whether new connections receive the history snapshot first.
    pub fn backfill_on_connect(&self) -> bool {
        self.core.config.read().backfill_on_connect
    }
}

async fn find_available_port(
    start: u16,
    end: u16,
) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    for port in start..=end {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Binds the configured or a fallback port.
///
/// A configured port that cannot be bound is an error; with no configured
/// port the fallback range is scanned.
pub async fn bind(state: &AppState) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    let preferred_port = state.core.config.read().preferred_port;
    if preferred_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], preferred_port));
        Ok((preferred_port, tokio::net::TcpListener::bind(&addr).await?))
    } else {
        find_available_port(FALLBACK_PORTS.0, FALLBACK_PORTS.1).await
    }
}

/// Serves the API on `listener` until `state.shutdown` is cancelled.
pub async fn serve(state: AppState, listener: tokio::net::TcpListener) -> Result<(), ServerError> {
    let shutdown = state.shutdown.clone();
    let app = http::create_router(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;
    Ok(())
}

/// Binds and serves the API.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let (port, listener) = bind(&state).await?;

    match crate::utils::local_ip() {
        Some(ip) => log::info!(
            "Server listening on http://0.0.0.0:{} (events: ws://{}:{}/events)",
            port,
            ip,
            port
        ),
        None => log::info!("Server listening on http://0.0.0.0:{}", port),
    }

    serve(state, listener).await
}
