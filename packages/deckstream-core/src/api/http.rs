//! HTTP route handlers.
//!
//! All handlers are thin: reads and configuration changes pass through to
//! the network and track collaborators, event state comes from the bus.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::error::{DeckstreamError, DeckstreamResult};
use crate::events::payload::{DevicePayload, TrackPayload};
use crate::events::Event;
use crate::prolink::{DeviceId, TrackKey};
use crate::state::{MixStatusConfig, MixStatusUpdate};
use crate::utils::unused_player_ids;

/// Service identifier reported by the liveness check.
const SERVICE_ID: &str = "deckstream";

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/devices", get(list_devices))
        .route(
            "/config",
            get(get_config).put(update_config).post(auto_configure),
        )
        .route("/track", post(lookup_track))
        .route("/events/history", get(event_history))
        .route("/events", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// Current feed configuration. `interface` is empty when none is bound.
#[derive(Debug, Serialize)]
struct ConfigResponse {
    interface: String,
    player_id: DeviceId,
    mix_status: MixStatusConfig,
}

/// `GET /config` body: the configuration plus the choices a client can make.
#[derive(Debug, Serialize)]
struct AnnotatedConfigResponse {
    #[serde(flatten)]
    config: ConfigResponse,
    available_interfaces: Vec<String>,
    unused_player_ids: Vec<DeviceId>,
}

/// `PUT /config` body. Absent (or empty / zero) fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
struct ConfigUpdate {
    #[serde(default)]
    interface: Option<String>,
    #[serde(default)]
    player_id: Option<u8>,
    #[serde(default)]
    mix_status: Option<MixStatusUpdate>,
}

fn current_config(state: &AppState) -> ConfigResponse {
    ConfigResponse {
        interface: state.network.interface().unwrap_or_default(),
        player_id: state.network.virtual_player_id(),
        mix_status: state.core.mix_status(),
    }
}

/// Unwraps a JSON body, turning decode failures into a 400.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> DeckstreamResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| DeckstreamError::InvalidRequest(rejection.body_text()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness check.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "connections": state.bus.connection_count(),
    }))
}

async fn list_devices(State(state): State<AppState>) -> Json<Vec<DevicePayload>> {
    let devices = state
        .network
        .active_devices()
        .iter()
        .map(DevicePayload::from)
        .collect();
    Json(devices)
}

async fn get_config(
    State(state): State<AppState>,
) -> DeckstreamResult<Json<AnnotatedConfigResponse>> {
    let available_interfaces = state.network.available_interfaces()?;
    let unused = unused_player_ids(&state.network.active_devices());

    Ok(Json(AnnotatedConfigResponse {
        config: current_config(&state),
        available_interfaces,
        unused_player_ids: unused,
    }))
}

/// Applies a partial configuration update.
///
/// The interface is applied first so an unknown name rejects the request
/// before anything else changes.
async fn update_config(
    State(state): State<AppState>,
    body: Result<Json<ConfigUpdate>, JsonRejection>,
) -> DeckstreamResult<Json<ConfigResponse>> {
    let update = json_body(body)?;

    if let Some(interface) = update.interface.as_deref().filter(|i| !i.is_empty()) {
        state.network.set_interface(interface)?;
    }

    if let Some(player_id) = update.player_id.filter(|id| *id != 0) {
        state.network.set_virtual_player_id(DeviceId(player_id));
    }

    if let Some(mix_status) = update.mix_status.filter(|m| !m.is_empty()) {
        let tuning = state.core.update_mix_status(&mix_status);
        log::info!("[Config] Mix status tuning updated: {:?}", tuning);
    }

    Ok(Json(current_config(&state)))
}

async fn auto_configure(State(state): State<AppState>) -> DeckstreamResult<Json<ConfigResponse>> {
    state.network.auto_configure()?;
    Ok(Json(current_config(&state)))
}

async fn lookup_track(
    State(state): State<AppState>,
    body: Result<Json<TrackKey>, JsonRejection>,
) -> DeckstreamResult<Json<TrackPayload>> {
    let key = json_body(body)?;
    let track = state.tracks.get_track(&key)?;
    Ok(Json(TrackPayload::from(&track)))
}

async fn event_history(State(state): State<AppState>) -> Json<Vec<Event>> {
    Json(state.bus.history())
}
