//! Deckstream Core - event distribution engine for a DJ-equipment status feed.
//!
//! This crate turns the continuous status stream of a DJ-equipment network
//! into discrete, typed events and fans them out to websocket clients, each
//! filtered by a subscription set the client can change at any time. A
//! short, time-windowed history of significant events is kept for clients
//! that connect late.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`prolink`]: Domain types reported by the feed, and status diffing
//! - [`events`]: Event envelope, replay history, and the fan-out bus
//! - [`services`]: Producer adapters translating feed callbacks into events
//! - [`api`]: Websocket endpoint and admin HTTP surface
//! - [`feed`]: Offline collaborators for running without a live network
//! - [`state`]: Core configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The engine is decoupled from the feed and the transport by traits:
//!
//! - [`TrackLookup`](prolink::TrackLookup) / [`Network`](prolink::Network):
//!   the device-feed collaborator
//! - [`EventSink`](events::EventSink): where producers publish
//! - [`ConnectionTransport`](events::ConnectionTransport): outbound half of
//!   a client connection
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning background tasks

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod error;
pub mod events;
pub mod feed;
pub mod prolink;
pub mod runtime;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use error::{DeckstreamError, DeckstreamResult, ErrorCode};
pub use events::{
    kinds, ConnectionHandle, ConnectionTransport, Event, EventBus, EventData, EventHistory,
    EventSink, InboundFrame, SubscriptionRegistry, TransportError,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{Config, MixStatusConfig, MixStatusUpdate};

// Re-export producer adapters
pub use services::{CdjStatusEmitter, DeviceChangeEmitter, MixStatusEmitter, ProducerAdapters};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, ServerError};
