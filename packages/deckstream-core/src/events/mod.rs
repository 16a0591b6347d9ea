//! Event system for real-time client communication.
//!
//! This module provides:
//! - [`Event`], the envelope delivered to subscribers
//! - [`EventSink`] trait for producers to publish events
//! - [`EventHistory`] for time-bounded replay of significant events
//! - [`EventBus`] for filtered fan-out to connected clients
//! - [`payload`] mapping of domain types into event data

pub mod bus;
pub mod history;
pub mod payload;
mod sink;

pub use bus::{
    ConnectionHandle, ConnectionTransport, EventBus, InboundFrame, SubscriptionRegistry,
    TransportError,
};
pub use history::EventHistory;
pub use payload::EventData;
pub use sink::{EventSink, LoggingEventSink, NoopEventSink};

use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::prolink::DeviceId;

/// Event type strings emitted by the producers.
///
/// The wire format does not close the set of types, but nothing in this
/// crate publishes a type outside of this list.
pub mod kinds {
    pub const DEVICE_ADDED: &str = "device_added";
    pub const DEVICE_REMOVED: &str = "device_removed";

    pub const SET_STARTED: &str = "set_started";
    pub const SET_ENDED: &str = "set_ended";
    pub const NOW_PLAYING: &str = "now_playing";
    pub const COMING_SOON: &str = "coming_soon";
    pub const STOPPED: &str = "stopped";

    pub const STATUS_TRACK_KEY: &str = "status:track_key";
    pub const STATUS_PLAY_STATE: &str = "status:play_state";
    pub const STATUS_BPM: &str = "status:bpm";
    pub const STATUS_PITCH: &str = "status:pitch";
    pub const STATUS_EFFECTIVE_PITCH: &str = "status:effective_pitch";
    pub const STATUS_ON_AIR: &str = "status:on_air";
    pub const STATUS_SYNC_ENABLED: &str = "status:sync_enabled";
    pub const STATUS_IS_MASTER: &str = "status:is_master";
    pub const STATUS_BEAT: &str = "status:beat";

    /// Event types retained in the replay history.
    pub const HISTORY_WHITELIST: &[&str] = &[
        DEVICE_ADDED,
        DEVICE_REMOVED,
        SET_STARTED,
        SET_ENDED,
        NOW_PLAYING,
        COMING_SOON,
        STOPPED,
        STATUS_TRACK_KEY,
    ];
}

/// An event delivered to subscribed clients.
///
/// Serializes as `{"event", "player_id", "ts", "data"}`. `player_id` is
/// `null` for events describing global state (e.g. `set_started`), and `ts`
/// is an RFC 3339 timestamp with nanosecond precision. Events are immutable
/// once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "event")]
    event_type: Cow<'static, str>,
    player_id: Option<DeviceId>,
    #[serde(rename = "ts", serialize_with = "serialize_rfc3339_nanos")]
    timestamp: DateTime<Utc>,
    data: EventData,
}

fn serialize_rfc3339_nanos<S: Serializer>(
    ts: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

impl Event {
    /// Creates an event stamped with the current time.
    pub fn new(
        event_type: impl Into<Cow<'static, str>>,
        player_id: Option<DeviceId>,
        data: EventData,
    ) -> Self {
        Self::at(event_type, player_id, data, Utc::now())
    }

    /// Creates an event with an explicit timestamp.
    pub fn at(
        event_type: impl Into<Cow<'static, str>>,
        player_id: Option<DeviceId>,
        data: EventData,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            player_id,
            timestamp,
            data,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn player_id(&self) -> Option<DeviceId> {
        self.player_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    /// Serializes the event to a JSON text frame.
    pub fn to_frame(&self) -> Option<Arc<str>> {
        serde_json::to_string(self).ok().map(Arc::from)
    }
}
