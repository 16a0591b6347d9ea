//! Domain types consumed from the device feed.
//!
//! These mirror what the network collaborator reports about players on the
//! DJ network. They are plain data: decoding happens upstream.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Player / device number on the network (1-4 for players, higher for mixers
/// and rekordbox instances).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeviceId(pub u8);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for DeviceId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

/// Hardware address of a device, rendered as `aa:bb:cc:dd:ee:ff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

/// Error returned when parsing a malformed MAC address string.
#[derive(Debug, Clone, Error)]
#[error("invalid MAC address: {0}")]
pub struct ParseMacAddrError(String);

impl FromStr for MacAddr {
    type Err = ParseMacAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split([':', '-']);

        for octet in &mut octets {
            let part = parts.next().ok_or_else(|| ParseMacAddrError(s.into()))?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| ParseMacAddrError(s.into()))?;
        }

        if parts.next().is_some() {
            return Err(ParseMacAddrError(s.into()));
        }

        Ok(Self(octets))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Player State
// ─────────────────────────────────────────────────────────────────────────────

/// Play state reported by a CDJ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayState {
    #[default]
    Empty,
    Loading,
    Playing,
    Looping,
    Paused,
    Cued,
    Cuing,
    PlatterHeld,
    Searching,
    SpunDown,
    Ended,
}

impl PlayState {
    /// Wire name of the play state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Loading => "Loading",
            Self::Playing => "Playing",
            Self::Looping => "Looping",
            Self::Paused => "Paused",
            Self::Cued => "Cued",
            Self::Cuing => "Cuing",
            Self::PlatterHeld => "PlatterHeld",
            Self::Searching => "Searching",
            Self::SpunDown => "SpunDown",
            Self::Ended => "Ended",
        }
    }
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media slot a track was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackSlot {
    #[default]
    Empty,
    #[serde(rename = "CD")]
    Cd,
    #[serde(rename = "SD")]
    Sd,
    #[serde(rename = "USB")]
    Usb,
    #[serde(rename = "RB")]
    Rekordbox,
}

impl TrackSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Cd => "CD",
            Self::Sd => "SD",
            Self::Usb => "USB",
            Self::Rekordbox => "RB",
        }
    }
}

impl fmt::Display for TrackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of track loaded in a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackType {
    #[default]
    None,
    #[serde(rename = "RB")]
    Rekordbox,
    Unanalyzed,
    AudioCD,
}

impl TrackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Rekordbox => "RB",
            Self::Unanalyzed => "Unanalyzed",
            Self::AudioCD => "AudioCD",
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a track in the remote track database.
///
/// Serializes as `{id, device, slot, type}`, which is also the body accepted
/// by the track lookup endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrackKey {
    pub id: u32,
    pub device: DeviceId,
    pub slot: TrackSlot,
    #[serde(rename = "type")]
    pub track_type: TrackType,
}

/// Point-in-time status reading for one player.
///
/// Arrives at a high, roughly periodic rate from the feed. Most readings are
/// identical to the previous one for the same player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub player_id: DeviceId,
    pub track_id: u32,
    /// Player the loaded track was read from (may differ when linked).
    pub track_device: DeviceId,
    #[serde(default)]
    pub track_slot: TrackSlot,
    #[serde(default)]
    pub track_type: TrackType,
    #[serde(default)]
    pub play_state: PlayState,
    #[serde(default)]
    pub bpm: f32,
    #[serde(default)]
    pub slider_pitch: f32,
    #[serde(default)]
    pub effective_pitch: f32,
    #[serde(default)]
    pub on_air: bool,
    #[serde(default)]
    pub sync: bool,
    #[serde(default)]
    pub master: bool,
    /// Absolute beat counter since the track was loaded.
    #[serde(default)]
    pub beat: u32,
    #[serde(default)]
    pub beat_in_measure: u8,
    #[serde(default)]
    pub beats_until_cue: u16,
}

impl StatusSnapshot {
    /// Creates an empty snapshot for the given player.
    pub fn new(player_id: DeviceId) -> Self {
        Self {
            player_id,
            track_id: 0,
            track_device: player_id,
            track_slot: TrackSlot::Empty,
            track_type: TrackType::None,
            play_state: PlayState::Empty,
            bpm: 0.0,
            slider_pitch: 0.0,
            effective_pitch: 0.0,
            on_air: false,
            sync: false,
            master: false,
            beat: 0,
            beat_in_measure: 0,
            beats_until_cue: 0,
        }
    }

    /// Key used to look the loaded track up in the track database.
    pub fn track_key(&self) -> TrackKey {
        TrackKey {
            id: self.track_id,
            device: self.track_device,
            slot: self.track_slot,
            track_type: self.track_type,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Devices
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of device announcing itself on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "cdj")]
    Cdj,
    #[serde(rename = "djm")]
    Mixer,
    #[serde(rename = "rekordbox")]
    Rekordbox,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cdj => "cdj",
            Self::Mixer => "djm",
            Self::Rekordbox => "rekordbox",
        }
    }
}

/// A device present on the DJ network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub mac_addr: MacAddr,
    pub ip: IpAddr,
    pub last_active: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracks
// ─────────────────────────────────────────────────────────────────────────────

/// Track metadata resolved from the remote track database.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub id: u32,
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub label: String,
    pub genre: String,
    pub comment: String,
    pub key: String,
    pub length: Duration,
    pub date_added: DateTime<Utc>,
    /// Raw JPEG cover art. Empty when the track has none.
    pub artwork: Bytes,
}

// ─────────────────────────────────────────────────────────────────────────────
// Mix Status
// ─────────────────────────────────────────────────────────────────────────────

/// Semantic events reported by the upstream mix-status processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixEventKind {
    SetStarted,
    SetEnded,
    NowPlaying,
    ComingSoon,
    Stopped,
}

impl MixEventKind {
    /// Event type string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetStarted => "set_started",
            Self::SetEnded => "set_ended",
            Self::NowPlaying => "now_playing",
            Self::ComingSoon => "coming_soon",
            Self::Stopped => "stopped",
        }
    }

    /// Parses a wire event name. Returns `None` for names this crate does
    /// not handle.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "set_started" => Some(Self::SetStarted),
            "set_ended" => Some(Self::SetEnded),
            "now_playing" => Some(Self::NowPlaying),
            "coming_soon" => Some(Self::ComingSoon),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }
}

impl fmt::Display for MixEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
