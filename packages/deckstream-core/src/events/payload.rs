//! Mapping of feed domain types into event data payloads.
//!
//! Each event type carries a different `data` object. The payload structs
//! here fix the JSON shape clients see, independent of the domain types.

use std::net::IpAddr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::prolink::{Device, DeviceId, StatusChange, Track, TrackKey};

/// MIME type of cover art served by the track database.
const ARTWORK_MIME: &str = "image/jpeg";

/// The `data` member of an [`Event`](super::Event).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventData {
    /// Serializes as `null`.
    None,
    Text(String),
    Number(f32),
    Flag(bool),
    TrackKey(TrackKey),
    Beat(BeatPayload),
    Device(DevicePayload),
    Track(Box<TrackPayload>),
}

impl From<StatusChange> for EventData {
    fn from(change: StatusChange) -> Self {
        match change {
            StatusChange::TrackKey(key) => Self::TrackKey(key),
            StatusChange::PlayState(state) => Self::Text(state.as_str().to_string()),
            StatusChange::Bpm(v) | StatusChange::Pitch(v) | StatusChange::EffectivePitch(v) => {
                Self::Number(v)
            }
            StatusChange::OnAir(v) | StatusChange::SyncEnabled(v) | StatusChange::IsMaster(v) => {
                Self::Flag(v)
            }
            StatusChange::Beat {
                absolute_beat,
                beat_in_measure,
                beats_until_cue,
            } => Self::Beat(BeatPayload {
                absolute_beat,
                beat_in_measure,
                beats_until_cue,
            }),
        }
    }
}

/// Beat position carried by `status:beat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BeatPayload {
    pub absolute_beat: u32,
    pub beat_in_measure: u8,
    pub beats_until_cue: u16,
}

/// Device description carried by `device_added` / `device_removed` and
/// returned by the device listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevicePayload {
    pub player_id: DeviceId,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: &'static str,
    pub mac: String,
    pub ip: IpAddr,
    pub last_active: DateTime<Utc>,
}

impl From<&Device> for DevicePayload {
    fn from(device: &Device) -> Self {
        Self {
            player_id: device.id,
            name: device.name.clone(),
            device_type: device.device_type.as_str(),
            mac: device.mac_addr.to_string(),
            ip: device.ip,
            last_active: device.last_active,
        }
    }
}

/// Track metadata carried by `now_playing` / `coming_soon`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPayload {
    pub id: u32,
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub label: String,
    pub genre: String,
    pub comment: String,
    pub key: String,
    /// Track length in whole seconds.
    pub length: u64,
    pub date_added: DateTime<Utc>,
    /// `data:` URI of the cover art, or empty when the track has none.
    pub artwork: String,
}

impl From<&Track> for TrackPayload {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id,
            path: track.path.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            label: track.label.clone(),
            genre: track.genre.clone(),
            comment: track.comment.clone(),
            key: track.key.clone(),
            length: track.length.as_secs(),
            date_added: track.date_added,
            artwork: artwork_data_uri(&track.artwork),
        }
    }
}

/// Embeds cover art bytes as a base64 `data:` URI.
fn artwork_data_uri(artwork: &[u8]) -> String {
    if artwork.is_empty() {
        return String::new();
    }
    format!("data:{};base64,{}", ARTWORK_MIME, BASE64.encode(artwork))
}
