//! Replays a captured feed into the producer adapters.
//!
//! A capture is newline-delimited JSON, one notification per line, tagged by
//! `kind`:
//!
//! ```text
//! {"kind":"device_added","device":{"id":1,"name":"CDJ-3000","type":"cdj",..}}
//! {"kind":"track","key":{"id":7,"device":1,"slot":"USB","type":"RB"},"track":{..}}
//! {"kind":"status","status":{"player_id":1,"track_id":7,"track_device":1,"bpm":124.0}}
//! {"kind":"mix","event":"now_playing","status":{..}}
//! {"kind":"wait","ms":500}
//! {"kind":"device_removed","device":{..}}
//! ```
//!
//! Records are dispatched in file order. Blank lines are skipped.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::{DetachedNetwork, TrackCatalog};
use crate::prolink::{Device, StatusSnapshot, Track, TrackKey};
use crate::services::ProducerAdapters;

/// Errors raised while replaying a capture.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read capture: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artwork on line {line}: {source}")]
    Artwork {
        line: usize,
        #[source]
        source: base64::DecodeError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum FeedRecord {
    Status {
        status: StatusSnapshot,
    },
    DeviceAdded {
        device: Device,
    },
    DeviceRemoved {
        device: Device,
    },
    Mix {
        event: String,
        status: StatusSnapshot,
    },
    Track {
        key: TrackKey,
        track: TrackRecord,
    },
    Wait {
        ms: u64,
    },
}

/// Track metadata as written in a capture. Artwork is base64.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackRecord {
    path: String,
    title: String,
    artist: String,
    album: String,
    label: String,
    genre: String,
    comment: String,
    key: String,
    /// Seconds.
    length: u64,
    date_added: Option<DateTime<Utc>>,
    artwork: String,
}

impl TrackRecord {
    fn into_track(self, id: u32) -> Result<Track, base64::DecodeError> {
        let artwork = if self.artwork.is_empty() {
            Bytes::new()
        } else {
            Bytes::from(BASE64.decode(self.artwork.as_bytes())?)
        };
        Ok(Track {
            id,
            path: self.path,
            title: self.title,
            artist: self.artist,
            album: self.album,
            label: self.label,
            genre: self.genre,
            comment: self.comment,
            key: self.key,
            length: Duration::from_secs(self.length),
            date_added: self.date_added.unwrap_or_default(),
            artwork,
        })
    }
}

/// Drives the adapters from a capture.
pub struct FeedReplay {
    adapters: ProducerAdapters,
    network: Arc<DetachedNetwork>,
    catalog: Arc<TrackCatalog>,
}

impl FeedReplay {
    pub fn new(
        adapters: ProducerAdapters,
        network: Arc<DetachedNetwork>,
        catalog: Arc<TrackCatalog>,
    ) -> Self {
        Self {
            adapters,
            network,
            catalog,
        }
    }

    /// Replays a capture file. Returns the number of records dispatched.
    pub async fn run_file(&self, path: &Path) -> Result<usize, ReplayError> {
        let contents = tokio::fs::read_to_string(path).await?;
        log::info!("[Replay] Replaying {}", path.display());
        self.run(&contents).await
    }

    /// Replays capture text. Returns the number of records dispatched.
    ///
    /// Stops at the first malformed line; records before it have already
    /// been dispatched.
    pub async fn run(&self, capture: &str) -> Result<usize, ReplayError> {
        let mut dispatched = 0;

        for (index, line) in capture.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record: FeedRecord = serde_json::from_str(line).map_err(|source| {
                ReplayError::Malformed {
                    line: line_no,
                    source,
                }
            })?;

            match record {
                FeedRecord::Wait { ms } => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    continue;
                }
                FeedRecord::Track { key, track } => {
                    let track = track
                        .into_track(key.id)
                        .map_err(|source| ReplayError::Artwork {
                            line: line_no,
                            source,
                        })?;
                    self.catalog.insert(key, track);
                }
                other => self.dispatch(other),
            }
            dispatched += 1;
        }

        log::info!("[Replay] Dispatched {} record(s)", dispatched);
        Ok(dispatched)
    }

    fn dispatch(&self, record: FeedRecord) {
        match record {
            FeedRecord::Status { status } => self.adapters.status.on_status(&status),
            FeedRecord::DeviceAdded { device } => {
                self.network.device_added(&device);
                self.adapters.devices.on_device_added(&device);
            }
            FeedRecord::DeviceRemoved { device } => {
                self.network.device_removed(&device);
                self.adapters.devices.on_device_removed(&device);
            }
            FeedRecord::Mix { event, status } => {
                self.adapters.mix_status.on_mix_event_named(&event, &status)
            }
            FeedRecord::Track { .. } | FeedRecord::Wait { .. } => {}
        }
    }
}
