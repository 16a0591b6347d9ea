//! Mix-status semantic events → bus events.
//!
//! The upstream mix-status processor decides when a set starts or ends and
//! which track is on air. This adapter only maps its reports:
//!
//! | Report        | `player_id`       | `data`                     |
//! |---------------|-------------------|----------------------------|
//! | `set_started` | none              | none                       |
//! | `set_ended`   | none              | none                       |
//! | `stopped`     | reporting player  | none                       |
//! | `now_playing` | reporting player  | resolved track             |
//! | `coming_soon` | reporting player  | resolved track             |
//!
//! A track report whose track cannot be resolved is dropped.

use std::sync::Arc;

use crate::events::payload::TrackPayload;
use crate::events::{Event, EventData, EventSink};
use crate::prolink::{MixEventKind, StatusSnapshot, TrackLookup};
use crate::services::isolate::isolate;

pub struct MixStatusEmitter {
    sink: Arc<dyn EventSink>,
    tracks: Arc<dyn TrackLookup>,
}

impl MixStatusEmitter {
    pub fn new(sink: Arc<dyn EventSink>, tracks: Arc<dyn TrackLookup>) -> Self {
        Self { sink, tracks }
    }

    /// Feed callback for a classified mix-status report.
    pub fn on_mix_event(&self, kind: MixEventKind, status: &StatusSnapshot) {
        isolate("MixStatus", "on_mix_event", || self.process(kind, status));
    }

    /// Feed callback taking the report by its wire name.
    ///
    /// Unknown names are logged and ignored.
    pub fn on_mix_event_named(&self, name: &str, status: &StatusSnapshot) {
        match MixEventKind::from_name(name) {
            Some(kind) => self.on_mix_event(kind, status),
            None => log::warn!("[MixStatus] Unhandled mix status event: {}", name),
        }
    }

    fn process(&self, kind: MixEventKind, status: &StatusSnapshot) {
        let event = match kind {
            MixEventKind::SetStarted | MixEventKind::SetEnded => {
                Event::new(kind.as_str(), None, EventData::None)
            }
            MixEventKind::Stopped => {
                Event::new(kind.as_str(), Some(status.player_id), EventData::None)
            }
            MixEventKind::NowPlaying | MixEventKind::ComingSoon => {
                let key = status.track_key();
                let track = match self.tracks.get_track(&key) {
                    Ok(track) => track,
                    Err(e) => {
                        log::error!(
                            "[MixStatus] Failed to retrieve track for {} on player {}: {}",
                            kind,
                            status.player_id,
                            e
                        );
                        return;
                    }
                };
                log::info!(
                    "[MixStatus] {} on player {}: {} - {}",
                    kind,
                    status.player_id,
                    track.artist,
                    track.title
                );
                let data = EventData::Track(Box::new(TrackPayload::from(&track)));
                Event::new(kind.as_str(), Some(status.player_id), data)
            }
        };

        self.sink.publish(event);
    }
}
