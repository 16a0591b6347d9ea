//! Player status → field-level events.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::events::{Event, EventSink};
use crate::prolink::{diff_status, DeviceId, StatusSnapshot};
use crate::services::isolate::isolate;

/// Publishes one event per changed status field of each player.
///
/// Keeps the last snapshot seen per player. The first snapshot of a player
/// only establishes the baseline. Entries are never removed automatically,
/// so a player that leaves and returns diffs against its last known state.
pub struct CdjStatusEmitter {
    sink: Arc<dyn EventSink>,
    previous: DashMap<DeviceId, StatusSnapshot>,
}

impl CdjStatusEmitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            previous: DashMap::new(),
        }
    }

    /// Feed callback for a status snapshot. Safe to call from any thread.
    pub fn on_status(&self, status: &StatusSnapshot) {
        isolate("StatusEmitter", "on_status", || self.process(status));
    }

    /// Last snapshot seen for a player.
    pub fn previous(&self, player_id: DeviceId) -> Option<StatusSnapshot> {
        self.previous.get(&player_id).map(|entry| entry.value().clone())
    }

    /// Drops the stored snapshot for a player so its next snapshot is
    /// treated as a first observation. Returns `true` if one was stored.
    pub fn forget(&self, player_id: DeviceId) -> bool {
        self.previous.remove(&player_id).is_some()
    }

    /// Number of players with a stored snapshot.
    pub fn tracked_players(&self) -> usize {
        self.previous.len()
    }

    fn process(&self, status: &StatusSnapshot) {
        let player_id = status.player_id;

        // The entry guard is held until every event for this snapshot has
        // been published, so two snapshots of one player never interleave.
        match self.previous.entry(player_id) {
            Entry::Vacant(entry) => {
                log::debug!("[StatusEmitter] Baseline status for player {}", player_id);
                entry.insert(status.clone());
            }
            Entry::Occupied(mut entry) => {
                let changes = diff_status(Some(entry.get()), status);
                entry.insert(status.clone());

                for change in changes {
                    let event_type = change.event_type();
                    self.sink
                        .publish(Event::new(event_type, Some(player_id), change.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{kinds, EventData};
    use crate::prolink::PlayState;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        events: Mutex<Vec<Event>>,
    }

    impl EventSink for CollectingSink {
        fn publish(&self, event: Event) {
            self.events.lock().push(event);
        }
    }

    struct PanickingSink;

    impl EventSink for PanickingSink {
        fn publish(&self, _event: Event) {
            panic!("sink failure");
        }
    }

    fn snapshot(bpm: f32, play_state: PlayState) -> StatusSnapshot {
        StatusSnapshot {
            bpm,
            play_state,
            ..StatusSnapshot::new(DeviceId(5))
        }
    }

    #[test]
    fn bpm_then_play_state_scenario() {
        let sink = Arc::new(CollectingSink::default());
        let emitter = CdjStatusEmitter::new(sink.clone());

        emitter.on_status(&snapshot(128.0, PlayState::Playing));
        emitter.on_status(&snapshot(128.0, PlayState::Playing));
        emitter.on_status(&snapshot(130.0, PlayState::Playing));
        emitter.on_status(&snapshot(130.0, PlayState::Paused));

        let events = sink.events.lock();
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].event_type(), kinds::STATUS_BPM);
        assert_eq!(events[0].player_id(), Some(DeviceId(5)));
        assert_eq!(events[0].data(), &EventData::Number(130.0));

        assert_eq!(events[1].event_type(), kinds::STATUS_PLAY_STATE);
        assert_eq!(events[1].player_id(), Some(DeviceId(5)));
        assert_eq!(events[1].data(), &EventData::Text("Paused".to_string()));
    }

    #[test]
    fn first_snapshot_per_player_is_baseline() {
        let sink = Arc::new(CollectingSink::default());
        let emitter = CdjStatusEmitter::new(sink.clone());

        emitter.on_status(&snapshot(128.0, PlayState::Playing));
        emitter.on_status(&StatusSnapshot {
            bpm: 174.0,
            ..StatusSnapshot::new(DeviceId(2))
        });

        assert!(sink.events.lock().is_empty());
        assert_eq!(emitter.tracked_players(), 2);
    }

    #[test]
    fn previous_entry_tracks_latest_snapshot() {
        let emitter = CdjStatusEmitter::new(Arc::new(CollectingSink::default()));

        emitter.on_status(&snapshot(120.0, PlayState::Cued));
        emitter.on_status(&snapshot(121.0, PlayState::Cued));

        assert_eq!(emitter.previous(DeviceId(5)).map(|s| s.bpm), Some(121.0));
    }

    #[test]
    fn forget_restores_baseline_behaviour() {
        let sink = Arc::new(CollectingSink::default());
        let emitter = CdjStatusEmitter::new(sink.clone());

        emitter.on_status(&snapshot(120.0, PlayState::Playing));
        assert!(emitter.forget(DeviceId(5)));
        assert!(!emitter.forget(DeviceId(5)));

        emitter.on_status(&snapshot(140.0, PlayState::Paused));
        assert!(sink.events.lock().is_empty());
    }

    #[test]
    fn panicking_sink_does_not_escape_callback() {
        let emitter = CdjStatusEmitter::new(Arc::new(PanickingSink));

        emitter.on_status(&snapshot(120.0, PlayState::Playing));
        emitter.on_status(&snapshot(122.0, PlayState::Playing));

        // The snapshot was recorded before publishing.
        assert_eq!(emitter.previous(DeviceId(5)).map(|s| s.bpm), Some(122.0));
    }
}
