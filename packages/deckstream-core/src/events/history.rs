//! Time-bounded replay history of significant events.
//!
//! Only event types in [`kinds::HISTORY_WHITELIST`] are retained. Entries are
//! kept in publish order and evicted by [`EventHistory::trim`] once their
//! timestamp falls outside the TTL window. Nothing bounds the buffer by
//! count, so a periodic trim driver must be running (see
//! `bootstrap_services`).

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use super::{kinds, Event};

/// Default retention window.
pub const DEFAULT_HISTORY_TTL: Duration = Duration::from_secs(4 * 60 * 60);

/// Append-only, time-bounded event buffer.
///
/// Has its own lock, independent of the connection registry, so history
/// reads and trims never wait on client fan-out.
pub struct EventHistory {
    events: Mutex<VecDeque<Event>>,
    ttl: Duration,
}

impl EventHistory {
    /// Creates an empty history with the given retention window.
    pub fn new(ttl: Duration) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            ttl,
        }
    }

    /// Returns whether events of this type are retained.
    pub fn is_recorded(event_type: &str) -> bool {
        kinds::HISTORY_WHITELIST.contains(&event_type)
    }

    /// Appends the event if its type is whitelisted.
    ///
    /// Returns `true` if the event was stored.
    pub fn store(&self, event: &Event) -> bool {
        if !Self::is_recorded(event.event_type()) {
            return false;
        }
        self.events.lock().push_back(event.clone());
        true
    }

    /// Drops the leading run of events older than `now - ttl`.
    ///
    /// Scanning stops at the first event inside the window; the buffer is
    /// in publish order, so later entries are at least as new. Returns the
    /// number of events removed.
    pub fn trim(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = self.cutoff(now) else {
            return 0;
        };

        let mut events = self.events.lock();
        let cut = events
            .iter()
            .position(|event| event.timestamp() > cutoff)
            .unwrap_or(events.len());
        events.drain(..cut);

        if cut > 0 {
            log::debug!(
                "[History] Trimmed {} event(s) older than {} (remaining: {})",
                cut,
                cutoff,
                events.len()
            );
        }
        cut
    }

    /// Returns a point-in-time copy of the buffer, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Oldest timestamp still inside the window, or `None` when the TTL is
    /// too large to subtract (nothing ever expires).
    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = TimeDelta::from_std(self.ttl).ok()?;
        now.checked_sub_signed(ttl)
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventData;
    use crate::prolink::DeviceId;

    fn event_at(event_type: &'static str, ts: DateTime<Utc>) -> Event {
        Event::at(event_type, Some(DeviceId(1)), EventData::None, ts)
    }

    #[test]
    fn non_whitelisted_events_are_never_stored() {
        let history = EventHistory::default();
        let now = Utc::now();

        assert!(!history.store(&event_at(kinds::STATUS_BPM, now)));
        assert!(!history.store(&event_at(kinds::STATUS_BEAT, now)));
        assert!(!history.store(&event_at("something_else", now)));
        assert!(history.is_empty());
    }

    #[test]
    fn whitelisted_events_are_stored_in_order() {
        let history = EventHistory::default();
        let now = Utc::now();

        for &event_type in kinds::HISTORY_WHITELIST {
            assert!(history.store(&event_at(event_type, now)));
        }

        let types: Vec<String> = history
            .snapshot()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect();
        assert_eq!(types, kinds::HISTORY_WHITELIST);
    }

    #[test]
    fn trim_keeps_only_events_inside_window() {
        let history = EventHistory::new(Duration::from_secs(60));
        let now = Utc::now();

        // Spaced further apart than the TTL.
        for minutes_ago in [300, 200, 100, 0] {
            history.store(&event_at(
                kinds::NOW_PLAYING,
                now - TimeDelta::minutes(minutes_ago),
            ));
        }

        assert_eq!(history.trim(now), 3);
        let remaining = history.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].timestamp(), now);
    }

    #[test]
    fn trim_removes_everything_when_all_expired() {
        let history = EventHistory::new(Duration::from_secs(10));
        let now = Utc::now();
        history.store(&event_at(kinds::SET_STARTED, now - TimeDelta::seconds(30)));
        history.store(&event_at(kinds::SET_ENDED, now - TimeDelta::seconds(20)));

        assert_eq!(history.trim(now), 2);
        assert!(history.is_empty());
    }

    #[test]
    fn trim_stops_at_first_event_inside_window() {
        let history = EventHistory::new(Duration::from_secs(10));
        let now = Utc::now();
        history.store(&event_at(kinds::SET_STARTED, now - TimeDelta::seconds(5)));
        // Out of order entries behind a fresh one are left for a later pass.
        history.store(&event_at(kinds::SET_ENDED, now - TimeDelta::seconds(30)));

        assert_eq!(history.trim(now), 0);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn trim_on_empty_history_is_noop() {
        let history = EventHistory::default();
        assert_eq!(history.trim(Utc::now()), 0);
    }

    #[test]
    fn snapshot_is_detached_from_buffer() {
        let history = EventHistory::default();
        history.store(&event_at(kinds::STOPPED, Utc::now()));

        let snapshot = history.snapshot();
        history.store(&event_at(kinds::STOPPED, Utc::now()));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(history.len(), 2);
    }
}
