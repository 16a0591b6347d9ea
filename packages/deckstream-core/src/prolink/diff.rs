//! Field-level diffing of player status snapshots.
//!
//! [`diff_status`] is a pure function: given the previous and current
//! snapshot for one player it returns the tracked fields that changed, in
//! field-declaration order. That order is the order events are published in
//! when several fields change in the same reading.

use crate::events::kinds;

use super::types::{PlayState, StatusSnapshot, TrackKey};

/// A single tracked field that changed between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusChange {
    /// A different track was loaded.
    TrackKey(TrackKey),
    PlayState(PlayState),
    Bpm(f32),
    /// User (slider) pitch.
    Pitch(f32),
    EffectivePitch(f32),
    OnAir(bool),
    SyncEnabled(bool),
    IsMaster(bool),
    /// The absolute beat counter moved. Carries the beat position fields of
    /// the current snapshot.
    Beat {
        absolute_beat: u32,
        beat_in_measure: u8,
        beats_until_cue: u16,
    },
}

impl StatusChange {
    /// Event type this change is published under.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TrackKey(_) => kinds::STATUS_TRACK_KEY,
            Self::PlayState(_) => kinds::STATUS_PLAY_STATE,
            Self::Bpm(_) => kinds::STATUS_BPM,
            Self::Pitch(_) => kinds::STATUS_PITCH,
            Self::EffectivePitch(_) => kinds::STATUS_EFFECTIVE_PITCH,
            Self::OnAir(_) => kinds::STATUS_ON_AIR,
            Self::SyncEnabled(_) => kinds::STATUS_SYNC_ENABLED,
            Self::IsMaster(_) => kinds::STATUS_IS_MASTER,
            Self::Beat { .. } => kinds::STATUS_BEAT,
        }
    }
}

/// Exact comparison; two NaN readings count as unchanged.
fn float_changed(prev: f32, curr: f32) -> bool {
    prev != curr && !(prev.is_nan() && curr.is_nan())
}

/// Returns the ordered list of field changes from `prev` to `curr`.
///
/// `prev` is `None` for the first reading of a player, which only
/// establishes a baseline and never yields changes.
pub fn diff_status(prev: Option<&StatusSnapshot>, curr: &StatusSnapshot) -> Vec<StatusChange> {
    let Some(prev) = prev else {
        return Vec::new();
    };

    let mut changes = Vec::new();

    if prev.track_key() != curr.track_key() {
        changes.push(StatusChange::TrackKey(curr.track_key()));
    }

    if prev.play_state != curr.play_state {
        changes.push(StatusChange::PlayState(curr.play_state));
    }

    if float_changed(prev.bpm, curr.bpm) {
        changes.push(StatusChange::Bpm(curr.bpm));
    }

    if float_changed(prev.slider_pitch, curr.slider_pitch) {
        changes.push(StatusChange::Pitch(curr.slider_pitch));
    }

    if float_changed(prev.effective_pitch, curr.effective_pitch) {
        changes.push(StatusChange::EffectivePitch(curr.effective_pitch));
    }

    if prev.on_air != curr.on_air {
        changes.push(StatusChange::OnAir(curr.on_air));
    }

    if prev.sync != curr.sync {
        changes.push(StatusChange::SyncEnabled(curr.sync));
    }

    if prev.master != curr.master {
        changes.push(StatusChange::IsMaster(curr.master));
    }

    if prev.beat != curr.beat {
        changes.push(StatusChange::Beat {
            absolute_beat: curr.beat,
            beat_in_measure: curr.beat_in_measure,
            beats_until_cue: curr.beats_until_cue,
        });
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prolink::types::{DeviceId, TrackSlot, TrackType};

    fn playing() -> StatusSnapshot {
        let mut status = StatusSnapshot::new(DeviceId(5));
        status.track_id = 100;
        status.track_slot = TrackSlot::Usb;
        status.track_type = TrackType::Rekordbox;
        status.play_state = PlayState::Playing;
        status.bpm = 128.0;
        status.beat = 32;
        status.beat_in_measure = 1;
        status
    }

    #[test]
    fn first_observation_yields_nothing() {
        let mut curr = playing();
        curr.on_air = true;
        curr.master = true;
        assert!(diff_status(None, &curr).is_empty());
    }

    #[test]
    fn identical_snapshots_yield_nothing() {
        let prev = playing();
        assert!(diff_status(Some(&prev), &prev.clone()).is_empty());
    }

    #[test]
    fn each_single_field_change_yields_one_event() {
        let prev = playing();
        let mutations: Vec<(fn(&mut StatusSnapshot), &str)> = vec![
            (|s| s.track_id = 101, kinds::STATUS_TRACK_KEY),
            (|s| s.track_slot = TrackSlot::Sd, kinds::STATUS_TRACK_KEY),
            (|s| s.play_state = PlayState::Paused, kinds::STATUS_PLAY_STATE),
            (|s| s.bpm = 128.01, kinds::STATUS_BPM),
            (|s| s.slider_pitch = 0.5, kinds::STATUS_PITCH),
            (|s| s.effective_pitch = 0.5, kinds::STATUS_EFFECTIVE_PITCH),
            (|s| s.on_air = true, kinds::STATUS_ON_AIR),
            (|s| s.sync = true, kinds::STATUS_SYNC_ENABLED),
            (|s| s.master = true, kinds::STATUS_IS_MASTER),
            (|s| s.beat = 33, kinds::STATUS_BEAT),
        ];

        for (mutate, expected) in mutations {
            let mut curr = prev.clone();
            mutate(&mut curr);
            let changes = diff_status(Some(&prev), &curr);
            assert_eq!(changes.len(), 1, "expected one change for {}", expected);
            assert_eq!(changes[0].event_type(), expected);
        }
    }

    #[test]
    fn untracked_fields_are_ignored() {
        let prev = playing();
        let mut curr = prev.clone();
        curr.beat_in_measure = 3;
        curr.beats_until_cue = 16;
        assert!(diff_status(Some(&prev), &curr).is_empty());
    }

    #[test]
    fn multiple_changes_follow_field_order() {
        let prev = playing();
        let mut curr = prev.clone();
        curr.beat = 40;
        curr.master = true;
        curr.bpm = 130.0;
        curr.track_id = 7;

        let types: Vec<_> = diff_status(Some(&prev), &curr)
            .iter()
            .map(StatusChange::event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                kinds::STATUS_TRACK_KEY,
                kinds::STATUS_BPM,
                kinds::STATUS_IS_MASTER,
                kinds::STATUS_BEAT,
            ]
        );
    }

    #[test]
    fn float_comparison_has_no_tolerance() {
        let prev = playing();
        let mut curr = prev.clone();
        curr.effective_pitch = f32::EPSILON;
        assert_eq!(
            diff_status(Some(&prev), &curr),
            vec![StatusChange::EffectivePitch(f32::EPSILON)]
        );
    }

    #[test]
    fn nan_readings_do_not_repeat() {
        let mut prev = playing();
        prev.bpm = f32::NAN;
        let curr = prev.clone();
        assert!(diff_status(Some(&prev), &curr).is_empty());
    }

    #[test]
    fn beat_change_carries_position() {
        let prev = playing();
        let mut curr = prev.clone();
        curr.beat = 33;
        curr.beat_in_measure = 2;
        curr.beats_until_cue = 31;
        assert_eq!(
            diff_status(Some(&prev), &curr),
            vec![StatusChange::Beat {
                absolute_beat: 33,
                beat_in_measure: 2,
                beats_until_cue: 31,
            }]
        );
    }
}
