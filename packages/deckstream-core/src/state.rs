//! Core configuration and shared runtime state.
//!
//! [`Config`] is loaded once by the binary and validated before the services
//! are bootstrapped. The mix-status tuning inside it stays mutable at runtime
//! through the admin API, so [`CoreState`] keeps the whole config behind a
//! lock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Shared, runtime-mutable state.
pub struct CoreState {
    /// Application configuration.
    pub config: Arc<RwLock<Config>>,
}

impl CoreState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Current mix-status tuning.
    pub fn mix_status(&self) -> MixStatusConfig {
        self.config.read().mix_status.clone()
    }

    /// Applies a partial tuning update and returns the result.
    pub fn update_mix_status(&self, update: &MixStatusUpdate) -> MixStatusConfig {
        let mut config = self.config.write();
        update.apply(&mut config.mix_status);
        config.mix_status.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mix Status Tuning
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning for the upstream mix-status processor.
///
/// Serialized with `time_between_sets` in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixStatusConfig {
    /// Beats a track may be interrupted (cued, paused) and still count as
    /// continuously playing.
    pub allowed_interrupt_beats: u32,

    /// Beats a track must play before it is reported as now playing.
    pub beats_until_reported: u32,

    /// Silence after which the current set is considered ended (seconds).
    pub time_between_sets: u64,
}

impl MixStatusConfig {
    pub fn time_between_sets(&self) -> Duration {
        Duration::from_secs(self.time_between_sets)
    }
}

impl Default for MixStatusConfig {
    fn default() -> Self {
        Self {
            allowed_interrupt_beats: 10,
            beats_until_reported: 128,
            time_between_sets: 60,
        }
    }
}

/// Partial mix-status update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MixStatusUpdate {
    pub allowed_interrupt_beats: Option<u32>,
    pub beats_until_reported: Option<u32>,
    pub time_between_sets: Option<u64>,
}

impl MixStatusUpdate {
    pub fn apply(&self, config: &mut MixStatusConfig) {
        if let Some(v) = self.allowed_interrupt_beats {
            config.allowed_interrupt_beats = v;
        }
        if let Some(v) = self.beats_until_reported {
            config.beats_until_reported = v;
        }
        if let Some(v) = self.time_between_sets {
            config.time_between_sets = v;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed_interrupt_beats.is_none()
            && self.beats_until_reported.is_none()
            && self.time_between_sets.is_none()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the deckstream engine.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP/WS server (0 = auto-allocate).
    pub preferred_port: u16,

    // History
    /// How long whitelisted events stay in the replay history (seconds).
    pub history_ttl_secs: u64,

    /// Interval between history trim passes (seconds).
    pub history_trim_interval_secs: u64,

    // Connections
    /// Frames queued per connection before new frames are dropped.
    pub outbound_queue_capacity: usize,

    /// Push the history snapshot to each new connection.
    pub backfill_on_connect: bool,

    // Mix status
    pub mix_status: MixStatusConfig,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.history_ttl_secs == 0 {
            return Err("history_ttl_secs must be >= 1".to_string());
        }
        if self.history_trim_interval_secs == 0 {
            return Err("history_trim_interval_secs must be >= 1".to_string());
        }
        if self.outbound_queue_capacity == 0 {
            return Err("outbound_queue_capacity must be >= 1".to_string());
        }
        Ok(())
    }

    pub fn history_ttl(&self) -> Duration {
        Duration::from_secs(self.history_ttl_secs)
    }

    pub fn history_trim_interval(&self) -> Duration {
        Duration::from_secs(self.history_trim_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 5002,
            history_ttl_secs: 4 * 60 * 60,
            history_trim_interval_secs: 60,
            outbound_queue_capacity: 256,
            backfill_on_connect: true,
            mix_status: MixStatusConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_ttl(), Duration::from_secs(14_400));
        assert_eq!(config.history_trim_interval(), Duration::from_secs(60));
    }

    #[test]
    fn config_rejects_zero_values() {
        for config in [
            Config {
                history_ttl_secs: 0,
                ..Config::default()
            },
            Config {
                history_trim_interval_secs: 0,
                ..Config::default()
            },
            Config {
                outbound_queue_capacity: 0,
                ..Config::default()
            },
        ] {
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "preferred_port": 8080,
            "mix_status": { "beats_until_reported": 64 },
        }))
        .unwrap();
        assert_eq!(config.preferred_port, 8080);
        assert_eq!(config.history_ttl_secs, 14_400);
        assert_eq!(config.mix_status.beats_until_reported, 64);
        assert_eq!(config.mix_status.allowed_interrupt_beats, 10);
    }

    #[test]
    fn mix_status_update_touches_only_present_fields() {
        let state = CoreState::new(Config::default());
        let update: MixStatusUpdate =
            serde_json::from_str(r#"{"time_between_sets": 300}"#).unwrap();
        assert!(!update.is_empty());

        let tuned = state.update_mix_status(&update);
        assert_eq!(tuned.time_between_sets(), Duration::from_secs(300));
        assert_eq!(tuned.beats_until_reported, 128);
        assert_eq!(state.mix_status(), tuned);
    }
}
