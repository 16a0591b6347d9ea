//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use deckstream_core::MixStatusConfig;
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = first free port in 5002-5012).
    /// Override: `DECKSTREAM_BIND_PORT`
    pub bind_port: u16,

    /// How long significant events stay replayable, in seconds.
    /// Override: `DECKSTREAM_HISTORY_TTL`
    pub history_ttl: u64,

    /// Interval in seconds between history trim passes.
    pub history_trim_interval: u64,

    /// Frames buffered per client before new frames are dropped.
    pub outbound_queue_capacity: usize,

    /// Send the history snapshot to each client on connect.
    pub backfill_on_connect: bool,

    /// Initial mix-status tuning.
    pub mix_status: MixStatusConfig,

    /// Feed capture to replay after startup.
    pub replay: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = deckstream_core::Config::default();
        Self {
            bind_port: core.preferred_port,
            history_ttl: core.history_ttl_secs,
            history_trim_interval: core.history_trim_interval_secs,
            outbound_queue_capacity: core.outbound_queue_capacity,
            backfill_on_connect: core.backfill_on_connect,
            mix_status: core.mix_status,
            replay: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies environment variable overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(port) = var("DECKSTREAM_BIND_PORT").and_then(|v| v.parse().ok()) {
            self.bind_port = port;
        }

        if let Some(ttl) = var("DECKSTREAM_HISTORY_TTL").and_then(|v| v.parse().ok()) {
            self.history_ttl = ttl;
        }
    }

    /// Converts to deckstream-core's Config type.
    pub fn to_core_config(&self) -> deckstream_core::Config {
        deckstream_core::Config {
            preferred_port: self.bind_port,
            history_ttl_secs: self.history_ttl,
            history_trim_interval_secs: self.history_trim_interval,
            outbound_queue_capacity: self.outbound_queue_capacity,
            backfill_on_connect: self.backfill_on_connect,
            mix_status: self.mix_status.clone(),
        }
    }
}
