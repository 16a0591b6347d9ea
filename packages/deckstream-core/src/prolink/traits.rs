//! Trait abstractions for the device-feed collaborator.
//!
//! The adapters and the admin API depend on these traits rather than on a
//! concrete network implementation, so the engine can be driven by a live
//! feed, a replayed capture, or a test double.

use thiserror::Error;

use super::types::{Device, DeviceId, Track, TrackKey};

/// Errors returned by a track database lookup.
#[derive(Debug, Error)]
pub enum TrackLookupError {
    /// The database has no track for the key.
    #[error("track not found: {0:?}")]
    NotFound(TrackKey),

    /// The database could not be queried (device offline, timeout, ...).
    #[error("track database unavailable: {0}")]
    Unavailable(String),
}

/// Convenient Result alias for track lookups.
pub type TrackLookupResult<T> = Result<T, TrackLookupError>;

/// Errors returned by network configuration operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// No interface with the given name exists on this host.
    #[error("invalid interface name {0:?}")]
    UnknownInterface(String),

    /// Interfaces could not be enumerated.
    #[error("failed to list network interfaces: {0}")]
    InterfaceList(String),

    /// Auto-configuration did not find a usable interface.
    #[error("auto-configuration failed: {0}")]
    AutoConfigure(String),
}

/// Convenient Result alias for network configuration operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Lookup into the remote track database.
///
/// Used by `MixStatusEmitter` to resolve now-playing / coming-soon tracks and
/// by the `/track` endpoint.
pub trait TrackLookup: Send + Sync {
    /// Resolves track metadata for the given key.
    fn get_track(&self, key: &TrackKey) -> TrackLookupResult<Track>;
}

/// Device topology and configuration of the network collaborator.
///
/// Only the read surface and the configuration-mutation entry points needed
/// by the admin API are exposed here.
pub trait Network: Send + Sync {
    /// Devices currently active on the network.
    fn active_devices(&self) -> Vec<Device>;

    /// Name of the interface the feed is bound to, if any.
    fn interface(&self) -> Option<String>;

    /// Names of all interfaces available on this host.
    fn available_interfaces(&self) -> NetworkResult<Vec<String>>;

    /// Binds the feed to the named interface.
    fn set_interface(&self, name: &str) -> NetworkResult<()>;

    /// Player id used when announcing ourselves as a virtual CDJ.
    fn virtual_player_id(&self) -> DeviceId;

    /// Changes the virtual CDJ player id.
    fn set_virtual_player_id(&self, id: DeviceId);

    /// Picks an interface and player id automatically.
    fn auto_configure(&self) -> NetworkResult<()>;
}
