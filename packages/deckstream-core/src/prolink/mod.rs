//! Device-feed domain model.
//!
//! # Module Structure
//!
//! - `types` - Snapshot, device, and track types reported by the feed
//! - `traits` - Collaborator seams (track lookup, network configuration)
//! - `diff` - Field-level status diffing

pub mod diff;
pub mod traits;
pub mod types;

pub use diff::{diff_status, StatusChange};
pub use traits::{
    Network, NetworkError, NetworkResult, TrackLookup, TrackLookupError, TrackLookupResult,
};
pub use types::{
    Device, DeviceId, DeviceType, MacAddr, MixEventKind, PlayState, StatusSnapshot, Track,
    TrackKey, TrackSlot, TrackType,
};
