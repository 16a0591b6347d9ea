//! Offline feed collaborators.
//!
//! Stand-ins for the live DJ network used by the standalone server: a
//! detached network, an in-memory track database, and a capture replayer
//! that drives the producer adapters.

mod catalog;
mod network;
pub mod replay;

pub use catalog::TrackCatalog;
pub use network::DetachedNetwork;
pub use replay::{FeedReplay, ReplayError};
