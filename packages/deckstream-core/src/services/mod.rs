//! Producer adapters.
//!
//! Each adapter translates one kind of feed notification into events on an
//! [`EventSink`](crate::events::EventSink). Every feed callback runs inside
//! a panic boundary.

pub mod device_emitter;
mod isolate;
pub mod mix_status_emitter;
pub mod status_emitter;

pub use device_emitter::DeviceChangeEmitter;
pub use mix_status_emitter::MixStatusEmitter;
pub use status_emitter::CdjStatusEmitter;

use std::sync::Arc;

use crate::events::EventSink;
use crate::prolink::TrackLookup;

/// The three adapters wired to one sink, as handed to a feed.
#[derive(Clone)]
pub struct ProducerAdapters {
    pub status: Arc<CdjStatusEmitter>,
    pub devices: Arc<DeviceChangeEmitter>,
    pub mix_status: Arc<MixStatusEmitter>,
}

impl ProducerAdapters {
    pub fn new(sink: Arc<dyn EventSink>, tracks: Arc<dyn TrackLookup>) -> Self {
        Self {
            status: Arc::new(CdjStatusEmitter::new(Arc::clone(&sink))),
            devices: Arc::new(DeviceChangeEmitter::new(Arc::clone(&sink))),
            mix_status: Arc::new(MixStatusEmitter::new(sink, tracks)),
        }
    }
}
