//! Device lifecycle → `device_added` / `device_removed`.

use std::sync::Arc;

use crate::events::payload::DevicePayload;
use crate::events::{kinds, Event, EventData, EventSink};
use crate::prolink::Device;
use crate::services::isolate::isolate;

/// Publishes an event whenever a device joins or leaves the network.
///
/// Device events describe the network, not a player's state, so they are
/// published without a `player_id`; the device id travels in the payload.
pub struct DeviceChangeEmitter {
    sink: Arc<dyn EventSink>,
}

impl DeviceChangeEmitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn on_device_added(&self, device: &Device) {
        isolate("DeviceEmitter", "on_device_added", || {
            self.emit(kinds::DEVICE_ADDED, device)
        });
    }

    pub fn on_device_removed(&self, device: &Device) {
        isolate("DeviceEmitter", "on_device_removed", || {
            self.emit(kinds::DEVICE_REMOVED, device)
        });
    }

    fn emit(&self, event_type: &'static str, device: &Device) {
        log::info!(
            "[DeviceEmitter] {}: {} \"{}\" ({})",
            event_type,
            device.id,
            device.name,
            device.ip
        );
        let data = EventData::Device(DevicePayload::from(device));
        self.sink.publish(Event::new(event_type, None, data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBus, EventHistory};
    use crate::prolink::{DeviceId, DeviceType, MacAddr};
    use crate::runtime::TokioSpawner;
    use chrono::Utc;

    fn cdj() -> Device {
        Device {
            id: DeviceId(1),
            name: "CDJ-3000 #1".to_string(),
            device_type: DeviceType::Cdj,
            mac_addr: MacAddr([0x00, 0xe0, 0x36, 0x12, 0x34, 0x56]),
            ip: "169.254.10.1".parse().unwrap(),
            last_active: Utc::now(),
        }
    }

    #[tokio::test]
    async fn added_then_removed_both_reach_history() {
        let bus = Arc::new(EventBus::new(
            EventHistory::default(),
            TokioSpawner::current(),
        ));
        let emitter = DeviceChangeEmitter::new(bus.clone());

        emitter.on_device_added(&cdj());
        emitter.on_device_removed(&cdj());

        let history = bus.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_type(), kinds::DEVICE_ADDED);
        assert_eq!(history[1].event_type(), kinds::DEVICE_REMOVED);
        for event in &history {
            assert_eq!(event.player_id(), None);
            match event.data() {
                EventData::Device(payload) => {
                    assert_eq!(payload.name, "CDJ-3000 #1");
                    assert_eq!(payload.mac, "00:e0:36:12:34:56");
                }
                other => panic!("unexpected payload {:?}", other),
            }
        }
    }
}
