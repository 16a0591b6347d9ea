//! Network collaborator for running without a live DJ network.

use std::sync::atomic::{AtomicU8, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::prolink::{Device, DeviceId, Network, NetworkError, NetworkResult};
use crate::utils::{list_interfaces, ASSIGNABLE_PLAYER_IDS};

/// Default virtual player id, outside the range real players use.
const DEFAULT_VIRTUAL_PLAYER_ID: DeviceId = DeviceId(0x07);

/// A [`Network`] that is not attached to any DJ network.
///
/// Interface listing is real; interface selection and the virtual player id
/// are only recorded. The device table is filled by whoever drives the feed
/// (see [`replay`](super::replay)).
pub struct DetachedNetwork {
    interface: RwLock<Option<String>>,
    virtual_player_id: AtomicU8,
    devices: DashMap<DeviceId, Device>,
}

impl DetachedNetwork {
    pub fn new() -> Self {
        Self {
            interface: RwLock::new(None),
            virtual_player_id: AtomicU8::new(DEFAULT_VIRTUAL_PLAYER_ID.0),
            devices: DashMap::new(),
        }
    }

    /// Marks a device as active.
    pub fn device_added(&self, device: &Device) {
        self.devices.insert(device.id, device.clone());
    }

    /// Marks a device as gone.
    pub fn device_removed(&self, device: &Device) {
        self.devices.remove(&device.id);
    }
}

impl Default for DetachedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl Network for DetachedNetwork {
    fn active_devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.iter().map(|d| d.value().clone()).collect();
        devices.sort_by_key(|d| d.id);
        devices
    }

    fn interface(&self) -> Option<String> {
        self.interface.read().clone()
    }

    fn available_interfaces(&self) -> NetworkResult<Vec<String>> {
        Ok(list_interfaces()?.into_iter().map(|(name, _)| name).collect())
    }

    fn set_interface(&self, name: &str) -> NetworkResult<()> {
        let known = self.available_interfaces()?;
        if !known.iter().any(|i| i == name) {
            return Err(NetworkError::UnknownInterface(name.to_string()));
        }
        log::info!("[Network] Interface set to {}", name);
        *self.interface.write() = Some(name.to_string());
        Ok(())
    }

    fn virtual_player_id(&self) -> DeviceId {
        DeviceId(self.virtual_player_id.load(Ordering::Relaxed))
    }

    fn set_virtual_player_id(&self, id: DeviceId) {
        log::info!("[Network] Virtual player id set to {}", id);
        self.virtual_player_id.store(id.0, Ordering::Relaxed);
    }

    /// Picks the first non-loopback interface and the lowest free player id.
    fn auto_configure(&self) -> NetworkResult<()> {
        let interface = list_interfaces()?
            .into_iter()
            .find(|(_, ip)| !ip.is_loopback())
            .map(|(name, _)| name)
            .ok_or_else(|| NetworkError::AutoConfigure("no usable interface".to_string()))?;

        let taken = self.active_devices();
        let player_id = ASSIGNABLE_PLAYER_IDS
            .map(DeviceId)
            .find(|id| taken.iter().all(|d| d.id != *id))
            .unwrap_or(DEFAULT_VIRTUAL_PLAYER_ID);

        log::info!(
            "[Network] Auto-configured interface {} with player id {}",
            interface,
            player_id
        );
        *self.interface.write() = Some(interface);
        self.virtual_player_id.store(player_id.0, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prolink::{DeviceType, MacAddr};
    use chrono::Utc;

    fn device(id: u8) -> Device {
        Device {
            id: DeviceId(id),
            name: "CDJ-3000".to_string(),
            device_type: DeviceType::Cdj,
            mac_addr: MacAddr::default(),
            ip: "169.254.0.9".parse().unwrap(),
            last_active: Utc::now(),
        }
    }

    #[test]
    fn device_table_follows_lifecycle() {
        let network = DetachedNetwork::new();
        network.device_added(&device(3));
        network.device_added(&device(1));
        assert_eq!(
            network
                .active_devices()
                .iter()
                .map(|d| d.id)
                .collect::<Vec<_>>(),
            vec![DeviceId(1), DeviceId(3)]
        );

        network.device_removed(&device(3));
        assert_eq!(network.active_devices().len(), 1);
    }

    #[test]
    fn unknown_interface_is_rejected() {
        let network = DetachedNetwork::new();
        let err = network.set_interface("definitely-not-an-interface0").unwrap_err();
        assert!(matches!(
            err,
            NetworkError::UnknownInterface(_) | NetworkError::InterfaceList(_)
        ));
        assert_eq!(network.interface(), None);
    }

    #[test]
    fn virtual_player_id_is_recorded() {
        let network = DetachedNetwork::new();
        assert_eq!(network.virtual_player_id(), DEFAULT_VIRTUAL_PLAYER_ID);
        network.set_virtual_player_id(DeviceId(4));
        assert_eq!(network.virtual_player_id(), DeviceId(4));
    }
}
