//! General utilities shared across the application.

use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::prolink::{Device, DeviceId, NetworkError};

/// Player ids a virtual player may claim.
pub const ASSIGNABLE_PLAYER_IDS: std::ops::RangeInclusive<u8> = 1..=4;

// ─────────────────────────────────────────────────────────────────────────────
// Network Interfaces
// ─────────────────────────────────────────────────────────────────────────────

/// Lists the host's IPv4 interfaces by name, with the first address of each.
///
/// Sorted by interface name.
pub fn list_interfaces() -> Result<Vec<(String, IpAddr)>, NetworkError> {
    let interfaces = local_ip_address::list_afinet_netifas()
        .map_err(|e| NetworkError::InterfaceList(e.to_string()))?;

    let mut by_name: BTreeMap<String, IpAddr> = BTreeMap::new();
    for (name, ip) in interfaces {
        if ip.is_ipv4() {
            by_name.entry(name).or_insert(ip);
        }
    }
    Ok(by_name.into_iter().collect())
}

/// Detects the host's primary local IP for display in startup logs.
pub fn local_ip() -> Option<IpAddr> {
    local_ip_address::local_ip().ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Player Ids
// ─────────────────────────────────────────────────────────────────────────────

/// Assignable player ids not taken by any of `devices`.
pub fn unused_player_ids(devices: &[Device]) -> Vec<DeviceId> {
    ASSIGNABLE_PLAYER_IDS
        .map(DeviceId)
        .filter(|id| devices.iter().all(|d| d.id != *id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prolink::{DeviceType, MacAddr};
    use chrono::Utc;

    fn device(id: u8) -> Device {
        Device {
            id: DeviceId(id),
            name: format!("CDJ-2000NXS2 #{}", id),
            device_type: DeviceType::Cdj,
            mac_addr: MacAddr::default(),
            ip: "169.254.0.2".parse().unwrap(),
            last_active: Utc::now(),
        }
    }

    #[test]
    fn unused_ids_skip_active_players() {
        let devices = vec![device(1), device(3), device(33)];
        assert_eq!(unused_player_ids(&devices), vec![DeviceId(2), DeviceId(4)]);
    }

    #[test]
    fn all_ids_unused_on_empty_network() {
        assert_eq!(unused_player_ids(&[]).len(), 4);
    }
}
