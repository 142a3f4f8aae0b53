//! Network Device Grouping
//!
//! A multi-port NIC exposes one kernel interface per port, each on its own
//! PCI function of the same bus:device. Grouping on that bus:device turns the
//! flat interface list into one [`NetDevInfo`] per card.
//!
//! The card's metadata is taken from the first port of each group. Ports of
//! one card are expected to agree; when they do not, the first one wins.

use crate::domain::ports::{NetDevInfo, NetworkInterface};
use once_cell::sync::Lazy;
use regex::Regex;

const NETDEV_ID_PREFIX: &str = "netdev";

static PCI_GROUP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d*):\d*\.\d+$").expect("valid PCI group pattern"));

/// Grouping key of a PCI slot: the decimal digits before `:<dev>.<fn>`
///
/// Slots that do not match (including virtual interfaces with no slot) all
/// share the empty key.
pub fn pci_group_key(pci_slot: &str) -> String {
    PCI_GROUP_PATTERN
        .captures(pci_slot)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

/// Group interfaces that share a PCI bus:device into network devices
///
/// Ports keep their relative input order within a group; their `deviceInfo`
/// is moved onto the group.
pub fn group_by_pci_function(interfaces: Vec<NetworkInterface>) -> Vec<NetDevInfo> {
    let mut keyed: Vec<(String, NetworkInterface)> = interfaces
        .into_iter()
        .map(|iface| (pci_group_key(iface.pci_slot()), iface))
        .collect();

    // Stable, so equal keys keep input order and become adjacent
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut devices: Vec<NetDevInfo> = Vec::new();
    let mut current_key: Option<String> = None;

    for (key, mut iface) in keyed {
        let info = iface.device_info.take().unwrap_or_default();

        if current_key.as_deref() != Some(key.as_str()) {
            let id = format!("{}{}", NETDEV_ID_PREFIX, info.pci_slot.replace([':', '.'], ""));
            devices.push(NetDevInfo {
                id,
                full_name: info.full_name,
                pci_slot: info.pci_slot,
                numa_id: info.numa_id,
                ports: Vec::new(),
            });
            current_key = Some(key);
        }

        if let Some(device) = devices.last_mut() {
            device.ports.push(iface);
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::DeviceInfo;
    use std::collections::BTreeSet;

    fn iface(name: &str, slot: &str, full_name: &str, numa: &str) -> NetworkInterface {
        NetworkInterface {
            id: format!("{}0000", name),
            name: name.into(),
            device_info: Some(DeviceInfo {
                full_name: full_name.into(),
                pci_slot: slot.into(),
                numa_id: numa.into(),
            }),
            ..Default::default()
        }
    }

    fn port_names(device: &NetDevInfo) -> BTreeSet<String> {
        device.ports.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_pci_group_key() {
        assert_eq!(pci_group_key("03:00.0"), "03");
        assert_eq!(pci_group_key("03:00.1"), "03");
        assert_eq!(pci_group_key("0001:81:00.0"), "81");
        // Hex buses cannot match the leading digits
        assert_eq!(pci_group_key("af:00.0"), "");
        assert_eq!(pci_group_key("00:1f.6"), "");
        assert_eq!(pci_group_key(""), "");
        assert_eq!(pci_group_key("garbage"), "");
    }

    #[test]
    fn test_group_dual_port_card() {
        let devices = group_by_pci_function(vec![
            iface("enp3s0f0", "03:00.0", "X710", "0"),
            iface("eno1", "00:1f.6", "I219-LM", "0"),
            iface("enp3s0f1", "03:00.1", "X710", "0"),
        ]);

        assert_eq!(devices.len(), 2);

        assert_eq!(devices[0].id, "netdev001f6");
        assert_eq!(devices[0].full_name, "I219-LM");
        assert_eq!(devices[0].ports.len(), 1);

        let card = &devices[1];
        assert_eq!(card.id, "netdev03000");
        assert_eq!(card.pci_slot, "03:00.0");
        assert_eq!(card.full_name, "X710");
        assert_eq!(card.numa_id, "0");
        assert_eq!(
            card.ports.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["enp3s0f0", "enp3s0f1"]
        );
        assert!(card.ports.iter().all(|p| p.device_info.is_none()));
    }

    #[test]
    fn test_group_uses_first_member_metadata() {
        // Same bus:device key, different metadata: the first port wins
        let devices = group_by_pci_function(vec![
            iface("ens1f1", "05:00.1", "Mellanox ConnectX-5", "1"),
            iface("ens1f0", "05:00.0", "", ""),
        ]);

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "netdev05001");
        assert_eq!(devices[0].pci_slot, "05:00.1");
        assert_eq!(devices[0].full_name, "Mellanox ConnectX-5");
        assert_eq!(devices[0].numa_id, "1");
        assert_eq!(devices[0].ports.len(), 2);
    }

    #[test]
    fn test_group_is_order_independent() {
        let forward = group_by_pci_function(vec![
            iface("a0", "03:00.0", "A", "0"),
            iface("a1", "03:00.1", "A", "0"),
            iface("b0", "04:00.0", "B", "1"),
            iface("a2", "03:00.2", "A", "0"),
        ]);
        let reversed = group_by_pci_function(vec![
            iface("a2", "03:00.2", "A", "0"),
            iface("b0", "04:00.0", "B", "1"),
            iface("a1", "03:00.1", "A", "0"),
            iface("a0", "03:00.0", "A", "0"),
        ]);

        assert_eq!(forward.len(), reversed.len());
        for (f, r) in forward.iter().zip(reversed.iter()) {
            assert_eq!(port_names(f), port_names(r));
            assert_eq!(f.full_name, r.full_name);
        }
    }

    #[test]
    fn test_unmatched_slots_share_one_group() {
        let mut veth = iface("veth1", "", "", "");
        veth.device_info = None;

        let devices = group_by_pci_function(vec![
            iface("docker0", "", "", ""),
            veth,
            iface("ens2f0", "af:00.0", "E810", "1"),
        ]);

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "netdev");
        assert_eq!(devices[0].ports.len(), 3);
    }

    #[test]
    fn test_group_empty() {
        assert!(group_by_pci_function(Vec::new()).is_empty());
    }

    #[test]
    fn test_grouped_ports_omit_device_info() {
        let devices = group_by_pci_function(vec![iface("eno1", "00:1f.6", "I219-LM", "0")]);
        let json = serde_json::to_value(&devices[0]).unwrap();

        assert_eq!(json["id"], "netdev001f6");
        assert_eq!(json["pciSlot"], "00:1f.6");
        assert_eq!(json["fullName"], "I219-LM");
        assert_eq!(json["numaId"], "0");
        assert!(json["ports"][0].get("deviceInfo").is_none());
    }
}
