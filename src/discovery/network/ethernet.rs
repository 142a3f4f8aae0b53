//! Ethernet Interface Discovery
//!
//! Live interface state comes from `ip -j a`; static hardware identity comes
//! from sysfs (`speed`, `device/numa_node`, `device/uevent`) and `lspci -D`.

use crate::discovery::config::NetworkConfig;
use crate::domain::ports::{DeviceInfo, LinkStatus, NetworkInterface, PowerState, SystemProbe};
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

const LOOPBACK_LINK_TYPE: &str = "loopback";
const UP: &str = "UP";
/// Reported by sysfs when the speed is unknown or the link is down
const UNKNOWN_SPEED: &str = "-1";
const PCI_DOMAIN_PREFIX: &str = "0000:";

static PCI_SLOT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^PCI_SLOT_NAME=(\S+)").expect("valid PCI slot pattern"));

static CONTROLLER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w+ controller: ([\w \[\]-].*)$").expect("valid controller pattern")
});

// =============================================================================
// Raw `ip -j a` Records
// =============================================================================

/// One entry of `ip -j a`, reduced to the fields we use
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInterface {
    #[serde(default)]
    pub ifname: String,
    /// MAC address
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub operstate: Option<String>,
    #[serde(default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub addr_info: Vec<RawAddrInfo>,
}

/// One configured address; `ip` sometimes emits empty objects here
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAddrInfo {
    #[serde(default)]
    pub local: Option<String>,
    #[serde(default)]
    pub prefixlen: Option<u32>,
}

impl RawInterface {
    pub fn is_loopback(&self) -> bool {
        self.link_type.as_deref() == Some(LOOPBACK_LINK_TYPE)
    }
}

// =============================================================================
// Scanning
// =============================================================================

/// Discover non-loopback interfaces with their hardware metadata
pub fn scan_interfaces(probe: &dyn SystemProbe, config: &NetworkConfig) -> Vec<NetworkInterface> {
    let raw = match probe
        .run_checked(&config.ip_command)
        .and_then(|out| parse_ip_json(&out))
    {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Network interface discovery failed: {}", e);
            return Vec::new();
        }
    };

    let mut resolver = DeviceInfoResolver::new(probe, config);
    let interfaces: Vec<NetworkInterface> = raw
        .iter()
        .filter_map(interface_from_raw)
        .map(|mut iface| {
            iface.max_link_speed_mbps = resolver.max_link_speed(&iface.name);
            iface.device_info = Some(resolver.device_info(&iface.name));
            iface
        })
        .collect();

    info!("Found {} network interfaces", interfaces.len());
    interfaces
}

/// Parse the JSON array printed by `ip -j a`
pub fn parse_ip_json(raw: &str) -> Result<Vec<RawInterface>> {
    Ok(serde_json::from_str(raw)?)
}

/// Build an interface from its `ip` record, without sysfs enrichment
///
/// Loopback and nameless records yield `None`.
pub fn interface_from_raw(raw: &RawInterface) -> Option<NetworkInterface> {
    if raw.is_loopback() || raw.ifname.is_empty() {
        return None;
    }

    let mac = raw.address.clone().unwrap_or_default();

    let power = if raw.operstate.as_deref() == Some(UP) {
        PowerState::Up
    } else {
        PowerState::Down
    };

    let status = if raw.flags.iter().any(|flag| flag == UP) {
        LinkStatus::Linked
    } else {
        LinkStatus::NoCarrier
    };

    let addresses = raw
        .addr_info
        .iter()
        .filter_map(|addr| match (addr.local.as_deref(), addr.prefixlen) {
            (Some(local), Some(prefixlen)) if !local.is_empty() => {
                Some(format!("{}/{}", local, prefixlen))
            }
            _ => None,
        })
        .collect();

    Some(NetworkInterface {
        id: NetworkInterface::compose_id(&raw.ifname, &mac),
        name: raw.ifname.clone(),
        mac,
        addresses,
        status,
        power,
        max_link_speed_mbps: String::new(),
        device_info: None,
    })
}

/// Map a sysfs `speed` value to Mbps, empty when unknown
pub fn normalize_link_speed(raw: &str) -> String {
    let speed = raw.trim();
    if speed == UNKNOWN_SPEED {
        String::new()
    } else {
        speed.to_string()
    }
}

/// PCI address from a device `uevent`, without the `0000:` domain
pub fn parse_pci_slot(uevent: &str) -> String {
    PCI_SLOT_PATTERN
        .captures(uevent)
        .map(|caps| {
            let slot = &caps[1];
            slot.strip_prefix(PCI_DOMAIN_PREFIX).unwrap_or(slot).to_string()
        })
        .unwrap_or_default()
}

/// Controller name for `pci_slot` from `lspci -D` output
pub fn parse_controller_name(lspci: &str, pci_slot: &str) -> String {
    if pci_slot.is_empty() {
        return String::new();
    }

    lspci
        .lines()
        .find(|line| line.contains(pci_slot))
        .and_then(|line| CONTROLLER_PATTERN.captures(line.trim()))
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_default()
}

// =============================================================================
// Device Info Resolution
// =============================================================================

/// Reads per-interface sysfs attributes; lists PCI devices at most once
struct DeviceInfoResolver<'a> {
    probe: &'a dyn SystemProbe,
    config: &'a NetworkConfig,
    lspci: Option<String>,
}

impl<'a> DeviceInfoResolver<'a> {
    fn new(probe: &'a dyn SystemProbe, config: &'a NetworkConfig) -> Self {
        Self {
            probe,
            config,
            lspci: None,
        }
    }

    fn max_link_speed(&self, name: &str) -> String {
        let path = self.config.interface_path(name).join("speed");
        match self.probe.read_file(&path) {
            Ok(raw) => normalize_link_speed(&raw),
            Err(e) => {
                debug!("No link speed for {}: {}", name, e);
                String::new()
            }
        }
    }

    fn device_info(&mut self, name: &str) -> DeviceInfo {
        let device = self.config.interface_path(name).join("device");

        let numa_id = self
            .probe
            .read_trimmed(&device.join("numa_node"))
            .unwrap_or_default();

        let pci_slot = self
            .probe
            .read_file(&device.join("uevent"))
            .map(|uevent| parse_pci_slot(&uevent))
            .unwrap_or_default();

        let full_name = if pci_slot.is_empty() {
            debug!("{} has no PCI device", name);
            String::new()
        } else {
            parse_controller_name(self.pci_listing(), &pci_slot)
        };

        DeviceInfo {
            full_name,
            pci_slot,
            numa_id,
        }
    }

    fn pci_listing(&mut self) -> &str {
        if self.lspci.is_none() {
            let listing = match self.probe.run_checked(&self.config.lspci_command) {
                Ok(out) => out,
                Err(e) => {
                    debug!("PCI listing unavailable: {}", e);
                    String::new()
                }
            };
            self.lspci = Some(listing);
        }
        self.lspci.as_deref().unwrap_or("")
    }
}
