//! Network Device Discovery
//!
//! Interfaces are scanned individually, then grouped per physical PCI
//! device.

pub mod ethernet;
pub mod grouping;

pub use ethernet::scan_interfaces;
pub use grouping::{group_by_pci_function, pci_group_key};

use crate::discovery::config::NetworkConfig;
use crate::domain::ports::{NetDevInfo, SystemProbe};

/// Discover network devices with their ports
pub fn scan_network(probe: &dyn SystemProbe, config: &NetworkConfig) -> Vec<NetDevInfo> {
    group_by_pci_function(scan_interfaces(probe, config))
}
