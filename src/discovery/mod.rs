//! Host Resource Discovery
//!
//! Discovers storage exports and network devices on Linux hosts through the
//! [`SystemProbe`](crate::domain::SystemProbe) port.

pub mod config;
pub mod exports;
pub mod network;
pub mod scanner;

pub use config::*;
pub use exports::{scan_nfs, scan_nvmeof, scan_scst};
pub use network::{group_by_pci_function, scan_interfaces, scan_network};
pub use scanner::*;
