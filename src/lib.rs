//! Host Inventory - Storage Export & Network Device Discovery
//!
//! Inventories the storage exports (NFS, SCST iSCSI, NVMe-oF) and network
//! devices of a Linux host and annotates them with a coarse health status.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                           Inventory Scanner                                  │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────────────────────┐  │
//! │  │    NFS    │  │   SCST    │  │  NVMe-oF  │  │  Ethernet + PCI grouping  │  │
//! │  │  exports  │  │  targets  │  │   ports   │  │                           │  │
//! │  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘  └─────────────┬─────────────┘  │
//! │        └──────────────┴──────┬───────┴──────────────────────┘                │
//! │                              │                                               │
//! │                  ┌───────────┴───────────┐                                   │
//! │                  │   SystemProbe (port)  │                                   │
//! │                  └───────────┬───────────┘                                   │
//! ├──────────────────────────────┼──────────────────────────────────────────────┤
//! │        ┌─────────────────────┴──────────────────────┐                        │
//! │        │ HostProbe (sh, sysfs, configfs) │ InMemory │                        │
//! │        └────────────────────────────────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`discovery`]: Export and network scanners, configuration, aggregation
//! - [`adapters`]: System probe implementations
//! - [`domain`]: Resource model and the probe port
//! - [`error`]: Error types and handling

pub mod adapters;
pub mod discovery;
pub mod domain;
pub mod error;

// Re-export commonly used types
pub use adapters::{HostProbe, InMemoryProbe};

pub use discovery::{
    Inventory, InventoryScanner, NetworkConfig, NfsConfig, NvmeofConfig, ScannerConfig,
    ScstConfig,
};

pub use domain::ports::{
    CommandOutput, DeviceInfo, Export, ExportProtocol, HealthStatus, LinkStatus, NetDevInfo,
    NetworkInterface, PowerState, Resource, SystemProbe, SystemProbeRef,
};

pub use error::{Error, FailureClass, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
