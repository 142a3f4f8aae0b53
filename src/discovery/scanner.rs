//! Inventory Scanner
//!
//! Runs every enabled export and network scanner against one probe and
//! collects the results into a single [`Inventory`] document. A failing
//! scanner contributes an empty list; the others are unaffected.

use crate::discovery::config::ScannerConfig;
use crate::discovery::exports::{scan_nfs, scan_nvmeof, scan_scst};
use crate::discovery::network::scan_network;
use crate::domain::ports::{Export, NetDevInfo, Resource, SystemProbe, SystemProbeRef};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

const UNKNOWN_HOSTNAME: &str = "unknown";

// =============================================================================
// Inventory Document
// =============================================================================

/// Snapshot of the exports and network devices of one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Inventory {
    pub hostname: String,
    pub scanned_at: DateTime<Utc>,
    pub nvmeof_exports: Vec<Export>,
    pub scst_exports: Vec<Export>,
    pub nfs_exports: Vec<Export>,
    pub net_interfaces: Vec<NetDevInfo>,
}

impl Inventory {
    /// All exports regardless of protocol
    pub fn exports(&self) -> impl Iterator<Item = &Export> {
        self.nvmeof_exports
            .iter()
            .chain(self.scst_exports.iter())
            .chain(self.nfs_exports.iter())
    }

    /// Number of exports with confirmed health evidence
    pub fn confirmed_exports(&self) -> usize {
        self.exports().filter(|e| e.health().is_confirmed()).count()
    }

    /// Number of network ports across all devices
    pub fn port_count(&self) -> usize {
        self.net_interfaces.iter().map(|d| d.ports.len()).sum()
    }
}

// =============================================================================
// Inventory Scanner
// =============================================================================

/// Scans exports and network devices on the local host
pub struct InventoryScanner {
    config: Arc<ScannerConfig>,
    probe: SystemProbeRef,
}

impl InventoryScanner {
    /// Create a new inventory scanner
    pub fn new(config: ScannerConfig, probe: SystemProbeRef) -> Self {
        Self {
            config: Arc::new(config),
            probe,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Run all enabled scanners one after the other
    pub fn discover(&self) -> Inventory {
        let hostname = read_hostname(self.probe.as_ref(), &self.config);
        info!("Starting inventory scan on {}", hostname);

        let probe = self.probe.as_ref();
        let config = &self.config;

        let inventory = Inventory {
            hostname,
            scanned_at: Utc::now(),
            nvmeof_exports: enabled_or_empty(config.nvmeof.enabled, || {
                scan_nvmeof(probe, &config.nvmeof)
            }),
            scst_exports: enabled_or_empty(config.scst.enabled, || scan_scst(probe, &config.scst)),
            nfs_exports: enabled_or_empty(config.nfs.enabled, || scan_nfs(probe, &config.nfs)),
            net_interfaces: enabled_or_empty(config.network.enabled, || {
                scan_network(probe, &config.network)
            }),
        };

        log_summary(&inventory);
        inventory
    }

    /// Run all enabled scanners concurrently on blocking worker threads
    ///
    /// Must be called from within a tokio runtime.
    pub async fn discover_concurrent(&self) -> Inventory {
        let hostname = read_hostname(self.probe.as_ref(), &self.config);
        info!("Starting concurrent inventory scan on {}", hostname);

        let nvmeof = self.spawn_scan(self.config.nvmeof.enabled, |probe, config| {
            scan_nvmeof(probe, &config.nvmeof)
        });
        let scst = self.spawn_scan(self.config.scst.enabled, |probe, config| {
            scan_scst(probe, &config.scst)
        });
        let nfs = self.spawn_scan(self.config.nfs.enabled, |probe, config| {
            scan_nfs(probe, &config.nfs)
        });
        let network = self.spawn_scan(self.config.network.enabled, |probe, config| {
            scan_network(probe, &config.network)
        });

        let (nvmeof, scst, nfs, network) = tokio::join!(
            join_scan("nvmeof", nvmeof),
            join_scan("scst", scst),
            join_scan("nfs", nfs),
            join_scan("network", network),
        );

        let inventory = Inventory {
            hostname,
            scanned_at: Utc::now(),
            nvmeof_exports: nvmeof,
            scst_exports: scst,
            nfs_exports: nfs,
            net_interfaces: network,
        };

        log_summary(&inventory);
        inventory
    }

    fn spawn_scan<T, F>(&self, enabled: bool, scan: F) -> Option<JoinHandle<Vec<T>>>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SystemProbe, &ScannerConfig) -> Vec<T> + Send + 'static,
    {
        if !enabled {
            return None;
        }
        let probe = Arc::clone(&self.probe);
        let config = Arc::clone(&self.config);
        Some(tokio::task::spawn_blocking(move || {
            scan(probe.as_ref(), config.as_ref())
        }))
    }
}

fn enabled_or_empty<T>(enabled: bool, scan: impl FnOnce() -> Vec<T>) -> Vec<T> {
    if enabled {
        scan()
    } else {
        Vec::new()
    }
}

async fn join_scan<T>(name: &str, handle: Option<JoinHandle<Vec<T>>>) -> Vec<T> {
    match handle {
        Some(handle) => match handle.await {
            Ok(found) => found,
            Err(e) => {
                error!("{} scanner task failed: {}", name, e);
                Vec::new()
            }
        },
        None => Vec::new(),
    }
}

/// Host name from the configured file, then the `hostname` command
fn read_hostname(probe: &dyn SystemProbe, config: &ScannerConfig) -> String {
    if let Ok(hostname) = probe.read_trimmed(&config.hostname_path) {
        if !hostname.is_empty() {
            return hostname;
        }
    }

    match probe.run_checked("hostname") {
        Ok(out) if !out.trim().is_empty() => out.trim().to_string(),
        _ => UNKNOWN_HOSTNAME.to_string(),
    }
}

fn log_summary(inventory: &Inventory) {
    info!(
        nvmeof = inventory.nvmeof_exports.len(),
        scst = inventory.scst_exports.len(),
        nfs = inventory.nfs_exports.len(),
        confirmed = inventory.confirmed_exports(),
        net_devices = inventory.net_interfaces.len(),
        net_ports = inventory.port_count(),
        "Inventory scan complete"
    );
}
