//! NFS Export Discovery
//!
//! Lists the kernel NFS server's exports with `exportfs -s` and marks them
//! healthy when the NFS service has a listening socket.
//!
//! ```text
//! /mnt/testlib/tb_59vqhg  *(async,wdelay,hide,no_subtree_check,sec=sys,rw,secure)
//!
//! tcp   LISTEN    0      64            0.0.0.0:nfs            0.0.0.0:*
//! tcp   ESTAB     0      0       192.168.84.44:nfs     192.168.83.222:701
//! ```

use crate::discovery::config::NfsConfig;
use crate::domain::ports::{Export, ExportProtocol, HealthStatus, SystemProbe};
use crate::error::Result;
use indexmap::IndexSet;
use regex::Regex;
use tracing::{debug, info, warn};

/// Discover NFS exports, degrading to an empty list on any failure
pub fn scan_nfs(probe: &dyn SystemProbe, config: &NfsConfig) -> Vec<Export> {
    match try_scan_nfs(probe, config) {
        Ok(exports) => {
            info!("Found {} NFS exports", exports.len());
            exports
        }
        Err(e) => {
            warn!("NFS discovery failed: {}", e);
            Vec::new()
        }
    }
}

fn try_scan_nfs(probe: &dyn SystemProbe, config: &NfsConfig) -> Result<Vec<Export>> {
    let exportfs = probe.run_checked(&config.exportfs_command)?;
    if exportfs.trim().is_empty() {
        debug!("exportfs reported no exports");
        return Ok(Vec::new());
    }

    let paths = parse_exports(&exportfs, &config.export_root)?;

    // grep exits 1 when nothing matches; no sockets is not an error here
    let sockets = match probe.run_checked(&config.socket_command) {
        Ok(out) => out,
        Err(e) => {
            debug!("No NFS socket listing: {}", e);
            String::new()
        }
    };

    let mut exports = Vec::with_capacity(paths.len());
    for path in &paths {
        if let Some(export) = parse_export_with_service(path, &sockets, &config.service)? {
            exports.push(export);
        }
    }
    Ok(exports)
}

/// Extract export paths under `export_root` from `exportfs -s` output
///
/// Each path is returned once, in first-seen order.
pub fn parse_exports(exportfs_out: &str, export_root: &str) -> Result<Vec<String>> {
    let pattern = Regex::new(&format!(r"(?m)^({}\S+)\s+", regex::escape(export_root)))?;

    let paths: IndexSet<String> = pattern
        .captures_iter(exportfs_out)
        .map(|caps| caps[1].to_string())
        .collect();

    Ok(paths.into_iter().collect())
}

/// Build an NFS export record for `path`, judging health from `sockets`
///
/// Returns `None` for an empty path.
pub fn parse_export(path: &str, sockets: &str) -> Option<Export> {
    parse_export_with_service(path, sockets, "nfs").ok().flatten()
}

fn parse_export_with_service(path: &str, sockets: &str, service: &str) -> Result<Option<Export>> {
    if path.is_empty() {
        return Ok(None);
    }

    let mut export = Export::new(ExportProtocol::Nfs, path);
    export.health = if has_listening_socket(sockets, service)? {
        HealthStatus::Ok
    } else {
        HealthStatus::Unknown
    };

    debug!("NFS export {} health {}", export.export_path, export.health);
    Ok(Some(export))
}

/// Whether any `LISTEN` line has `service` as its local port
pub fn has_listening_socket(sockets: &str, service: &str) -> Result<bool> {
    let pattern = Regex::new(&format!(
        r"(?m)LISTEN.*:{}\s*(\S*):.*$",
        regex::escape(service)
    ))?;
    Ok(pattern.is_match(sockets))
}
