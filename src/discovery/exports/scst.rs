//! SCST iSCSI Target Discovery
//!
//! Walks the SCST sysfs tree. Each directory under the iSCSI driver's target
//! root is one target; its `enabled` attribute gives the health and its
//! `sessions` directory lists connected initiators.

use crate::discovery::config::ScstConfig;
use crate::domain::ports::{Export, ExportProtocol, HealthStatus, SystemProbe};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::{debug, info};

const ENABLED_ATTR: &str = "enabled";
const SESSIONS_DIR: &str = "sessions";

/// Discover SCST iSCSI targets, degrading to an empty list on any failure
pub fn scan_scst(probe: &dyn SystemProbe, config: &ScstConfig) -> Vec<Export> {
    let targets = match probe.list_subdirs(&config.targets_path) {
        Ok(targets) => targets,
        Err(e) => {
            // Module not loaded
            debug!("No SCST iSCSI targets: {}", e);
            return Vec::new();
        }
    };

    let mut exports = Vec::new();
    for target in targets.iter().filter(|t| !t.is_empty()) {
        match scan_target(probe, &config.targets_path, target) {
            Ok(export) if export.health.is_confirmed() => exports.push(export),
            Ok(_) => debug!("Dropping SCST target {} with no health signal", target),
            Err(e) => debug!("Dropping SCST target {}: {}", target, e),
        }
    }

    info!("Found {} SCST iSCSI exports", exports.len());
    exports
}

fn scan_target(probe: &dyn SystemProbe, root: &Path, target: &str) -> Result<Export> {
    let target_path = root.join(target);

    let enabled = probe.read_file(&target_path.join(ENABLED_ATTR))?;

    let mut export = Export::new(ExportProtocol::Iscsi, target);
    export.health = parse_enabled(&enabled)?;

    match probe.list_subdirs(&target_path.join(SESSIONS_DIR)) {
        Ok(sessions) => export.clients = sessions,
        Err(e) => debug!("No sessions for SCST target {}: {}", target, e),
    }

    Ok(export)
}

/// Interpret an SCST `enabled` attribute
pub fn parse_enabled(raw: &str) -> Result<HealthStatus> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Parse(format!("Invalid enabled value: {:?}", raw)))?;
    Ok(HealthStatus::from_enabled_flag(value))
}
