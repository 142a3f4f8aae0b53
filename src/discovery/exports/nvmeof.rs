//! NVMe-oF Target Discovery
//!
//! Walks the nvmet configfs tree. Every port directory is one candidate
//! export: the first subsystem linked under the port names it, the
//! subsystem's first namespace tells whether it is enabled, and established
//! sockets on the port's service id give the connected hosts.
//!
//! ```text
//! /sys/kernel/config/nvmet/
//! ├── ports/1/{addr_trtype,addr_traddr,addr_trsvcid,subsystems/<nqn>}
//! └── subsystems/<nqn>/namespaces/1/enable
//! ```

use crate::discovery::config::NvmeofConfig;
use crate::domain::ports::{Export, ExportProtocol, HealthStatus, SystemProbe};
use crate::error::{Error, Result};
use indexmap::IndexSet;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};

const PORT_SUBSYSTEMS_DIR: &str = "subsystems";
const TRANSPORT_TYPE_ATTR: &str = "addr_trtype";
const TRANSPORT_ADDR_ATTR: &str = "addr_traddr";
const SERVICE_ID_ATTR: &str = "addr_trsvcid";

/// Discover NVMe-oF exports, degrading to an empty list on any failure
pub fn scan_nvmeof(probe: &dyn SystemProbe, config: &NvmeofConfig) -> Vec<Export> {
    match try_scan_nvmeof(probe, config) {
        Ok(exports) => {
            info!("Found {} NVMe-oF exports", exports.len());
            exports
        }
        Err(e) => {
            warn!("NVMe-oF discovery failed: {}", e);
            Vec::new()
        }
    }
}

fn try_scan_nvmeof(probe: &dyn SystemProbe, config: &NvmeofConfig) -> Result<Vec<Export>> {
    let ports = probe.list_dir(&config.ports_path())?;

    let mut exports = Vec::new();
    for port_id in ports.iter().filter(|p| !p.is_empty()) {
        let export = scan_port(probe, config, port_id);
        if export.health.is_confirmed() {
            exports.push(export);
        } else {
            debug!("Dropping NVMe-oF port {} with no enabled namespace", port_id);
        }
    }
    Ok(exports)
}

fn scan_port(probe: &dyn SystemProbe, config: &NvmeofConfig, port_id: &str) -> Export {
    let port_path = config.ports_path().join(port_id);

    let subsystem = probe
        .list_dir(&port_path.join(PORT_SUBSYSTEMS_DIR))
        .ok()
        .and_then(|entries| entries.into_iter().next())
        .unwrap_or_default();

    let mut export = Export::new(ExportProtocol::Nvmeof, subsystem);
    export.port = probe.read_trimmed(&port_path.join(SERVICE_ID_ATTR)).ok();

    log_transport(probe, &port_path, port_id);

    if export.export_path.is_empty() {
        debug!("NVMe-oF port {} has no subsystem", port_id);
        return export;
    }

    export.health = read_namespace_health(probe, &config.subsystems_path(), &export.export_path);

    if let Some(service_id) = export.port.as_deref() {
        let command = config.socket_command_for(service_id);
        let sockets = match probe.run_checked(&command) {
            Ok(out) => out,
            Err(e) => {
                debug!("No sockets for NVMe-oF port {}: {}", service_id, e);
                String::new()
            }
        };

        match parse_initiators(&sockets, service_id) {
            Ok(initiators) if !initiators.is_empty() => export.clients = initiators,
            Ok(_) => {}
            Err(e) => debug!("Cannot match initiators on {}: {}", service_id, e),
        }
    }

    export
}

fn read_namespace_health(probe: &dyn SystemProbe, subsystems: &Path, nqn: &str) -> HealthStatus {
    let enable_path = subsystems.join(nqn).join("namespaces/1/enable");
    match probe.read_file(&enable_path).and_then(|raw| parse_enable(&raw)) {
        Ok(health) => health,
        Err(e) => {
            debug!("NVMe-oF subsystem {} health unknown: {}", nqn, e);
            HealthStatus::Unknown
        }
    }
}

fn log_transport(probe: &dyn SystemProbe, port_path: &Path, port_id: &str) {
    let trtype = probe.read_trimmed(&port_path.join(TRANSPORT_TYPE_ATTR));
    let traddr = probe.read_trimmed(&port_path.join(TRANSPORT_ADDR_ATTR));
    if let (Ok(trtype), Ok(traddr)) = (trtype, traddr) {
        debug!("NVMe-oF port {} transport {}://{}", port_id, trtype, traddr);
    }
}

/// Interpret a namespace `enable` attribute
pub fn parse_enable(raw: &str) -> Result<HealthStatus> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Parse(format!("Invalid enable value: {:?}", raw)))?;
    Ok(HealthStatus::from_enabled_flag(value))
}

/// Remote hosts of established sockets whose local port is `port`
///
/// Hosts are deduplicated, keeping first-seen order.
pub fn parse_initiators(sockets: &str, port: &str) -> Result<Vec<String>> {
    let pattern = Regex::new(&format!(
        r"(?m)^ESTAB.*:{}\s*(\S*):\d+\s*$",
        regex::escape(port)
    ))?;

    let hosts: IndexSet<String> = pattern
        .captures_iter(sockets)
        .map(|caps| caps[1].to_string())
        .collect();

    Ok(hosts.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryProbe;

    const NVMET: &str = "/sys/kernel/config/nvmet";
    const NQN: &str = "nqn.2023-01.io.test:vol1";

    const SS_OUT: &str = "\
LISTEN 0      128    192.168.84.148:4420        0.0.0.0:*
ESTAB  0      0      192.168.84.148:4420  192.168.83.222:50112
ESTAB  0      0      192.168.84.148:4420  192.168.83.181:50113
ESTAB  0      0      192.168.84.148:4420  192.168.83.222:50114
ESTAB  0      0      192.168.84.148:44201 192.168.83.99:50115
";

    fn port_fixture(probe: InMemoryProbe, port_id: &str, nqn: &str, svc: &str) -> InMemoryProbe {
        let port = format!("{}/ports/{}", NVMET, port_id);
        probe
            .with_dir(format!("{}/subsystems/{}", port, nqn))
            .with_file(format!("{}/addr_trsvcid", port), format!("{}\n", svc))
            .with_file(format!("{}/addr_trtype", port), "tcp\n")
            .with_file(format!("{}/addr_traddr", port), "192.168.84.148\n")
    }

    fn enable_fixture(probe: InMemoryProbe, nqn: &str, value: &str) -> InMemoryProbe {
        probe.with_file(
            format!("{}/subsystems/{}/namespaces/1/enable", NVMET, nqn),
            value,
        )
    }

    #[test]
    fn test_parse_initiators() {
        assert_eq!(
            parse_initiators(SS_OUT, "4420").unwrap(),
            vec!["192.168.83.222", "192.168.83.181"]
        );
        assert_eq!(parse_initiators(SS_OUT, "44201").unwrap(), vec!["192.168.83.99"]);
        assert!(parse_initiators(SS_OUT, "4421").unwrap().is_empty());
        assert!(parse_initiators("", "4420").unwrap().is_empty());
    }

    #[test]
    fn test_parse_enable() {
        assert_eq!(parse_enable("1\n").unwrap(), HealthStatus::Ok);
        assert_eq!(parse_enable("0\n").unwrap(), HealthStatus::Degraded);
        assert!(parse_enable("on").is_err());
    }

    #[test]
    fn test_scan_nvmeof() {
        let probe = port_fixture(InMemoryProbe::new(), "1", NQN, "4420");
        let probe = enable_fixture(probe, NQN, "1\n").with_command("ss -tla | grep 4420", SS_OUT);

        let exports = scan_nvmeof(&probe, &NvmeofConfig::default());
        assert_eq!(exports.len(), 1);

        let export = &exports[0];
        assert_eq!(export.proto, ExportProtocol::Nvmeof);
        assert_eq!(export.export_path, NQN);
        assert_eq!(export.port.as_deref(), Some("4420"));
        assert_eq!(export.health, HealthStatus::Ok);
        assert_eq!(export.clients, vec!["192.168.83.222", "192.168.83.181"]);
    }

    #[test]
    fn test_clients_empty_without_established_sockets() {
        let probe = port_fixture(InMemoryProbe::new(), "2", NQN, "4421");
        let probe = enable_fixture(probe, NQN, "0\n").with_command(
            "ss -tla | grep 4421",
            "LISTEN 0 128 192.168.84.148:4421 0.0.0.0:*\n",
        );

        let exports = scan_nvmeof(&probe, &NvmeofConfig::default());
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].health, HealthStatus::Degraded);
        assert_eq!(exports[0].clients, Vec::<String>::new());
    }

    #[test]
    fn test_scan_nvmeof_drops_unusable_ports() {
        // Port 1: no subsystem linked. Port 2: namespace enable unreadable.
        // Port 3: enable attribute not an integer.
        let probe = InMemoryProbe::new()
            .with_file(format!("{}/ports/1/addr_trsvcid", NVMET), "4420\n")
            .with_dir(format!("{}/ports/1/subsystems", NVMET));
        let probe = port_fixture(probe, "2", "nqn.test:no-ns", "4421");
        let probe = port_fixture(probe, "3", "nqn.test:garbage", "4422");
        let probe = enable_fixture(probe, "nqn.test:garbage", "enabled");

        let exports = scan_nvmeof(&probe, &NvmeofConfig::default());
        assert!(exports.is_empty());
        assert!(!probe.ran("ss -tla | grep 4420"));
    }

    #[test]
    fn test_scan_nvmeof_without_ports_directory() {
        let probe = InMemoryProbe::new();
        assert!(scan_nvmeof(&probe, &NvmeofConfig::default()).is_empty());
    }
}
