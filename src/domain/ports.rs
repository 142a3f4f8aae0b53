//! Domain Ports - Resource model and the system capability boundary
//!
//! The record types here are the externally visible contract of the scanner:
//! field names and enum strings are serialized exactly as declared. The
//! [`SystemProbe`] trait is the only way scanners touch the operating system.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// Health
// =============================================================================

/// Coarse health of a discovered resource
///
/// Starts at `Unknown` and is only raised by positive evidence.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Ok,
    Degraded,
    Failed,
}

impl HealthStatus {
    /// Map a kernel `enable`/`enabled` attribute value to a health status
    pub fn from_enabled_flag(value: i64) -> Self {
        if value == 1 {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        }
    }

    /// True when some evidence was found, either good or bad
    pub fn is_confirmed(&self) -> bool {
        matches!(self, HealthStatus::Ok | HealthStatus::Degraded)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "UNKNOWN"),
            HealthStatus::Ok => write!(f, "OK"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Identity and health shared by every discovered entity
pub trait Resource {
    /// Stable identifier, if the concrete type assigns one
    fn id(&self) -> Option<&str>;

    /// Health derived from corroborating evidence
    fn health(&self) -> HealthStatus {
        HealthStatus::Unknown
    }
}

// =============================================================================
// Exports
// =============================================================================

/// Export protocol discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ExportProtocol {
    #[serde(rename = "nfs")]
    Nfs,
    #[serde(rename = "nvmeof")]
    Nvmeof,
    #[serde(rename = "iscsi")]
    Iscsi,
}

impl std::fmt::Display for ExportProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportProtocol::Nfs => write!(f, "nfs"),
            ExportProtocol::Nvmeof => write!(f, "nvmeof"),
            ExportProtocol::Iscsi => write!(f, "iscsi"),
        }
    }
}

/// A published storage endpoint reachable by remote initiators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Protocol, fixed per scanner
    pub proto: ExportProtocol,
    /// Filesystem path (NFS), subsystem NQN (NVMe-oF) or target name (SCST)
    pub export_path: String,
    /// Observed initiators; empty means none observed
    pub clients: Vec<String>,
    /// Transport service identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub health: HealthStatus,
}

impl Export {
    /// Create an export with no clients and unknown health
    pub fn new(proto: ExportProtocol, export_path: impl Into<String>) -> Self {
        Self {
            id: None,
            proto,
            export_path: export_path.into(),
            clients: Vec::new(),
            port: None,
            health: HealthStatus::Unknown,
        }
    }
}

impl Resource for Export {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn health(&self) -> HealthStatus {
        self.health
    }
}

// =============================================================================
// Network Interfaces
// =============================================================================

/// Administrative link status
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum LinkStatus {
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "LINKED")]
    Linked,
    #[serde(rename = "NO-CARRIER")]
    NoCarrier,
}

/// Operational power state
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum PowerState {
    #[default]
    Unknown,
    Up,
    Down,
}

/// Static hardware identity of the PCI function behind an interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Human-readable controller name from lspci
    pub full_name: String,
    /// PCI address without the `0000:` domain (e.g. `03:00.1`)
    pub pci_slot: String,
    pub numa_id: String,
}

/// A non-loopback kernel network interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// `name` followed by `mac` without colons
    pub id: String,
    pub name: String,
    pub mac: String,
    /// `ip/prefixlen` in source order
    pub addresses: Vec<String>,
    pub status: LinkStatus,
    pub power: PowerState,
    /// Empty when unknown
    pub max_link_speed_mbps: String,
    /// Omitted once hoisted into a [`NetDevInfo`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
}

impl NetworkInterface {
    /// Interface id: name followed by the MAC with colons stripped
    pub fn compose_id(name: &str, mac: &str) -> String {
        format!("{}{}", name, mac.replace(':', ""))
    }

    /// PCI slot of the underlying device, empty if unresolved
    pub fn pci_slot(&self) -> &str {
        self.device_info
            .as_ref()
            .map(|info| info.pci_slot.as_str())
            .unwrap_or("")
    }
}

impl Resource for NetworkInterface {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// One physical network device with one or more ports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetDevInfo {
    pub id: String,
    pub full_name: String,
    pub pci_slot: String,
    pub numa_id: String,
    /// Member interfaces, without their `deviceInfo`
    pub ports: Vec<NetworkInterface>,
}

impl Resource for NetDevInfo {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

// =============================================================================
// System Probe Port
// =============================================================================

/// Outcome of a shell command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given status and stderr
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Stdout if the command exited with status 0
    pub fn into_stdout(self, command: &str) -> Result<String> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Port for all operating-system queries made by the scanners
///
/// Implementations must never panic; every failure is reported through the
/// returned `Result`.
pub trait SystemProbe: Send + Sync {
    /// Run a shell command line
    fn run(&self, command: &str) -> Result<CommandOutput>;

    /// Read a whole file as text
    fn read_file(&self, path: &Path) -> Result<String>;

    /// Names of all entries of a directory
    fn list_dir(&self, path: &Path) -> Result<Vec<String>>;

    /// Names of the directory-type entries of a directory
    fn list_subdirs(&self, path: &Path) -> Result<Vec<String>>;

    /// Run a command and require a zero exit status
    fn run_checked(&self, command: &str) -> Result<String> {
        self.run(command)?.into_stdout(command)
    }

    /// Read a file and trim surrounding whitespace
    fn read_trimmed(&self, path: &Path) -> Result<String> {
        Ok(self.read_file(path)?.trim().to_string())
    }
}

pub type SystemProbeRef = Arc<dyn SystemProbe>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_health_serialization() {
        assert_eq!(serde_json::to_string(&HealthStatus::Ok).unwrap(), "\"OK\"");
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"DEGRADED\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::default()).unwrap(),
            "\"UNKNOWN\""
        );
        assert_eq!(format!("{}", HealthStatus::Failed), "FAILED");
    }

    #[test]
    fn test_health_from_enabled_flag() {
        assert_eq!(HealthStatus::from_enabled_flag(1), HealthStatus::Ok);
        assert_eq!(HealthStatus::from_enabled_flag(0), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_enabled_flag(7), HealthStatus::Degraded);
        assert!(!HealthStatus::Unknown.is_confirmed());
        assert!(!HealthStatus::Failed.is_confirmed());
    }

    #[test]
    fn test_link_and_power_strings() {
        assert_eq!(
            serde_json::to_string(&LinkStatus::NoCarrier).unwrap(),
            "\"NO-CARRIER\""
        );
        assert_eq!(
            serde_json::to_string(&LinkStatus::Linked).unwrap(),
            "\"LINKED\""
        );
        assert_eq!(serde_json::to_string(&PowerState::Down).unwrap(), "\"DOWN\"");
    }

    #[test]
    fn test_export_serialization() {
        let export = Export::new(ExportProtocol::Nfs, "/mnt/testlib/ssss");
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "proto": "nfs",
                "exportPath": "/mnt/testlib/ssss",
                "clients": [],
                "health": "UNKNOWN"
            })
        );

        let mut export = Export::new(ExportProtocol::Nvmeof, "nqn.2023-01.io.test:sub1");
        export.port = Some("4420".into());
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["proto"], "nvmeof");
        assert_eq!(json["port"], "4420");
    }

    #[test]
    fn test_interface_id_and_device_info_omission() {
        assert_eq!(
            NetworkInterface::compose_id("docker12345", "02:42:22:be:b2:71"),
            "docker12345024222beb271"
        );

        let iface = NetworkInterface {
            id: "eth0aabb".into(),
            name: "eth0".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&iface).unwrap();
        assert!(json.get("deviceInfo").is_none());
        assert_eq!(json["maxLinkSpeedMbps"], "");
        assert_eq!(iface.pci_slot(), "");
    }

    #[test]
    fn test_command_output_into_stdout() {
        assert_eq!(
            CommandOutput::ok("x\n").into_stdout("echo x").unwrap(),
            "x\n"
        );
        assert_matches!(
            CommandOutput::failed(2, "boom\n").into_stdout("false"),
            Err(Error::CommandFailed { status: 2, ref stderr, .. }) if stderr == "boom"
        );
    }
}
