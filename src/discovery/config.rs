//! Scanner Configuration
//!
//! Every OS surface a scanner touches (command line or pseudo-filesystem
//! root) is configurable, so the same code can run against a chroot, a test
//! fixture or a host with non-standard tool names.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder substituted with the NVMe-oF service id
pub const PORT_PLACEHOLDER: &str = "{port}";

// =============================================================================
// Per-Scanner Sections
// =============================================================================

/// NFS export scanner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NfsConfig {
    pub enabled: bool,
    /// Only exports under this root are reported
    pub export_root: String,
    pub exportfs_command: String,
    /// Socket listing, already filtered for the NFS service
    pub socket_command: String,
    /// Service token as printed by the socket listing (`nfs` or `2049`)
    pub service: String,
}

impl Default for NfsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            export_root: "/mnt/testlib".to_string(),
            exportfs_command: "exportfs -s".to_string(),
            socket_command: "ss -tla | grep nfs".to_string(),
            service: "nfs".to_string(),
        }
    }
}

/// SCST iSCSI target scanner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScstConfig {
    pub enabled: bool,
    pub targets_path: PathBuf,
}

impl Default for ScstConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            targets_path: PathBuf::from("/sys/kernel/scst_tgt/targets/iscsi"),
        }
    }
}

/// NVMe-oF target scanner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NvmeofConfig {
    pub enabled: bool,
    /// nvmet configfs root
    pub nvmet_path: PathBuf,
    /// Socket listing template; `{port}` is replaced by the service id
    pub socket_command: String,
}

impl Default for NvmeofConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            nvmet_path: PathBuf::from("/sys/kernel/config/nvmet"),
            socket_command: "ss -tla | grep {port}".to_string(),
        }
    }
}

impl NvmeofConfig {
    pub fn ports_path(&self) -> PathBuf {
        self.nvmet_path.join("ports")
    }

    pub fn subsystems_path(&self) -> PathBuf {
        self.nvmet_path.join("subsystems")
    }

    /// Socket listing command for one service id
    pub fn socket_command_for(&self, port: &str) -> String {
        self.socket_command.replace(PORT_PLACEHOLDER, port)
    }
}

/// Network interface scanner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub enabled: bool,
    /// JSON-emitting interface listing
    pub ip_command: String,
    /// PCI listing with domain prefixes
    pub lspci_command: String,
    pub net_class_path: PathBuf,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ip_command: "ip -j a".to_string(),
            lspci_command: "lspci -D".to_string(),
            net_class_path: PathBuf::from("/sys/class/net"),
        }
    }
}

impl NetworkConfig {
    /// sysfs directory of one interface
    pub fn interface_path(&self, name: &str) -> PathBuf {
        self.net_class_path.join(name)
    }
}

// =============================================================================
// Scanner Configuration
// =============================================================================

/// Configuration for the inventory scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub nfs: NfsConfig,
    pub scst: ScstConfig,
    pub nvmeof: NvmeofConfig,
    pub network: NetworkConfig,
    /// File holding the host name
    pub hostname_path: PathBuf,
}

impl ScannerConfig {
    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ScannerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject settings that would make an enabled scanner meaningless
    pub fn validate(&self) -> Result<()> {
        if self.nfs.enabled {
            require_non_empty("nfs.export_root", &self.nfs.export_root)?;
            require_non_empty("nfs.exportfs_command", &self.nfs.exportfs_command)?;
            require_non_empty("nfs.service", &self.nfs.service)?;
        }

        if self.scst.enabled {
            require_non_empty_path("scst.targets_path", &self.scst.targets_path)?;
        }

        if self.nvmeof.enabled {
            require_non_empty_path("nvmeof.nvmet_path", &self.nvmeof.nvmet_path)?;
            if !self.nvmeof.socket_command.contains(PORT_PLACEHOLDER) {
                return Err(Error::Configuration(format!(
                    "nvmeof.socket_command must contain {}",
                    PORT_PLACEHOLDER
                )));
            }
        }

        if self.network.enabled {
            require_non_empty("network.ip_command", &self.network.ip_command)?;
            require_non_empty("network.lspci_command", &self.network.lspci_command)?;
            require_non_empty_path("network.net_class_path", &self.network.net_class_path)?;
        }

        Ok(())
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            nfs: NfsConfig::default(),
            scst: ScstConfig::default(),
            nvmeof: NvmeofConfig::default(),
            network: NetworkConfig::default(),
            hostname_path: PathBuf::from("/etc/hostname"),
        }
    }
}

fn require_non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Configuration(format!("{} must not be empty", key)));
    }
    Ok(())
}

fn require_non_empty_path(key: &str, value: &Path) -> Result<()> {
    if value.as_os_str().is_empty() {
        return Err(Error::Configuration(format!("{} must not be empty", key)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_scanner_config_defaults() {
        let config = ScannerConfig::default();

        assert!(config.nfs.enabled);
        assert_eq!(config.nfs.export_root, "/mnt/testlib");
        assert_eq!(config.nfs.service, "nfs");
        assert_eq!(
            config.scst.targets_path,
            PathBuf::from("/sys/kernel/scst_tgt/targets/iscsi")
        );
        assert_eq!(
            config.nvmeof.ports_path(),
            PathBuf::from("/sys/kernel/config/nvmet/ports")
        );
        assert_eq!(config.network.ip_command, "ip -j a");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_socket_command_substitution() {
        let config = NvmeofConfig::default();
        assert_eq!(config.socket_command_for("4420"), "ss -tla | grep 4420");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ScannerConfig::from_yaml_str(
            r#"
nfs:
  export_root: /srv/exports
  service: "2049"
network:
  enabled: false
"#,
        )
        .unwrap();

        assert_eq!(config.nfs.export_root, "/srv/exports");
        assert_eq!(config.nfs.service, "2049");
        assert_eq!(config.nfs.exportfs_command, "exportfs -s");
        assert!(!config.network.enabled);
        assert!(config.scst.enabled);
        assert_eq!(config.hostname_path, PathBuf::from("/etc/hostname"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let result = ScannerConfig::from_yaml_str("nvmeof:\n  socket_command: ss -tan\n");
        assert_matches!(result, Err(Error::Configuration(_)));

        let result = ScannerConfig::from_yaml_str("nfs:\n  export_root: \"\"\n");
        assert_matches!(result, Err(Error::Configuration(_)));

        // Disabled scanners are not validated
        let result = ScannerConfig::from_yaml_str(
            "nfs:\n  enabled: false\n  export_root: \"\"\n",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_malformed_yaml() {
        let result = ScannerConfig::from_yaml_str("nfs: [unterminated");
        assert_matches!(result, Err(Error::Yaml(_)));
    }
}
