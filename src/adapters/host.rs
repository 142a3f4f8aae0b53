//! Host Probe
//!
//! Queries the local machine. Commands run through `sh -c` so that pipelines
//! such as `ss -tla | grep nfs` behave as they would in a terminal.

use crate::domain::ports::{CommandOutput, SystemProbe};
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::trace;

const SHELL: &str = "sh";

/// Probe backed by the real operating system
#[derive(Debug, Clone, Default)]
pub struct HostProbe;

impl HostProbe {
    pub fn new() -> Self {
        Self
    }
}

impl SystemProbe for HostProbe {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        trace!("Running `{}`", command);

        let output = Command::new(SHELL)
            .args(["-c", command])
            .output()
            .map_err(|e| Error::CommandSpawn {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CommandOutput {
            // Killed by a signal
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let list_err = |e: std::io::Error| Error::ListFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(path).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }

    fn list_subdirs(&self, path: &Path) -> Result<Vec<String>> {
        let list_err = |e: std::io::Error| Error::ListFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(path).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            // Follows symlinks; configfs and sysfs link heavily
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        Ok(names)
    }
}
