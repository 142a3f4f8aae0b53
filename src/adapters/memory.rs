//! In-Memory Probe
//!
//! A scripted [`SystemProbe`] for exercising scanners without a real host.
//! Files imply their parent directories, so a fixture only needs to list the
//! leaves it cares about.

use crate::domain::ports::{CommandOutput, SystemProbe};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Exit status reported for commands with no scripted output
const COMMAND_NOT_FOUND: i32 = 127;

/// Probe answering from scripted fixtures
#[derive(Debug, Default)]
pub struct InMemoryProbe {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    commands: HashMap<String, CommandOutput>,
    history: Mutex<Vec<String>>,
}

impl InMemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its parent directories
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            self.add_dir_recursive(parent);
        }
        self.files.insert(path, contents.into());
        self
    }

    /// Add an (empty) directory and its parents
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.add_dir_recursive(path.as_ref());
        self
    }

    /// Script a successful command
    pub fn with_command(self, command: &str, stdout: impl Into<String>) -> Self {
        self.with_command_output(command, CommandOutput::ok(stdout))
    }

    /// Script an arbitrary command outcome
    pub fn with_command_output(mut self, command: &str, output: CommandOutput) -> Self {
        self.commands.insert(command.to_string(), output);
        self
    }

    /// Commands run so far, in order
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    /// Whether a command was run at least once
    pub fn ran(&self, command: &str) -> bool {
        self.history.lock().iter().any(|c| c == command)
    }

    fn add_dir_recursive(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    fn children(&self, path: &Path) -> Result<(Vec<String>, Vec<String>)> {
        if !self.dirs.contains(path) {
            return Err(Error::ListFailed {
                path: path.to_path_buf(),
                reason: "No such file or directory".into(),
            });
        }

        let name_of = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .filter(|_| p.parent() == Some(path))
        };

        let subdirs = self.dirs.iter().filter_map(|d| name_of(d.as_path())).collect();
        let files = self.files.keys().filter_map(|f| name_of(f.as_path())).collect();
        Ok((subdirs, files))
    }
}

impl SystemProbe for InMemoryProbe {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        self.history.lock().push(command.to_string());

        Ok(self.commands.get(command).cloned().unwrap_or_else(|| {
            CommandOutput::failed(
                COMMAND_NOT_FOUND,
                format!("sh: {}: command not found", command),
            )
        }))
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        self.files.get(path).cloned().ok_or_else(|| Error::ReadFailed {
            path: path.to_path_buf(),
            reason: "No such file or directory".into(),
        })
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let (mut entries, files) = self.children(path)?;
        entries.extend(files);
        entries.sort();
        Ok(entries)
    }

    fn list_subdirs(&self, path: &Path) -> Result<Vec<String>> {
        let (subdirs, _) = self.children(path)?;
        Ok(subdirs)
    }
}
