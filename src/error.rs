//! Error types for the host inventory scanner
//!
//! Every probe and parsing step returns these errors. Scanner entry points
//! absorb them and degrade to partial results, so they never reach the caller
//! of a `scan_*` function.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the scanner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Capability Errors
    // =========================================================================
    #[error("Failed to spawn command `{command}`: {reason}")]
    CommandSpawn { command: String, reason: String },

    #[error("Command `{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Failed to read {}: {reason}", .path.display())]
    ReadFailed { path: PathBuf, reason: String },

    #[error("Failed to list {}: {reason}", .path.display())]
    ListFailed { path: PathBuf, reason: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// A command, file read or directory listing failed or was unavailable
    Capability,
    /// Output did not have the expected text or JSON shape
    Parse,
    /// The scanner was configured with unusable values
    Configuration,
}

impl Error {
    /// Classify this error
    pub fn class(&self) -> FailureClass {
        match self {
            Error::CommandSpawn { .. }
            | Error::CommandFailed { .. }
            | Error::ReadFailed { .. }
            | Error::ListFailed { .. }
            | Error::Io(_) => FailureClass::Capability,

            Error::Parse(_) | Error::JsonParse(_) => FailureClass::Parse,

            Error::Configuration(_) | Error::Pattern(_) | Error::Yaml(_) => {
                FailureClass::Configuration
            }

            Error::Internal(_) => FailureClass::Capability,
        }
    }

    /// Check if the underlying OS surface was unavailable
    pub fn is_capability_failure(&self) -> bool {
        self.class() == FailureClass::Capability
    }

    /// Check if the data source answered with something we could not interpret
    pub fn is_parse_failure(&self) -> bool {
        self.class() == FailureClass::Parse
    }
}

/// Result type alias for the scanner
pub type Result<T> = std::result::Result<T, Error>;
