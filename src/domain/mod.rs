//! Domain layer - Resource model and port definitions
//!
//! This module defines the records produced by the scanners and the
//! capability trait (port) that adapters implement.

pub mod ports;

pub use ports::*;
