//! System Probe Adapters
//!
//! Implementations of the [`SystemProbe`](crate::domain::SystemProbe) port.
//!
//! - [`HostProbe`]: the real machine (`sh -c`, `std::fs`)
//! - [`InMemoryProbe`]: scripted files, directories and command outputs

pub mod host;
pub mod memory;

pub use host::HostProbe;
pub use memory::InMemoryProbe;
