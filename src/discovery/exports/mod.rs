//! Storage Export Discovery
//!
//! Three independent scanners, one per export protocol. Each returns plain
//! [`Export`](crate::domain::Export) records and never fails: an unavailable
//! OS surface yields an empty list.
//!
//! | Scanner | Source                                   | Kept when           |
//! |---------|------------------------------------------|---------------------|
//! | NFS     | `exportfs -s`, socket listing            | always              |
//! | SCST    | `/sys/kernel/scst_tgt/targets/iscsi`     | `OK` or `DEGRADED`  |
//! | NVMe-oF | `/sys/kernel/config/nvmet`, socket list  | `OK` or `DEGRADED`  |

pub mod nfs;
pub mod nvmeof;
pub mod scst;

pub use nfs::scan_nfs;
pub use nvmeof::scan_nvmeof;
pub use scst::scan_scst;
