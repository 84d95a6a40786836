//! # loopdown-system
//!
//! Host interactions for loopdown:
//! - Child process execution with capture, timeouts and signal escalation
//! - Installed application inventory
//! - Package receipts and installed detection
//! - Caching server discovery
//! - Disk space preflight
//! - Staging area lifecycle and cancellation
//! - Host-wide execution lock
//! - Download and install collaborators

pub mod acquire;
pub mod cache;
pub mod error;
pub mod inventory;
pub mod lock;
pub mod preflight;
pub mod process;
pub mod receipts;
pub mod staging;

pub use acquire::{AcquisitionPlan, AcquisitionReport, Downloader, Installer};
pub use cache::CacheDiscovery;
pub use error::{Error, ProcessError, Result};
pub use inventory::Inventory;
pub use lock::RunLock;
pub use process::{ProcessOutput, ProcessSpec};
pub use receipts::Receipts;
pub use staging::{run_staged, Shutdown, StagingArea};
