//! # loopdown-core
//!
//! Core library for loopdown providing:
//! - Audio content package records decoded from application property lists
//! - Application model and resource file discovery
//! - Mandatory/optional selection and cross-application merge
//! - Content server URLs (origin, caching server, mirror)
//! - Run configuration and option validation

pub mod application;
pub mod config;
pub mod error;
pub mod package;
pub mod selection;
pub mod server;
pub mod size;
pub mod utils;
pub mod version;

pub use application::{Application, ShortName};
pub use config::{CacheServerChoice, RunConfig, RunMode, ServerChoice};
pub use error::{Error, Result};
pub use package::{ContentPackage, PackageLists};
pub use selection::{PackageStats, Selection};
pub use server::ContentServer;
pub use size::ByteSize;
pub use version::PackageVersion;
