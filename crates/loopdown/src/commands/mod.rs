//! Command implementations

pub mod deploy;
pub mod download;
pub mod run;
pub mod scan;
pub mod version;
