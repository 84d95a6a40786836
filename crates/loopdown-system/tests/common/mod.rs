//! Common test utilities for loopdown-system
//!
//! Fake host tools (written as shell scripts into a temporary directory) and
//! package builders so the host collaborators can run end to end on any Unix.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod constants;
pub mod fixtures;

pub use builders::*;
pub use constants::*;
pub use fixtures::*;
