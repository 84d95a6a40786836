//! Version command

use anyhow::Result;
use serde::Serialize;
use std::fmt;

use loopdown_core::config::user_agent;

use crate::cli::VersionArgs;

/// Build and identity information
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub commit: Option<String>,
    pub build_date: Option<String>,
    pub target: Option<String>,
    /// Sent with every content request
    pub user_agent: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("GIT_SHA").map(String::from),
            build_date: option_env!("BUILD_DATE").map(String::from),
            target: option_env!("TARGET").map(String::from),
            user_agent: user_agent(),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loopdown {}", self.version)?;
        if let Some(commit) = &self.commit {
            write!(f, " ({})", commit)?;
        }
        Ok(())
    }
}

pub fn run(args: VersionArgs) -> Result<()> {
    let info = VersionInfo::current();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", info);
    if let Some(date) = &info.build_date {
        println!("Build date: {}", date);
    }
    if let Some(target) = &info.target {
        println!("Target:     {}", target);
    }

    Ok(())
}
