//! Scan command
//!
//! Prints the supported applications found on this host and every package
//! they list, grouped per application, as JSON on stdout.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use loopdown_core::selection::{group_by_application, ApplicationPackages, Selection};
use loopdown_core::Application;
use loopdown_system::Inventory;

use crate::cli::ScanArgs;
use crate::output;

/// Schema version of the scan document
pub const SCAN_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub mode: &'static str,
    pub generated_at: String,
    pub apps: Vec<ApplicationPackages>,
    #[serde(rename = "_version")]
    pub version: &'static str,
}

impl ScanReport {
    pub fn new(apps: &[Application], generated_at: DateTime<Utc>) -> Self {
        Self {
            mode: "scan",
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            apps: group_by_application(apps, Selection::all()),
            version: SCAN_SCHEMA_VERSION,
        }
    }
}

pub async fn run(_args: ScanArgs, quiet: bool) -> Result<()> {
    let spinner = (!quiet).then(|| output::spinner("Scanning installed applications..."));
    let apps = Inventory::new().resolve_installed().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    info!("Found {} supported application(s)", apps.len());

    let report = ScanReport::new(&apps, Utc::now());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
