//! Installed application inventory
//!
//! Asks `system_profiler` for the application inventory once and keeps the
//! supported audio applications, in inventory order.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

use loopdown_core::application::{parse_last_modified, Application, ShortName};
use loopdown_core::config::SYSTEM_PROFILER;

use crate::error::Result;
use crate::process::{self, ProcessSpec};

/// A full-detail inventory walks every bundle on the system
const PROFILER_TIMEOUT: Duration = Duration::from_secs(300);

const DATA_TYPE: &str = "SPApplicationsDataType";

#[derive(Debug, Deserialize)]
struct InventoryRecord {
    #[serde(rename = "_name")]
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(rename = "lastModified", default)]
    last_modified: Option<String>,
}

/// Source of installed applications
#[derive(Debug, Clone)]
pub struct Inventory {
    profiler: String,
    timeout: Duration,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            profiler: SYSTEM_PROFILER.to_string(),
            timeout: PROFILER_TIMEOUT,
        }
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different inventory tool
    pub fn with_profiler(mut self, profiler: impl Into<String>) -> Self {
        self.profiler = profiler.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Supported applications installed on this host
    ///
    /// Any failure to run the tool or read its output yields an empty list.
    pub async fn resolve_installed(&self) -> Vec<Application> {
        let spec = ProcessSpec::new([
            self.profiler.as_str(),
            "-json",
            "-detaillevel",
            "full",
            DATA_TYPE,
        ])
        .check(true)
        .timeout(self.timeout);

        let output = match process::run(spec).await {
            Ok(output) => output,
            Err(e) => {
                error!("Application inventory failed: {}", e);
                return Vec::new();
            }
        };

        match parse_inventory(&output.stdout) {
            Ok(apps) => {
                debug!("Inventory found {} supported application(s)", apps.len());
                apps
            }
            Err(e) => {
                error!("Application inventory could not be decoded: {}", e);
                Vec::new()
            }
        }
    }
}

/// Decode `system_profiler -json SPApplicationsDataType` output
pub fn parse_inventory(json: &[u8]) -> Result<Vec<Application>> {
    let payload: serde_json::Value = serde_json::from_slice(json)?;

    let records = match payload.get(DATA_TYPE).and_then(|v| v.as_array()) {
        Some(records) => records,
        None => {
            warn!("Inventory output has no {} array", DATA_TYPE);
            return Ok(Vec::new());
        }
    };

    let mut apps = Vec::new();

    for value in records {
        let record: InventoryRecord = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping inventory record: {}", e);
                continue;
            }
        };

        let Some(short_name) = ShortName::from_display_name(&record.name) else {
            continue;
        };

        if let Some(app) = application_from_record(record, short_name) {
            apps.push(app);
        }
    }

    Ok(apps)
}

fn application_from_record(record: InventoryRecord, short_name: ShortName) -> Option<Application> {
    let path = match record.path.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => {
            warn!("{} has no install path, skipping", record.name);
            return None;
        }
    };

    let raw_modified = record.last_modified.unwrap_or_default();
    let Some(last_modified) = parse_last_modified(&raw_modified) else {
        warn!(
            "{} has an unreadable last modified value '{}', skipping",
            record.name, raw_modified
        );
        return None;
    };

    Some(Application::new(
        record.name,
        record.version.unwrap_or_default(),
        path,
        last_modified,
        short_name,
    ))
}

/// Keep the applications whose short name was requested, in inventory order
pub fn filter_requested(apps: Vec<Application>, requested: &[ShortName]) -> Vec<Application> {
    apps.into_iter()
        .filter(|app| requested.contains(&app.short_name))
        .collect()
}
