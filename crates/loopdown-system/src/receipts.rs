//! Package receipts and installed detection

use std::path::Path;
use std::time::Duration;
use tracing::debug;

use loopdown_core::config::{DISCOVERY_TIMEOUT, PKGUTIL};
use loopdown_core::package::ContentPackage;
use loopdown_core::utils::expand_tilde;
use loopdown_core::version::PackageVersion;

use crate::process::{self, ProcessSpec};

/// Installed-state checks backed by the package receipt database
#[derive(Debug, Clone)]
pub struct Receipts {
    pkgutil: String,
    timeout: Duration,
}

impl Default for Receipts {
    fn default() -> Self {
        Self {
            pkgutil: PKGUTIL.to_string(),
            timeout: DISCOVERY_TIMEOUT,
        }
    }
}

impl Receipts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pkgutil(mut self, pkgutil: impl Into<String>) -> Self {
        self.pkgutil = pkgutil.into();
        self
    }

    /// Receipt version of an installed package; any failure means not installed
    pub async fn installed_version(&self, package_id: &str) -> Option<String> {
        let spec = ProcessSpec::new([self.pkgutil.as_str(), "--pkg-info-plist", package_id])
            .check(true)
            .timeout(self.timeout);

        let output = match process::run(spec).await {
            Ok(output) => output,
            Err(e) => {
                debug!("No receipt for {}: {}", package_id, e);
                return None;
            }
        };

        parse_receipt_version(&output.stdout)
    }

    /// Whether the package is present on disk at a satisfying version
    pub async fn is_installed(&self, pkg: &ContentPackage) -> bool {
        if !file_check_passes(&pkg.file_check) {
            return false;
        }

        let Some(required) = pkg.version.as_deref() else {
            return true;
        };

        match self.installed_version(&pkg.package_id).await {
            Some(installed) => version_satisfies(&installed, required),
            None => false,
        }
    }
}

/// `pkg-version` from `pkgutil --pkg-info-plist` output
pub fn parse_receipt_version(plist_bytes: &[u8]) -> Option<String> {
    let value = match plist::Value::from_reader(std::io::Cursor::new(plist_bytes)) {
        Ok(value) => value,
        Err(e) => {
            debug!("Unreadable receipt: {}", e);
            return None;
        }
    };

    value
        .as_dictionary()
        .and_then(|dict| dict.get("pkg-version"))
        .and_then(|v| v.as_string())
        .map(str::to_string)
}

/// At least one sentinel path exists; an empty list never passes
pub fn file_check_passes(paths: &[String]) -> bool {
    paths.iter().any(|raw| {
        let path = expand_tilde(raw);
        exists(&path)
    })
}

fn exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}

/// Prefix-floor comparison of a receipt version against a required version
pub fn version_satisfies(installed: &str, required: &str) -> bool {
    PackageVersion::parse(installed).satisfies(&PackageVersion::parse(required))
}
