//! Run configuration and fixed constants
//!
//! The CLI layer builds a [`RunConfig`] from its arguments and calls
//! [`RunConfig::validate`] before anything touches the host.

use camino::Utf8PathBuf;
use std::time::Duration;

use crate::application::ShortName;
use crate::error::{Error, Result};
use crate::server::{validate_cache_server_url, validate_mirror_server_url};

/// Vendor content origin
pub const CONTENT_ORIGIN: &str = "https://audiocontentdownload.apple.com";

/// Host of the content origin, passed to caching servers on a cache miss
pub const CONTENT_ORIGIN_HOST: &str = "audiocontentdownload.apple.com";

/// Content directory used by the earlier content era
pub const CONTENT_DIR_2013: &str = "lp10_ms3_content_2013";

/// Content directory used by the later content era
pub const CONTENT_DIR_2016: &str = "lp10_ms3_content_2016";

/// Subdirectory of an application bundle holding its resource files
pub const RESOURCE_SUBDIR: &str = "Contents/Resources";

/// Default download destination
pub const DEFAULT_DESTINATION: &str = "/tmp/loopdown";

/// Default host-wide lock file
pub const DEFAULT_LOCK_FILE: &str = "/tmp/loopdown.lock";

/// Prefix of the per-run staging directory
pub const STAGING_PREFIX: &str = "loopdown.";

/// Application inventory tool
pub const SYSTEM_PROFILER: &str = "/usr/sbin/system_profiler";

/// Caching server locator tool
pub const ASSET_CACHE_LOCATOR: &str = "/usr/bin/AssetCacheLocatorUtil";

/// Package receipt and signature tool
pub const PKGUTIL: &str = "/usr/sbin/pkgutil";

/// Package installer
pub const INSTALLER: &str = "/usr/sbin/installer";

/// Transfer tool
pub const CURL: &str = "/usr/bin/curl";

/// Timeout for short discovery queries
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for a single package install
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// User agent sent with every transfer
pub fn user_agent() -> String {
    format!("loopdown/{}", env!("CARGO_PKG_VERSION"))
}

/// What a run does with the selected packages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Download into a staging area, install, then delete the staging area
    Deploy,
    /// Download into the destination and keep the files
    Download,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deploy => write!(f, "deploy"),
            Self::Download => write!(f, "download"),
        }
    }
}

/// Where package content is fetched from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServerChoice {
    /// The vendor content origin
    #[default]
    Origin,
    /// A caching server, either explicit or discovered at run time
    Cache(CacheServerChoice),
    /// A statically hosted mirror of the content tree
    Mirror(String),
}

impl ServerChoice {
    /// Build from the `--cache-server` and `--mirror-server` options, which are exclusive
    pub fn from_options(cache: Option<&str>, mirror: Option<&str>) -> Result<Self> {
        match (cache, mirror) {
            (Some(_), Some(_)) => Err(Error::conflicting_options(
                "--cache-server",
                "--mirror-server",
            )),
            (Some(cache), None) => Ok(Self::Cache(CacheServerChoice::parse(cache))),
            (None, Some(mirror)) => Ok(Self::Mirror(mirror.to_string())),
            (None, None) => Ok(Self::Origin),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheServerChoice {
    Auto,
    Explicit(String),
}

impl CacheServerChoice {
    /// Parse the `--cache-server` value; `auto` requests discovery
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Explicit(value.to_string())
        }
    }
}

/// Validated inputs for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: RunMode,
    pub applications: Vec<ShortName>,
    pub mandatory: bool,
    pub optional: bool,
    pub force: bool,
    pub dry_run: bool,
    pub server: ServerChoice,
    pub destination: Utf8PathBuf,
    pub keep_staging: bool,
}

impl RunConfig {
    /// Check option combinations before any side effect
    ///
    /// `is_root` is passed in so the check can be exercised without elevation.
    pub fn validate(&self, is_root: bool) -> Result<()> {
        if self.applications.is_empty() {
            return Err(Error::NoApplicationsSelected);
        }

        if !self.mandatory && !self.optional {
            return Err(Error::NoContentSelected);
        }

        match &self.server {
            ServerChoice::Cache(_) | ServerChoice::Mirror(_) if self.mode == RunMode::Download => {
                return Err(Error::conflicting_options(
                    "download",
                    "--cache-server/--mirror-server",
                ));
            }
            ServerChoice::Cache(CacheServerChoice::Explicit(url)) => {
                validate_cache_server_url(url)?;
            }
            ServerChoice::Mirror(url) => {
                validate_mirror_server_url(url)?;
            }
            _ => {}
        }

        if self.mode == RunMode::Deploy && !self.dry_run && !is_root {
            return Err(Error::privilege_required("installing packages"));
        }

        Ok(())
    }

    /// Installed packages are skipped only when installing without `--force`
    pub fn skips_installed(&self) -> bool {
        self.mode == RunMode::Deploy && !self.force
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deploy_config() -> RunConfig {
        RunConfig {
            mode: RunMode::Deploy,
            applications: vec![ShortName::GarageBand],
            mandatory: true,
            optional: false,
            force: false,
            dry_run: false,
            server: ServerChoice::Origin,
            destination: Utf8PathBuf::from(DEFAULT_DESTINATION),
            keep_staging: false,
        }
    }

    #[test]
    fn test_valid_deploy_as_root() {
        assert!(deploy_config().validate(true).is_ok());
    }

    #[test]
    fn test_no_content_selected() {
        let mut config = deploy_config();
        config.mandatory = false;
        assert!(matches!(
            config.validate(true),
            Err(Error::NoContentSelected)
        ));
    }

    #[test]
    fn test_no_applications_selected() {
        let mut config = deploy_config();
        config.applications.clear();
        assert!(matches!(
            config.validate(true),
            Err(Error::NoApplicationsSelected)
        ));
    }

    #[test]
    fn test_deploy_requires_root_unless_dry_run() {
        let mut config = deploy_config();
        assert!(matches!(
            config.validate(false),
            Err(Error::PrivilegeRequired { .. })
        ));

        config.dry_run = true;
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn test_download_rejects_server_options() {
        let mut config = deploy_config();
        config.mode = RunMode::Download;
        config.server = ServerChoice::Mirror("https://mirror.example.org".to_string());

        let err = config.validate(false).unwrap_err();
        assert!(err.is_validation());
        assert!(matches!(err, Error::ConflictingOptions { .. }));
    }

    #[test]
    fn test_invalid_explicit_cache_server() {
        let mut config = deploy_config();
        config.server = ServerChoice::Cache(CacheServerChoice::Explicit(
            "https://cache.example.org:49180".to_string(),
        ));
        assert!(matches!(
            config.validate(true),
            Err(Error::InvalidServerUrl { .. })
        ));
    }

    #[test]
    fn test_cache_server_choice_parse() {
        assert_eq!(CacheServerChoice::parse("AUTO"), CacheServerChoice::Auto);
        assert_eq!(
            CacheServerChoice::parse("http://10.0.0.1:49180"),
            CacheServerChoice::Explicit("http://10.0.0.1:49180".to_string())
        );
    }

    #[test]
    fn test_server_choice_from_options() {
        assert_eq!(
            ServerChoice::from_options(None, None).unwrap(),
            ServerChoice::Origin
        );
        assert_eq!(
            ServerChoice::from_options(Some("auto"), None).unwrap(),
            ServerChoice::Cache(CacheServerChoice::Auto)
        );
        assert!(matches!(
            ServerChoice::from_options(Some("auto"), Some("http://mirror.local")),
            Err(Error::ConflictingOptions { .. })
        ));
    }

    #[test]
    fn test_skips_installed() {
        let mut config = deploy_config();
        assert!(config.skips_installed());
        config.force = true;
        assert!(!config.skips_installed());
        config.force = false;
        config.mode = RunMode::Download;
        assert!(!config.skips_installed());
    }
}
