//! Download and install collaborators
//!
//! Transfers go through curl, whose own retry flags are the only retry
//! behaviour. A download counts only when the file exists and carries a
//! vendor signature. Installs go through the system installer, one package
//! at a time.

use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use loopdown_core::config::{user_agent, CURL, INSTALLER, INSTALL_TIMEOUT, PKGUTIL};
use loopdown_core::package::ContentPackage;
use loopdown_core::server::ContentServer;

use crate::error::Result;
use crate::process::{self, ProcessSpec};

/// Line `pkgutil --check-signature` prints for vendor-signed packages
pub const SIGNED_STATUS: &str = "Status: signed Apple Software";

const CURL_ARGS: &[&str] = &[
    "-L",
    "--fail",
    "--retry",
    "3",
    "--retry-delay",
    "2",
    "--retry-all-errors",
    "--connect-timeout",
    "20",
    "--speed-limit",
    "300",
    "--speed-time",
    "30",
    "--progress-bar",
    "--create-dirs",
    "--remote-time",
];

const SIGNATURE_TIMEOUT: Duration = Duration::from_secs(60);

/// One package to fetch: where from and where to
#[derive(Debug, Clone)]
pub struct AcquisitionItem {
    pub package: ContentPackage,
    pub url: Url,
    pub destination: Utf8PathBuf,
}

/// Ordered work handed to the downloader and installer
#[derive(Debug, Clone)]
pub struct AcquisitionPlan {
    pub server: ContentServer,
    pub items: Vec<AcquisitionItem>,
    /// Reinstall even when a package is already installed
    pub force: bool,
}

impl AcquisitionPlan {
    /// Resolve URLs and destinations under `root`, keeping package order
    pub fn build(
        server: ContentServer,
        packages: &[ContentPackage],
        root: &Utf8Path,
        force: bool,
    ) -> Result<Self> {
        let items = packages
            .iter()
            .map(|pkg| -> Result<AcquisitionItem> {
                Ok(AcquisitionItem {
                    url: server.package_url(pkg)?,
                    destination: root.join(&pkg.download_path),
                    package: pkg.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            server,
            items,
            force,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Outcome counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionReport {
    pub downloaded: usize,
    /// Already present with a valid signature, not fetched again
    pub existing: usize,
    pub download_failures: usize,
    pub installed: usize,
    pub install_failures: usize,
}

impl AcquisitionReport {
    pub fn failures(&self) -> usize {
        self.download_failures + self.install_failures
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}

/// Outcome of fetching one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    Existing,
    Failed,
}

/// curl-backed transfers with signature verification
#[derive(Debug, Clone)]
pub struct Downloader {
    curl: String,
    pkgutil: String,
    quiet: bool,
    columns: Option<u16>,
}

impl Default for Downloader {
    fn default() -> Self {
        Self {
            curl: CURL.to_string(),
            pkgutil: PKGUTIL.to_string(),
            quiet: false,
            columns: None,
        }
    }
}

impl Downloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_curl(mut self, curl: impl Into<String>) -> Self {
        self.curl = curl.into();
        self
    }

    pub fn with_pkgutil(mut self, pkgutil: impl Into<String>) -> Self {
        self.pkgutil = pkgutil.into();
        self
    }

    /// Suppress curl's progress output
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Terminal width for curl's progress bar
    pub fn with_columns(mut self, columns: u16) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Full curl argument vector for one item
    pub fn curl_args(&self, item: &AcquisitionItem) -> Vec<String> {
        let mut args = vec![
            self.curl.clone(),
            "--user-agent".to_string(),
            user_agent(),
        ];
        args.extend(CURL_ARGS.iter().map(|s| s.to_string()));

        if self.quiet {
            args.push("--silent".to_string());
        }

        args.push("-o".to_string());
        args.push(item.destination.to_string());
        args.push(item.url.to_string());
        args
    }

    /// Fetch one item unless a signed copy is already in place
    pub async fn download(&self, item: &AcquisitionItem) -> DownloadOutcome {
        if self.is_downloaded(&item.destination).await {
            info!("{} already downloaded", item.package.name);
            return DownloadOutcome::Existing;
        }

        let mut spec = ProcessSpec::new(self.curl_args(item)).capture(false);
        if let Some(columns) = self.columns {
            spec = spec.env("COLUMNS", columns.to_string());
        }

        match process::run(spec).await {
            Ok(output) if output.success() => {}
            Ok(output) => {
                error!(
                    "Download of {} failed (curl exit code {})",
                    item.package.name, output.code
                );
                return DownloadOutcome::Failed;
            }
            Err(e) => {
                error!("Download of {} failed: {}", item.package.name, e);
                return DownloadOutcome::Failed;
            }
        }

        if self.is_downloaded(&item.destination).await {
            DownloadOutcome::Downloaded
        } else {
            error!(
                "{} is missing or not signed after download",
                item.destination
            );
            DownloadOutcome::Failed
        }
    }

    /// File exists and carries a vendor signature
    pub async fn is_downloaded(&self, path: &Utf8Path) -> bool {
        path.exists() && self.check_signature(path).await
    }

    async fn check_signature(&self, path: &Utf8Path) -> bool {
        let spec = ProcessSpec::new([self.pkgutil.as_str(), "--check-signature", path.as_str()])
            .timeout(SIGNATURE_TIMEOUT);

        match process::run(spec).await {
            Ok(output) => {
                let signed = signature_is_vendor(&output.stdout_lossy());
                if !signed {
                    debug!("{} is not vendor signed: {}", path, output.stderr_lossy().trim());
                }
                signed
            }
            Err(e) => {
                debug!("Signature check of {} failed: {}", path, e);
                false
            }
        }
    }
}

/// Whether `pkgutil --check-signature` output reports a vendor signature
pub fn signature_is_vendor(output: &str) -> bool {
    output.lines().any(|line| line.trim() == SIGNED_STATUS)
}

/// System installer wrapper
#[derive(Debug, Clone)]
pub struct Installer {
    installer: String,
    timeout: Duration,
}

impl Default for Installer {
    fn default() -> Self {
        Self {
            installer: INSTALLER.to_string(),
            timeout: INSTALL_TIMEOUT,
        }
    }
}

impl Installer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installer(mut self, installer: impl Into<String>) -> Self {
        self.installer = installer.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Install one package onto the boot volume
    pub async fn install(&self, pkg_file: &Utf8Path) -> bool {
        let spec = ProcessSpec::new([
            self.installer.as_str(),
            "-pkg",
            pkg_file.as_str(),
            "-target",
            "/",
        ])
        .check(true)
        .timeout(self.timeout);

        match process::run(spec).await {
            Ok(output) => install_succeeded(&output.stdout_lossy()),
            Err(e) => {
                debug!("Install of {} failed: {}", pkg_file, e);
                false
            }
        }
    }
}

/// The text after the last `": "` of the final line mentions success
///
/// e.g. `installer: The install was successful.`
pub fn install_succeeded(output: &str) -> bool {
    let Some(last) = output.lines().rev().find(|line| !line.trim().is_empty()) else {
        return false;
    };

    let message = last.rsplit(": ").next().unwrap_or(last).trim();
    message.contains(" success")
}

/// Fetch every item into its destination and keep the files
pub async fn download_only(plan: &AcquisitionPlan, downloader: &Downloader) -> AcquisitionReport {
    let mut report = AcquisitionReport::default();

    for (idx, item) in plan.items.iter().enumerate() {
        info!(
            "Downloading {} of {}: {} ({})",
            idx + 1,
            plan.len(),
            item.package.name,
            item.package.download_size.human()
        );

        match downloader.download(item).await {
            DownloadOutcome::Downloaded => report.downloaded += 1,
            DownloadOutcome::Existing => report.existing += 1,
            DownloadOutcome::Failed => report.download_failures += 1,
        }
    }

    report
}

/// Fetch and install every item, deleting each artifact once installed
pub async fn download_and_install(
    plan: &AcquisitionPlan,
    downloader: &Downloader,
    installer: &Installer,
) -> AcquisitionReport {
    let mut report = AcquisitionReport::default();

    if plan.force {
        debug!("Reinstalling packages regardless of installed state");
    }

    for (idx, item) in plan.items.iter().enumerate() {
        info!(
            "Processing {} of {}: {} ({} download, {} installed)",
            idx + 1,
            plan.len(),
            item.package.name,
            item.package.download_size.human(),
            item.package.installed_size.human()
        );

        match downloader.download(item).await {
            DownloadOutcome::Downloaded => report.downloaded += 1,
            DownloadOutcome::Existing => report.existing += 1,
            DownloadOutcome::Failed => {
                report.download_failures += 1;
                continue;
            }
        }

        if installer.install(&item.destination).await {
            info!("Installed {}", item.package.name);
            report.installed += 1;

            if let Err(e) = std::fs::remove_file(&item.destination) {
                warn!("Could not remove {}: {}", item.destination, e);
            }
        } else {
            error!("Install of {} failed", item.package.name);
            report.install_failures += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> AcquisitionItem {
        let pkg = ContentPackage::new("com.apple.pkg.Test", "../lp10_ms3_content_2016/Test.pkg").unwrap();
        let plan = AcquisitionPlan::build(
            ContentServer::Origin,
            &[pkg],
            Utf8Path::new("/tmp/loopdown"),
            false,
        )
        .unwrap();
        plan.items.into_iter().next().unwrap()
    }

    #[test]
    fn test_plan_destinations_and_urls() {
        let item = item();
        assert_eq!(
            item.destination,
            Utf8PathBuf::from("/tmp/loopdown/lp10_ms3_content_2016/Test.pkg")
        );
        assert_eq!(
            item.url.as_str(),
            "https://audiocontentdownload.apple.com/lp10_ms3_content_2016/Test.pkg"
        );
    }

    #[test]
    fn test_curl_args() {
        let item = item();
        let args = Downloader::new().curl_args(&item);

        assert_eq!(args[0], CURL);
        assert!(args.contains(&"--retry-all-errors".to_string()));
        assert!(!args.contains(&"--silent".to_string()));
        assert_eq!(args[args.len() - 1], item.url.to_string());
        assert_eq!(args[args.len() - 2], item.destination.to_string());
        assert_eq!(args[args.len() - 3], "-o");

        let quiet = Downloader::new().quiet(true).curl_args(&item);
        assert!(quiet.contains(&"--silent".to_string()));
    }

    #[test]
    fn test_signature_is_vendor() {
        let signed = "Package \"Test.pkg\":\n   Status: signed Apple Software\n   Certificate Chain:\n";
        assert!(signature_is_vendor(signed));
        assert!(!signature_is_vendor("Package \"Test.pkg\":\n   Status: no signature\n"));
    }

    #[test]
    fn test_install_succeeded() {
        assert!(install_succeeded(
            "installer: Package name is Test\ninstaller: Installing at base path /\ninstaller: The install was successful.\n"
        ));
        assert!(!install_succeeded("installer: The install failed.\n"));
        assert!(!install_succeeded(""));
    }

    #[test]
    fn test_report_failures() {
        let report = AcquisitionReport {
            download_failures: 1,
            install_failures: 2,
            ..Default::default()
        };
        assert_eq!(report.failures(), 3);
        assert!(!report.is_success());
        assert!(AcquisitionReport::default().is_success());
    }
}
