//! Shared deploy/download pipeline
//!
//! lock → discovery → selection → installed filter → preflight → server
//! resolution → staging → download/install

use anyhow::{bail, Result};
use camino::Utf8PathBuf;
use nix::unistd::Uid;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use loopdown_core::selection::{merge_applications, without_installed, PackageStats, Selection};
use loopdown_core::server::{normalize_cache_url, validate_cache_server_url, validate_mirror_server_url};
use loopdown_core::{
    CacheServerChoice, ContentPackage, ContentServer, Error as CoreError, RunConfig, RunMode,
    ServerChoice,
};
use loopdown_system::acquire::{download_and_install, download_only};
use loopdown_system::inventory::filter_requested;
use loopdown_system::{
    preflight, run_staged, AcquisitionPlan, AcquisitionReport, CacheDiscovery, Downloader,
    Installer, Inventory, Receipts, RunLock, Shutdown, StagingArea,
};

use crate::output;

/// Everything a deploy or download run needs
pub struct RunContext {
    pub config: RunConfig,
    pub lock_file: Utf8PathBuf,
    pub quiet: bool,
    pub shutdown: Shutdown,
}

pub async fn execute(ctx: RunContext) -> Result<()> {
    let RunContext {
        config,
        lock_file,
        quiet,
        shutdown,
    } = ctx;

    config.validate(Uid::effective().is_root())?;

    let _lock = RunLock::acquire(&lock_file)?;
    let run_id = Uuid::new_v4();
    info!("Starting {} run {}", config.mode, run_id);
    debug!("Holding run lock {}", lock_file);

    let packages = select_packages(&config, quiet).await?;
    if packages.is_empty() {
        output::success("Nothing to do: all requested packages are already in place");
        return Ok(());
    }

    let stats = PackageStats::collect(&packages);
    let server = resolve_server(&config.server, config.mode).await?;

    if config.dry_run {
        return dry_run(&config, &packages, &stats, server);
    }

    let report = match config.mode {
        RunMode::Download => {
            preflight::check(&packages, &config.destination)?;
            let plan = AcquisitionPlan::build(server, &packages, &config.destination, false)?;
            download_only(&plan, &downloader(quiet)).await
        }
        RunMode::Deploy => {
            let staging =
                StagingArea::create_checked(&packages, &config.destination, config.keep_staging)?;

            let downloader = downloader(quiet);
            let installer = Installer::new();
            let force = config.force;

            run_staged(&staging, &shutdown, |dir| async move {
                let plan = AcquisitionPlan::build(server, &packages, &dir, force)?;
                Ok(download_and_install(&plan, &downloader, &installer).await)
            })
            .await?
        }
    };

    finish(config.mode, &report)
}

/// Inventory, selection and (for deploy) the installed filter
async fn select_packages(config: &RunConfig, quiet: bool) -> Result<Vec<ContentPackage>> {
    let spinner = (!quiet).then(|| output::spinner("Looking for installed applications..."));
    let apps = filter_requested(
        Inventory::new().resolve_installed().await,
        &config.applications,
    );
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if apps.is_empty() {
        bail!(
            "None of the requested applications are installed: {}",
            config
                .applications
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    for app in &apps {
        info!("Found {} {} at {}", app.name, app.version, app.path.display());
    }

    let packages = merge_applications(&apps, Selection::new(config.mandatory, config.optional));
    info!("{} package(s) selected", packages.len());

    if !config.skips_installed() {
        return Ok(packages);
    }

    let receipts = Receipts::new();
    let mut installed = HashSet::new();
    for pkg in &packages {
        if receipts.is_installed(pkg).await {
            debug!("{} is already installed", pkg.name);
            installed.insert(pkg.package_id.clone());
        }
    }

    if !installed.is_empty() {
        info!("Skipping {} installed package(s)", installed.len());
    }

    Ok(without_installed(packages, |pkg| {
        installed.contains(&pkg.package_id)
    }))
}

/// Content server for this run
///
/// Download runs always use the origin. Deploy runs prefer a mirror, then an
/// explicit caching server, then a discovered one.
pub async fn resolve_server(choice: &ServerChoice, mode: RunMode) -> Result<ContentServer> {
    if mode == RunMode::Download {
        return Ok(ContentServer::Origin);
    }

    let server = match choice {
        ServerChoice::Origin => ContentServer::Origin,
        ServerChoice::Mirror(raw) => ContentServer::Mirror(validate_mirror_server_url(raw)?),
        ServerChoice::Cache(CacheServerChoice::Explicit(raw)) => {
            ContentServer::Cache(normalize_cache_url(&validate_cache_server_url(raw)?))
        }
        ServerChoice::Cache(CacheServerChoice::Auto) => discover_cache_server().await?,
    };

    info!("Content server: {}", server);
    Ok(server)
}

async fn discover_cache_server() -> Result<ContentServer> {
    match CacheDiscovery::new().discover().await? {
        Some(url) => Ok(ContentServer::Cache(normalize_cache_url(&url))),
        None => {
            warn!("No caching server found, using the content origin");
            Ok(ContentServer::Origin)
        }
    }
}

fn downloader(quiet: bool) -> Downloader {
    let downloader = Downloader::new().quiet(quiet);
    match output::progress_columns() {
        Some(columns) => downloader.with_columns(columns),
        None => downloader,
    }
}

fn dry_run(
    config: &RunConfig,
    packages: &[ContentPackage],
    stats: &PackageStats,
    server: ContentServer,
) -> Result<()> {
    let plan = AcquisitionPlan::build(server, packages, &config.destination, config.force)?;

    output::header("Packages");
    for item in &plan.items {
        let class = if item.package.mandatory {
            "mandatory"
        } else {
            "optional"
        };
        output::kv(
            &item.package.name,
            &format!("{} ({}, {})", item.url, class, item.package.download_size.human()),
        );
    }

    output::package_summary("Dry run summary", stats);

    match preflight::check(packages, &config.destination) {
        Ok(()) => Ok(()),
        Err(loopdown_system::Error::Core(e @ CoreError::InsufficientSpace { .. })) => {
            output::warning(&e.to_string());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn finish(mode: RunMode, report: &AcquisitionReport) -> Result<()> {
    output::header("Summary");
    output::kv("Downloaded", &report.downloaded.to_string());
    if report.existing > 0 {
        output::kv("Already downloaded", &report.existing.to_string());
    }
    if mode == RunMode::Deploy {
        output::kv("Installed", &report.installed.to_string());
    }

    if !report.is_success() {
        bail!(
            "{} download failure(s), {} install failure(s)",
            report.download_failures,
            report.install_failures
        );
    }

    output::success(&format!("{} complete", mode));
    Ok(())
}
