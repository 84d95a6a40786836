//! Staging area lifecycle and cancellation
//!
//! Deploy runs download into a private temporary directory that must not
//! outlive the run. Cleanup happens on normal completion, on error, on
//! unwinding and when a [`Shutdown`] is triggered, and only the first of
//! those deletes anything.

use camino::{Utf8Path, Utf8PathBuf};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use loopdown_core::config::STAGING_PREFIX;
use loopdown_core::ContentPackage;

use crate::error::{Error, Result};
use crate::preflight;

/// Cancellation request carrying the signal that caused it
///
/// The binary translates OS signals into [`Shutdown::trigger`]; everything
/// below it only observes the token.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    signal: Arc<OnceLock<i32>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the first signal recorded wins
    pub fn trigger(&self, signal: i32) {
        if self.signal.set(signal).is_ok() {
            debug!("Shutdown requested by signal {}", signal);
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal that triggered the shutdown, if any
    pub fn signal(&self) -> Option<i32> {
        self.signal.get().copied()
    }

    /// Resolves once a shutdown has been triggered
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    fn interrupted(&self) -> Error {
        Error::Interrupted {
            signal: self.signal().unwrap_or(0),
        }
    }
}

/// Per-run temporary directory, removed exactly once
#[derive(Debug)]
pub struct StagingArea {
    path: Utf8PathBuf,
    retain: bool,
    cleaned: AtomicBool,
}

impl StagingArea {
    /// Check free space under `parent`, then create the staging directory there
    ///
    /// Nothing is created when the packages do not fit.
    pub fn create_checked(
        packages: &[ContentPackage],
        parent: &Utf8Path,
        retain: bool,
    ) -> Result<Self> {
        preflight::check(packages, parent)?;
        Self::create_in(parent, retain)
    }

    /// Create the staging directory under `parent`
    pub fn create_in(parent: impl AsRef<std::path::Path>, retain: bool) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)?
            .keep();

        let path = Utf8PathBuf::from_path_buf(dir).map_err(|p| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("staging path is not UTF-8: {}", p.display()),
            )
        })?;

        info!("Created staging area {}", path);

        Ok(Self {
            path,
            retain,
            cleaned: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Remove the directory; returns true only for the call that did the work
    pub fn cleanup(&self) -> bool {
        if self.cleaned.swap(true, Ordering::AcqRel) {
            return false;
        }

        if self.retain {
            info!("Keeping staging area {}", self.path);
            return true;
        }

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed staging area {}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staging area {}: {}", self.path, e),
        }

        true
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Run `work` against the staging area until it finishes or a shutdown fires
///
/// The staging area is cleaned up either way. On shutdown the work future is
/// dropped (child processes are killed with it) and `Interrupted` is returned.
pub async fn run_staged<T, F, Fut>(staging: &StagingArea, shutdown: &Shutdown, work: F) -> Result<T>
where
    F: FnOnce(Utf8PathBuf) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if shutdown.is_triggered() {
        staging.cleanup();
        return Err(shutdown.interrupted());
    }

    let result = tokio::select! {
        result = work(staging.path().to_path_buf()) => result,
        _ = shutdown.cancelled() => {
            warn!("Interrupted, cleaning up {}", staging.path());
            Err(shutdown.interrupted())
        }
    };

    staging.cleanup();
    result
}
