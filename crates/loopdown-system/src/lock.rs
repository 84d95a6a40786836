//! Host-wide execution lock
//!
//! An advisory exclusive lock on a well-known file keeps two runs from
//! installing at the same time. The lock is never waited on.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{File, OpenOptions, Permissions};
use std::os::unix::fs::PermissionsExt;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Any user may open the lock file, so runs under different accounts still exclude each other
const LOCK_MODE: u32 = 0o666;

/// Held lock; released and closed on drop
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: Utf8PathBuf,
}

impl RunLock {
    /// Take the lock or fail with `AlreadyRunning`
    pub fn acquire(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if let Err(e) = file.set_permissions(Permissions::from_mode(LOCK_MODE)) {
            debug!("Could not set permissions on {}: {}", path, e);
        }

        match fs4::fs_std::FileExt::try_lock_exclusive(&file) {
            Ok(true) => {
                debug!("Acquired run lock {}", path);
                Ok(Self { file, path })
            }
            Ok(false) => Err(Error::already_running(path)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(Error::already_running(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs4::fs_std::FileExt::unlock(&self.file) {
            warn!("Failed to release run lock {}: {}", self.path, e);
        }
    }
}
