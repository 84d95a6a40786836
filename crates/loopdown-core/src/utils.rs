//! Shared utility functions for loopdown crates

use anyhow::anyhow;
use std::path::{Path, PathBuf};

/// Get the invoking user's home directory
///
/// `HOME` wins over `dirs::home_dir()` so that sudo environments which keep
/// the caller's home resolve file-check paths the same way the shell does.
pub fn get_home_dir() -> anyhow::Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Expand a leading `~` against `home`
pub fn expand_tilde_with(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }

    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Expand a leading `~` against the current home directory; unchanged if unknown
pub fn expand_tilde(path: &str) -> PathBuf {
    match get_home_dir() {
        Ok(home) => expand_tilde_with(path, &home),
        Err(_) => PathBuf::from(path),
    }
}
