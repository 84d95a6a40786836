//! Fake host tools
//!
//! Each tool is a small shell script standing in for the macOS binary the
//! collaborators normally run.

#![allow(dead_code)]

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::constants::FAKE_RECEIPT_VERSION;

/// Directory of fake tools plus a scratch area
pub struct FakeTools {
    temp_dir: TempDir,
}

impl FakeTools {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp directory")?;
        std::fs::create_dir_all(temp_dir.path().join("bin"))?;
        Ok(Self { temp_dir })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// UTF-8 scratch directory for downloads and staging
    pub fn scratch(&self, name: &str) -> Utf8PathBuf {
        let path = self.temp_dir.path().join(name);
        Utf8PathBuf::from_path_buf(path).expect("temp paths are UTF-8")
    }

    /// Write an executable script and return its path as a string
    pub fn script(&self, name: &str, body: &str) -> Result<String> {
        let path: PathBuf = self.temp_dir.path().join("bin").join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        Ok(path.display().to_string())
    }

    /// Tool that prints fixed text to stdout
    pub fn printing(&self, name: &str, output: &str) -> Result<String> {
        self.script(name, &format!("cat <<'LOOPDOWN_EOF'\n{}\nLOOPDOWN_EOF", output))
    }

    /// curl stand-in writing a small file to the `-o` destination
    pub fn curl(&self) -> Result<String> {
        self.script(
            "curl",
            r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
[ -n "$out" ] || exit 2
mkdir -p "$(dirname "$out")"
printf 'xar!' > "$out""#,
        )
    }

    /// curl stand-in that fails like an HTTP 404 with `--fail`
    pub fn failing_curl(&self) -> Result<String> {
        self.script("curl-failing", "exit 22")
    }

    /// pkgutil stand-in that reports vendor signatures and a fixed receipt
    pub fn pkgutil(&self) -> Result<String> {
        self.script(
            "pkgutil",
            &format!(
                r#"case "$1" in
  --check-signature)
    echo "Package \"$(basename "$2")\":"
    echo "   Status: signed Apple Software"
    ;;
  --pkg-info-plist)
    cat <<'LOOPDOWN_EOF'
<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0"><dict><key>pkg-version</key><string>{}</string></dict></plist>
LOOPDOWN_EOF
    ;;
  *) exit 1 ;;
esac"#,
                FAKE_RECEIPT_VERSION
            ),
        )
    }

    /// pkgutil stand-in that finds no signature and no receipts
    pub fn unsigned_pkgutil(&self) -> Result<String> {
        self.script(
            "pkgutil-unsigned",
            r#"case "$1" in
  --check-signature) echo "   Status: no signature"; exit 1 ;;
  *) echo "No receipt for '$2' found at '/'." >&2; exit 1 ;;
esac"#,
        )
    }

    /// installer stand-in reporting success
    pub fn installer(&self) -> Result<String> {
        self.script(
            "installer",
            r#"echo "installer: Package name is $(basename "$2")"
echo "installer: Installing at base path /"
echo "installer: The install was successful.""#,
        )
    }

    /// installer stand-in reporting failure
    pub fn failing_installer(&self) -> Result<String> {
        self.script(
            "installer-failing",
            r#"echo "installer: The install failed. (The Installer encountered an error.)"
exit 1"#,
        )
    }
}
