//! Shared helpers for loopdown-core integration tests

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use loopdown_core::{Application, ShortName};

/// One `Packages` entry of a resource file
pub struct Entry {
    pub key: &'static str,
    pub download_name: &'static str,
    pub package_id: &'static str,
    pub mandatory: bool,
    pub download_size: i64,
    pub installed_size: i64,
}

impl Entry {
    pub fn new(key: &'static str, package_id: &'static str, download_name: &'static str) -> Self {
        Self {
            key,
            download_name,
            package_id,
            mandatory: false,
            download_size: 1024,
            installed_size: 2048,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    fn render(&self) -> String {
        format!(
            r#"<key>{}</key>
        <dict>
            <key>DownloadName</key><string>{}</string>
            <key>PackageID</key><string>{}</string>
            <key>IsMandatory</key><{}/>
            <key>DownloadSize</key><integer>{}</integer>
            <key>InstalledSize</key><integer>{}</integer>
        </dict>"#,
            self.key,
            self.download_name,
            self.package_id,
            self.mandatory,
            self.download_size,
            self.installed_size
        )
    }
}

/// Render a resource property list holding `entries`
pub fn resource_plist(entries: &[Entry]) -> String {
    let body: String = entries.iter().map(Entry::render).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Packages</key>
    <dict>
        {}
    </dict>
</dict>
</plist>"#,
        body
    )
}

/// Fake application bundles under a temporary directory
pub struct Bundles {
    pub root: TempDir,
}

impl Bundles {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    /// Create `<name>.app` with the given resource files
    pub fn bundle(&self, name: &str, files: &[(&str, String)]) -> PathBuf {
        let app = self.root.path().join(format!("{}.app", name));
        let resources = app.join("Contents/Resources");
        fs::create_dir_all(&resources).unwrap();

        for (file_name, contents) in files {
            fs::write(resources.join(file_name), contents).unwrap();
        }
        app
    }
}

pub fn application(name: &str, short_name: ShortName, path: &Path) -> Application {
    Application::new(
        name,
        "10.8.1",
        path,
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap(),
        short_name,
    )
}
