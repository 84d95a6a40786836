//! Package builders for tests

#![allow(dead_code)]

use loopdown_core::package::ContentPackage;

/// Builder for content packages
pub struct PackageBuilder {
    id: String,
    download_name: String,
    download_size: i64,
    installed_size: i64,
    mandatory: bool,
    file_check: Vec<String>,
    version: Option<String>,
}

impl PackageBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            download_name: format!("../lp10_ms3_content_2016/{}.pkg", id),
            download_size: 1024,
            installed_size: 4096,
            mandatory: false,
            file_check: Vec::new(),
            version: None,
        }
    }

    pub fn download_name(mut self, name: &str) -> Self {
        self.download_name = name.to_string();
        self
    }

    pub fn sizes(mut self, download: i64, installed: i64) -> Self {
        self.download_size = download;
        self.installed_size = installed;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn file_check(mut self, path: &str) -> Self {
        self.file_check.push(path.to_string());
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn build(self) -> ContentPackage {
        let mut pkg = ContentPackage::new(&self.id, self.download_name)
            .unwrap()
            .with_sizes(self.download_size, self.installed_size)
            .with_mandatory(self.mandatory)
            .with_file_check(self.file_check);
        if let Some(version) = self.version {
            pkg = pkg.with_version(version);
        }
        pkg
    }
}
