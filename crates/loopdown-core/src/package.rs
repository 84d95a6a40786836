//! Content package records
//!
//! Packages are decoded from the `Packages` dictionary of an application's
//! resource property list. The source metadata is inconsistent between
//! releases, so a few fields are decoded tolerantly:
//!
//! - `FileCheck` is either a single string or a list of strings
//! - `PackageVersion` is either a string or a number
//! - `IsMandatory` and the size fields may be missing entirely

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use tracing::warn;

use crate::config::{CONTENT_DIR_2013, CONTENT_DIR_2016};
use crate::error::{Error, Result};
use crate::size::ByteSize;

/// A downloadable content package
///
/// Identity is the package identifier alone: two records with the same
/// identifier compare equal and hash identically whatever their other fields.
#[derive(Debug, Clone, Serialize)]
pub struct ContentPackage {
    pub package_id: String,
    pub download_name: String,
    /// Final path component of the download name
    pub name: String,
    /// Path relative to the content server root
    pub download_path: String,
    pub download_size: ByteSize,
    pub installed_size: ByteSize,
    pub mandatory: bool,
    pub file_check: Vec<String>,
    pub version: Option<String>,
}

impl ContentPackage {
    /// Build a package, deriving the display name and relative download path
    pub fn new(package_id: impl AsRef<str>, download_name: impl Into<String>) -> Result<Self> {
        let download_name = download_name.into();
        let package_id = package_id.as_ref().trim().to_string();

        if package_id.is_empty() {
            return Err(Error::invalid_package(
                download_name,
                "package identifier is empty",
            ));
        }

        let name = display_name(&download_name);
        let download_path = normalize_download_path(&download_name);

        Ok(Self {
            package_id,
            download_name,
            name,
            download_path,
            download_size: ByteSize::ZERO,
            installed_size: ByteSize::ZERO,
            mandatory: false,
            file_check: Vec::new(),
            version: None,
        })
    }

    pub fn with_sizes(mut self, download: i64, installed: i64) -> Self {
        self.download_size = ByteSize::new(download);
        self.installed_size = ByteSize::new(installed);
        self
    }

    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn with_file_check(mut self, file_check: Vec<String>) -> Self {
        self.file_check = file_check;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Decode one entry of a resource file's `Packages` dictionary
    pub fn from_plist(key: &str, value: &plist::Value) -> Result<Self> {
        let record: PackageRecord = plist::from_value(value)
            .map_err(|e| Error::invalid_package(key, e.to_string()))?;

        record.into_package()
    }
}

impl PartialEq for ContentPackage {
    fn eq(&self, other: &Self) -> bool {
        self.package_id == other.package_id
    }
}

impl Eq for ContentPackage {}

impl Hash for ContentPackage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.package_id.hash(state);
    }
}

impl std::fmt::Display for ContentPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Deterministic, case-insensitive ordering by display name
///
/// Ties fall back to the raw name and then the identifier so that sorting is
/// reproducible for identical inputs.
pub fn name_order(a: &ContentPackage, b: &ContentPackage) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.package_id.cmp(&b.package_id))
}

/// Sort packages in place with [`name_order`]
pub fn sort_by_name(packages: &mut [ContentPackage]) {
    packages.sort_by(name_order);
}

/// Mandatory and optional packages of one application
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageLists {
    pub mandatory: Vec<ContentPackage>,
    pub optional: Vec<ContentPackage>,
}

impl PackageLists {
    /// Decode every entry of a `Packages` dictionary
    ///
    /// An entry that fails to decode is logged and skipped; it never aborts
    /// the remaining entries.
    pub fn from_dictionary(packages: &plist::Dictionary) -> Self {
        let mut lists = Self::default();

        for (key, value) in packages.iter() {
            match ContentPackage::from_plist(key, value) {
                Ok(pkg) if pkg.mandatory => lists.mandatory.push(pkg),
                Ok(pkg) => lists.optional.push(pkg),
                Err(e) => warn!("Skipping package: {}", e),
            }
        }

        sort_by_name(&mut lists.mandatory);
        sort_by_name(&mut lists.optional);
        lists
    }

    pub fn is_empty(&self) -> bool {
        self.mandatory.is_empty() && self.optional.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mandatory.len() + self.optional.len()
    }
}

/// Raw `Packages` entry as it appears in the resource file
#[derive(Debug, Deserialize)]
struct PackageRecord {
    #[serde(rename = "DownloadName")]
    download_name: String,
    #[serde(rename = "PackageID")]
    package_id: String,
    #[serde(rename = "DownloadSize", default)]
    download_size: i64,
    #[serde(rename = "InstalledSize", default)]
    installed_size: i64,
    #[serde(rename = "IsMandatory", default)]
    mandatory: bool,
    #[serde(rename = "FileCheck", default)]
    file_check: Option<FileCheck>,
    #[serde(rename = "PackageVersion", default)]
    version: Option<VersionValue>,
}

impl PackageRecord {
    fn into_package(self) -> Result<ContentPackage> {
        let mut pkg = ContentPackage::new(&self.package_id, self.download_name)?
            .with_sizes(self.download_size, self.installed_size)
            .with_mandatory(self.mandatory)
            .with_file_check(self.file_check.map(FileCheck::into_paths).unwrap_or_default());
        pkg.version = self.version.map(VersionValue::render);
        Ok(pkg)
    }
}

/// `FileCheck` is a string in older metadata and a list in newer metadata
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FileCheck {
    One(String),
    Many(Vec<String>),
}

impl FileCheck {
    /// Normalize to a list; an empty string means no sentinel files
    pub fn into_paths(self) -> Vec<String> {
        match self {
            Self::One(path) if path.is_empty() => Vec::new(),
            Self::One(path) => vec![path],
            Self::Many(paths) => paths,
        }
    }
}

/// `PackageVersion` appears as an integer, a real, or a string
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VersionValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl VersionValue {
    /// Render as a version string; whole reals drop their fractional part
    pub fn render(self) -> String {
        match self {
            Self::Integer(v) => v.to_string(),
            Self::Real(v) if v.is_finite() && v.fract() == 0.0 => format!("{}", v as i64),
            Self::Real(v) => v.to_string(),
            Self::Text(v) => v,
        }
    }
}

fn display_name(download_name: &str) -> String {
    download_name
        .rsplit('/')
        .next()
        .unwrap_or(download_name)
        .to_string()
}

/// Resolve `../lp10_ms3_content_2013/x.pkg` style names to `lp10_ms3_content_2013/x.pkg`
///
/// Anything that does not mention the earlier era's directory lands under the
/// later era's directory.
pub fn normalize_download_path(download_name: &str) -> String {
    let basename = display_name(download_name);

    if download_name.contains(CONTENT_DIR_2013) {
        format!("{}/{}", CONTENT_DIR_2013, basename)
    } else {
        format!("{}/{}", CONTENT_DIR_2016, basename)
    }
}
