//! Installed audio applications and their resource files

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{LazyLock, OnceLock};
use tracing::{debug, error};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

use crate::config::RESOURCE_SUBDIR;
use crate::error::{Error, Result};
use crate::package::PackageLists;

/// Resource files are named like `garageband1047.plist` or `logicpro1120.plist`
static RESOURCE_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z]+[0-9]+\.plist$").expect("resource file regex is valid")
});

/// Timestamp format of the inventory's `lastModified` field
pub const LAST_MODIFIED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Supported applications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortName {
    GarageBand,
    LogicPro,
    MainStage,
}

impl ShortName {
    pub const ALL: [ShortName; 3] = [Self::GarageBand, Self::LogicPro, Self::MainStage];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GarageBand => "garageband",
            Self::LogicPro => "logicpro",
            Self::MainStage => "mainstage",
        }
    }

    /// Display names reported by the inventory, already folded
    pub fn display_names(self) -> &'static [&'static str] {
        match self {
            Self::GarageBand => &["garageband"],
            Self::LogicPro => &["logic pro", "logic pro x"],
            Self::MainStage => &["mainstage"],
        }
    }

    /// Map an inventory display name to a supported application
    pub fn from_display_name(name: &str) -> Option<Self> {
        let folded = fold_name(name);
        Self::ALL
            .into_iter()
            .find(|short| short.display_names().contains(&folded.as_str()))
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShortName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let folded = fold_name(s);
        Self::ALL
            .into_iter()
            .find(|short| short.as_str() == folded)
            .ok_or_else(|| Error::unknown_application(s))
    }
}

/// Case- and diacritic-insensitive fold used for display name matching
pub fn fold_name(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Parse the inventory's `lastModified` value as UTC
pub fn parse_last_modified(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, LAST_MODIFIED_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// An installed application that ships content package metadata
#[derive(Debug, Serialize)]
pub struct Application {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub last_modified: DateTime<Utc>,
    pub short_name: ShortName,
    #[serde(skip)]
    packages: OnceLock<PackageLists>,
}

impl Application {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<PathBuf>,
        last_modified: DateTime<Utc>,
        short_name: ShortName,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            path: path.into(),
            last_modified,
            short_name,
            packages: OnceLock::new(),
        }
    }

    /// Use already decoded package lists instead of reading the resource file
    pub fn with_packages(self, packages: PackageLists) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(packages);
        Self {
            packages: cell,
            ..self
        }
    }

    /// Package lists from the application's resource file
    ///
    /// The resource file is located and parsed on the first call only; later
    /// calls return the same lists for the lifetime of this instance. Read
    /// failures produce empty lists.
    pub fn packages(&self) -> &PackageLists {
        self.packages
            .get_or_init(|| load_packages(&self.path, self.short_name))
    }

    /// Path of the resource file the packages are read from, if any
    pub fn resource_file(&self) -> Option<PathBuf> {
        find_resource_file(&self.path)
    }
}

impl Clone for Application {
    fn clone(&self) -> Self {
        let cloned = Self::new(
            self.name.clone(),
            self.version.clone(),
            self.path.clone(),
            self.last_modified,
            self.short_name,
        );

        match self.packages.get() {
            Some(packages) => cloned.with_packages(packages.clone()),
            None => cloned,
        }
    }
}

/// Find the newest package metadata file inside an application bundle
///
/// Walks `Contents/Resources` for files named like `garageband1047.plist`
/// whose name mentions a supported application, and returns the one with the
/// lexicographically greatest file name.
pub fn find_resource_file(app_path: &Path) -> Option<PathBuf> {
    let resources = app_path.join(RESOURCE_SUBDIR);
    let mut found: Option<(String, PathBuf)> = None;

    for entry in WalkDir::new(&resources)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let file_name = entry.file_name().to_string_lossy().to_string();

        if !RESOURCE_FILE_RE.is_match(&file_name) {
            continue;
        }

        let lowered = file_name.to_lowercase();
        if !ShortName::ALL
            .iter()
            .any(|short| lowered.contains(short.as_str()))
        {
            continue;
        }

        let is_newer = found
            .as_ref()
            .map(|(current, _)| file_name > *current)
            .unwrap_or(true);

        if is_newer {
            found = Some((file_name, entry.into_path()));
        }
    }

    let resource_file = found.map(|(_, path)| path);
    debug!("Found application resource file {:?}", resource_file);
    resource_file
}

/// Read the `Packages` dictionary of a resource file
pub fn read_packages(resource_file: &Path) -> Result<PackageLists> {
    let root = plist::Value::from_file(resource_file)?;

    let packages = root
        .as_dictionary()
        .and_then(|dict| dict.get("Packages"))
        .and_then(plist::Value::as_dictionary);

    match packages {
        Some(dict) => Ok(PackageLists::from_dictionary(dict)),
        None => {
            debug!("No 'Packages' in {}", resource_file.display());
            Ok(PackageLists::default())
        }
    }
}

fn load_packages(app_path: &Path, short_name: ShortName) -> PackageLists {
    let Some(resource_file) = find_resource_file(app_path) else {
        debug!("No resource file found for {}", short_name);
        return PackageLists::default();
    };

    read_packages(&resource_file).unwrap_or_else(|e| {
        error!(
            "Unable to parse packages from '{}': {}",
            resource_file.display(),
            e
        );
        PackageLists::default()
    })
}
