//! Package selection and cross-application merge
//!
//! Packages are keyed by identifier. When several applications ship the same
//! package, a mandatory classification always wins over an optional one, and
//! the output order depends only on the packages, not on application order.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::application::{Application, ShortName};
use crate::package::{sort_by_name, ContentPackage};
use crate::size::ByteSize;

/// Which classes of content a run processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub mandatory: bool,
    pub optional: bool,
}

impl Selection {
    pub fn new(mandatory: bool, optional: bool) -> Self {
        Self {
            mandatory,
            optional,
        }
    }

    pub fn all() -> Self {
        Self::new(true, true)
    }

    pub fn includes(&self, pkg: &ContentPackage) -> bool {
        if pkg.mandatory {
            self.mandatory
        } else {
            self.optional
        }
    }
}

/// Requested packages of a single application, sorted by name
pub fn select_for_application(app: &Application, selection: Selection) -> Vec<ContentPackage> {
    let lists = app.packages();
    let mut selected = Vec::new();

    if selection.mandatory {
        selected.extend(lists.mandatory.iter().cloned());
    }

    if selection.optional {
        selected.extend(lists.optional.iter().cloned());
    }

    sort_by_name(&mut selected);
    selected
}

/// Merge the requested packages of several applications into one set
///
/// All mandatory packages are inserted first; an optional package is only
/// added when no package with the same identifier is already present.
pub fn merge_applications(apps: &[Application], selection: Selection) -> Vec<ContentPackage> {
    let mut merged: HashMap<String, ContentPackage> = HashMap::new();
    let mut mandatory_seen: HashSet<String> = HashSet::new();

    if selection.mandatory {
        for app in apps {
            for pkg in &app.packages().mandatory {
                mandatory_seen.insert(pkg.package_id.clone());
                merged.insert(pkg.package_id.clone(), pkg.clone());
            }
        }
    }

    if selection.optional {
        for app in apps {
            for pkg in &app.packages().optional {
                if mandatory_seen.contains(&pkg.package_id)
                    || merged.contains_key(&pkg.package_id)
                {
                    continue;
                }
                merged.insert(pkg.package_id.clone(), pkg.clone());
            }
        }
    }

    let mut packages: Vec<ContentPackage> = merged.into_values().collect();
    sort_by_name(&mut packages);
    packages
}

/// Drop packages for which `is_installed` returns true
pub fn without_installed<F>(packages: Vec<ContentPackage>, mut is_installed: F) -> Vec<ContentPackage>
where
    F: FnMut(&ContentPackage) -> bool,
{
    packages
        .into_iter()
        .filter(|pkg| !is_installed(pkg))
        .collect()
}

/// Packages of one application, for scan output
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationPackages {
    pub name: String,
    pub short_name: ShortName,
    pub packages: Vec<ContentPackage>,
}

/// Group the requested packages by application
pub fn group_by_application(apps: &[Application], selection: Selection) -> Vec<ApplicationPackages> {
    apps.iter()
        .map(|app| ApplicationPackages {
            name: app.name.clone(),
            short_name: app.short_name,
            packages: select_for_application(app, selection),
        })
        .collect()
}

/// Count and size totals for one class of packages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketStats {
    pub count: usize,
    pub download: ByteSize,
    pub installed: ByteSize,
}

impl BucketStats {
    pub fn add(&mut self, pkg: &ContentPackage) {
        self.count += 1;
        self.download += pkg.download_size;
        self.installed += pkg.installed_size;
    }

    pub fn combined(&self, other: &BucketStats) -> BucketStats {
        BucketStats {
            count: self.count + other.count,
            download: self.download + other.download,
            installed: self.installed + other.installed,
        }
    }
}

/// Mandatory and optional bucket totals for a package list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PackageStats {
    pub mandatory: BucketStats,
    pub optional: BucketStats,
}

impl PackageStats {
    pub fn collect(packages: &[ContentPackage]) -> Self {
        let mut stats = Self::default();

        for pkg in packages {
            if pkg.mandatory {
                stats.mandatory.add(pkg);
            } else {
                stats.optional.add(pkg);
            }
        }

        stats
    }

    pub fn total(&self) -> BucketStats {
        self.mandatory.combined(&self.optional)
    }
}
