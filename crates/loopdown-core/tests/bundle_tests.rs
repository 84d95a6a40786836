//! Reading package metadata out of application bundles and merging it

mod common;

use common::{application, resource_plist, Bundles, Entry};
use loopdown_core::application::find_resource_file;
use loopdown_core::selection::{group_by_application, merge_applications, PackageStats};
use loopdown_core::{Selection, ShortName};

fn garageband_entries() -> Vec<Entry> {
    vec![
        Entry::new(
            "Drums",
            "com.apple.pkg.MAContent10_AssetPack_0325",
            "../lp10_ms3_content_2013/MAContent10_AssetPack_0325_AppleLoopsDrums.pkg",
        )
        .mandatory(),
        Entry::new(
            "Strings",
            "com.apple.pkg.MAContent10_AssetPack_0593",
            "MAContent10_AssetPack_0593_StringsLegacy.pkg",
        ),
    ]
}

fn logic_entries() -> Vec<Entry> {
    vec![
        Entry::new(
            "Drums",
            "com.apple.pkg.MAContent10_AssetPack_0325",
            "../lp10_ms3_content_2013/MAContent10_AssetPack_0325_AppleLoopsDrums.pkg",
        ),
        Entry::new(
            "Core",
            "com.apple.pkg.MAContent10_AssetPack_0001",
            "MAContent10_AssetPack_0001_Core.pkg",
        )
        .mandatory(),
    ]
}

#[test]
fn test_newest_resource_file_is_used() {
    let bundles = Bundles::new();
    let app_path = bundles.bundle(
        "GarageBand",
        &[
            ("garageband1046.plist", resource_plist(&[])),
            ("garageband1047.plist", resource_plist(&garageband_entries())),
            ("Info.plist", String::new()),
            ("strings.plist", String::new()),
        ],
    );

    let found = find_resource_file(&app_path).unwrap();
    assert_eq!(found.file_name().unwrap(), "garageband1047.plist");

    let app = application("GarageBand", ShortName::GarageBand, &app_path);
    assert_eq!(app.packages().mandatory.len(), 1);
    assert_eq!(app.packages().optional.len(), 1);
}

#[test]
fn test_bundle_without_resource_file_has_no_packages() {
    let bundles = Bundles::new();
    let app_path = bundles.bundle("MainStage", &[("Info.plist", String::new())]);

    let app = application("MainStage", ShortName::MainStage, &app_path);
    assert!(app.packages().is_empty());
}

#[test]
fn test_unreadable_resource_file_has_no_packages() {
    let bundles = Bundles::new();
    let app_path = bundles.bundle(
        "Logic Pro",
        &[("logicpro1110.plist", "not a property list".to_string())],
    );

    let app = application("Logic Pro", ShortName::LogicPro, &app_path);
    assert!(app.packages().is_empty());
}

#[test]
fn test_shared_package_is_mandatory_if_any_application_requires_it() {
    let bundles = Bundles::new();
    let gb = bundles.bundle(
        "GarageBand",
        &[("garageband1047.plist", resource_plist(&garageband_entries()))],
    );
    let lp = bundles.bundle(
        "Logic Pro",
        &[("logicpro1110.plist", resource_plist(&logic_entries()))],
    );

    let apps = vec![
        application("Logic Pro", ShortName::LogicPro, &lp),
        application("GarageBand", ShortName::GarageBand, &gb),
    ];

    let merged = merge_applications(&apps, Selection::all());
    assert_eq!(merged.len(), 3);

    let drums = merged
        .iter()
        .find(|p| p.package_id == "com.apple.pkg.MAContent10_AssetPack_0325")
        .unwrap();
    assert!(drums.mandatory);
    assert_eq!(
        drums.download_path,
        "lp10_ms3_content_2013/MAContent10_AssetPack_0325_AppleLoopsDrums.pkg"
    );

    let stats = PackageStats::collect(&merged);
    assert_eq!(stats.mandatory.count, 2);
    assert_eq!(stats.optional.count, 1);
    assert_eq!(stats.total().download.bytes(), 3 * 1024);
}

#[test]
fn test_optional_only_selection_drops_mandatory_packages() {
    let bundles = Bundles::new();
    let lp = bundles.bundle(
        "Logic Pro",
        &[("logicpro1110.plist", resource_plist(&logic_entries()))],
    );
    let apps = vec![application("Logic Pro", ShortName::LogicPro, &lp)];

    let merged = merge_applications(&apps, Selection::new(false, true));
    assert_eq!(merged.len(), 1);
    assert!(!merged[0].mandatory);
}

#[test]
fn test_grouping_keeps_applications_separate() {
    let bundles = Bundles::new();
    let gb = bundles.bundle(
        "GarageBand",
        &[("garageband1047.plist", resource_plist(&garageband_entries()))],
    );
    let lp = bundles.bundle(
        "Logic Pro",
        &[("logicpro1110.plist", resource_plist(&logic_entries()))],
    );
    let apps = vec![
        application("GarageBand", ShortName::GarageBand, &gb),
        application("Logic Pro", ShortName::LogicPro, &lp),
    ];

    let groups = group_by_application(&apps, Selection::all());
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].short_name, ShortName::GarageBand);
    assert_eq!(groups[0].packages.len(), 2);
    assert_eq!(groups[1].packages.len(), 2);
}
