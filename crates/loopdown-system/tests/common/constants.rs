//! Test constants for loopdown-system tests

#![allow(dead_code)]

/// Receipt version reported by the fake pkgutil
pub const FAKE_RECEIPT_VERSION: &str = "2.1.0.0.20251224";

/// Caching server locator output with one unhealthy and two healthy servers
pub const LOCATOR_JSON: &str = r#"{
  "results": {
    "system": {
      "saved servers": {
        "all servers": [
          {"hostport": "10.0.0.1:49180", "rank": 1, "healthy": false, "favored": true},
          {"hostport": "10.0.0.3:49180", "rank": 3, "healthy": true, "favored": true},
          {"hostport": "10.0.0.2:49180", "rank": 2, "healthy": true}
        ]
      }
    }
  }
}"#;

/// Inventory output with two supported applications
pub const INVENTORY_JSON: &str = r#"{
  "SPApplicationsDataType": [
    {"_name": "GarageBand", "version": "10.4.12", "path": "/Applications/GarageBand.app", "lastModified": "2025-01-15T12:00:00Z"},
    {"_name": "Keynote", "version": "14.3", "path": "/Applications/Keynote.app", "lastModified": "2025-01-15T12:00:00Z"},
    {"_name": "Logic Pro", "version": "11.1.2", "path": "/Applications/Logic Pro.app", "lastModified": "2025-02-01T08:30:00Z"}
  ]
}"#;
