//! Caching server discovery
//!
//! `AssetCacheLocatorUtil --json` reports the caching servers the host knows
//! about. The best healthy candidate (lowest rank) becomes the content
//! server; when none qualifies the caller falls back to the origin.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use loopdown_core::config::{ASSET_CACHE_LOCATOR, DISCOVERY_TIMEOUT};

use crate::error::{Error, Result};
use crate::process::{self, ProcessSpec};

pub const MIN_RANK: i64 = 0;
pub const MAX_RANK: i64 = 10_000;

/// The only discovery scope the tool's output is trusted for
pub const SYSTEM_SCOPE: &str = "system";

/// Scheme used when the tool reports a bare `host:port`
pub const DEFAULT_SCHEME: &str = "http";

/// One entry of the locator's `all servers` list
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CacheCandidate {
    pub hostport: String,
    pub rank: i64,
    #[serde(default)]
    pub healthy: bool,
    #[serde(default)]
    pub favored: Option<bool>,
}

impl CacheCandidate {
    /// Health predicate; an absent `favored` leaves the rank check alone
    pub fn is_eligible(&self, min_rank: i64, ignore_favored: bool) -> bool {
        self.healthy
            && (MIN_RANK..=MAX_RANK).contains(&self.rank)
            && self.rank >= min_rank
            && (ignore_favored || self.favored.unwrap_or(true))
    }

    /// Build `<scheme>://host:port`, splitting at the last colon
    pub fn url(&self, scheme: &str) -> Option<Url> {
        let (host, port) = self.hostport.rsplit_once(':')?;
        let port: u16 = port.parse().ok()?;
        if host.is_empty() {
            return None;
        }
        Url::parse(&format!("{}://{}:{}", scheme, host, port)).ok()
    }
}

/// Discovery parameters
#[derive(Debug, Clone)]
pub struct CacheDiscovery {
    locator: String,
    scope: String,
    min_rank: i64,
    ignore_favored: bool,
    scheme: String,
    timeout: Duration,
}

impl Default for CacheDiscovery {
    fn default() -> Self {
        Self {
            locator: ASSET_CACHE_LOCATOR.to_string(),
            scope: SYSTEM_SCOPE.to_string(),
            min_rank: MIN_RANK,
            ignore_favored: false,
            scheme: DEFAULT_SCHEME.to_string(),
            timeout: DISCOVERY_TIMEOUT,
        }
    }
}

impl CacheDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = locator.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_min_rank(mut self, min_rank: i64) -> Self {
        self.min_rank = min_rank;
        self
    }

    pub fn with_ignore_favored(mut self, ignore: bool) -> Self {
        self.ignore_favored = ignore;
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Reject parameters the discovery cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.scope != SYSTEM_SCOPE {
            return Err(Error::unsupported_scope(&self.scope));
        }

        if !(MIN_RANK..=MAX_RANK).contains(&self.min_rank) {
            return Err(Error::InvalidMinimumRank {
                rank: self.min_rank,
                min: MIN_RANK,
                max: MAX_RANK,
            });
        }

        Ok(())
    }

    /// Locate the best caching server, if any
    ///
    /// Parameter errors are returned before the locator runs; failures of the
    /// locator itself are logged and yield `None`.
    pub async fn discover(&self) -> Result<Option<Url>> {
        self.validate()?;

        let spec = ProcessSpec::new([self.locator.as_str(), "--json"])
            .check(true)
            .timeout(self.timeout);

        let output = match process::run(spec).await {
            Ok(output) => output,
            Err(e) => {
                debug!("Caching server locator failed: {}", e);
                return Ok(None);
            }
        };

        let candidates = match parse_candidates(&output.stdout, &self.scope) {
            Some(candidates) => candidates,
            None => return Ok(None),
        };

        let url = self.select(candidates);
        match &url {
            Some(url) => info!("Found caching server {}", url),
            None => debug!("No eligible caching server found"),
        }

        Ok(url)
    }

    /// First eligible candidate by ascending rank
    pub fn select(&self, mut candidates: Vec<CacheCandidate>) -> Option<Url> {
        candidates.sort_by_key(|c| c.rank);

        candidates
            .iter()
            .filter(|c| c.is_eligible(self.min_rank, self.ignore_favored))
            .find_map(|c| {
                let url = c.url(&self.scheme);
                if url.is_none() {
                    debug!("Skipping caching server with unusable address '{}'", c.hostport);
                }
                url
            })
    }
}

/// Decode `results.<scope>."saved servers"."all servers"`, skipping bad records
pub fn parse_candidates(json: &[u8], scope: &str) -> Option<Vec<CacheCandidate>> {
    let payload: serde_json::Value = match serde_json::from_slice(json) {
        Ok(payload) => payload,
        Err(e) => {
            debug!("Caching server locator output is not JSON: {}", e);
            return None;
        }
    };

    let servers = payload
        .get("results")
        .and_then(|v| v.get(scope))
        .and_then(|v| v.get("saved servers"))
        .and_then(|v| v.get("all servers"))
        .and_then(|v| v.as_array());

    let Some(servers) = servers else {
        debug!("Caching server locator output has no saved servers for '{}'", scope);
        return None;
    };

    let candidates = servers
        .iter()
        .filter_map(|value| match CacheCandidate::deserialize(value) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                debug!("Skipping caching server record: {}", e);
                None
            }
        })
        .collect();

    Some(candidates)
}
