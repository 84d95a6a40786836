//! Content server URLs
//!
//! Packages are fetched from the vendor origin, a local caching server, or a
//! mirror of the content tree. Caching servers are addressed with the origin
//! passed in the query string so a cache miss can be filled upstream.

use std::fmt;
use url::Url;

use crate::config::{CONTENT_ORIGIN, CONTENT_ORIGIN_HOST};
use crate::error::{Error, Result};
use crate::package::ContentPackage;

const CACHE_FORMAT: &str = "expected http://host:port";
const MIRROR_FORMAT: &str = "expected http(s)://host[/path]";

/// Validate an explicitly supplied caching server URL
pub fn validate_cache_server_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| Error::invalid_server_url(raw, format!("{} ({})", e, CACHE_FORMAT)))?;

    if url.scheme() != "http" {
        return Err(Error::invalid_server_url(
            raw,
            format!("invalid scheme ({})", CACHE_FORMAT),
        ));
    }

    reject_user_info(raw, &url, CACHE_FORMAT)?;

    match explicit_port(raw, &url) {
        None => {
            return Err(Error::invalid_server_url(
                raw,
                format!("missing port ({})", CACHE_FORMAT),
            ))
        }
        Some(0) => {
            return Err(Error::invalid_server_url(
                raw,
                "port must be an integer between 1 and 65535",
            ))
        }
        Some(_) => {}
    }

    reject_query_and_fragment(raw, &url, CACHE_FORMAT)?;

    if !matches!(url.path(), "" | "/") {
        return Err(Error::invalid_server_url(
            raw,
            format!("path not allowed ({})", CACHE_FORMAT),
        ));
    }

    Ok(url)
}

/// Validate a mirror server URL; a base path is allowed
pub fn validate_mirror_server_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| Error::invalid_server_url(raw, format!("{} ({})", e, MIRROR_FORMAT)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_server_url(
            raw,
            format!("invalid scheme ({})", MIRROR_FORMAT),
        ));
    }

    reject_user_info(raw, &url, MIRROR_FORMAT)?;
    reject_query_and_fragment(raw, &url, MIRROR_FORMAT)?;

    Ok(url)
}

fn reject_user_info(raw: &str, url: &Url, format: &str) -> Result<()> {
    if !url.username().is_empty() || url.password().is_some() {
        return Err(Error::invalid_server_url(
            raw,
            format!("user-info is not allowed ({})", format),
        ));
    }
    Ok(())
}

fn reject_query_and_fragment(raw: &str, url: &Url, format: &str) -> Result<()> {
    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::invalid_server_url(
            raw,
            format!("query/fragments not allowed ({})", format),
        ));
    }
    Ok(())
}

/// Port written in the URL, including a scheme-default port that `Url` hides
fn explicit_port(raw: &str, url: &Url) -> Option<u16> {
    if let Some(port) = url.port() {
        return Some(port);
    }

    let default = url.port_or_known_default()?;
    let authority = raw
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(raw)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("");

    authority
        .rsplit_once(':')
        .filter(|(_, port)| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
        .map(|_| default)
}

/// Rewrite a caching server URL into the form used for every request
///
/// The scheme is forced to `http`, the path is canonicalized (a root or
/// empty path becomes empty) and the query names the origin the cache
/// should fill from.
pub fn normalize_cache_url(url: &Url) -> Url {
    let mut normalized = url.clone();

    if normalized.scheme() != "http" {
        // Only fails for cannot-be-a-base URLs, which never reach here
        let _ = normalized.set_scheme("http");
    }

    let path = canonical_path(url.path());
    normalized.set_path(&path);
    normalized.set_fragment(None);
    normalized.set_query(Some(&format!(
        "source={}&sourceScheme=https",
        CONTENT_ORIGIN_HOST
    )));

    normalized
}

/// Collapse empty, `.` and `..` segments and drop any trailing slash
fn canonical_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// The server a run fetches packages from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentServer {
    Origin,
    /// Normalized caching server URL
    Cache(Url),
    Mirror(Url),
}

impl ContentServer {
    /// Base URL that package paths are joined onto
    pub fn base_url(&self) -> Result<Url> {
        match self {
            Self::Origin => Ok(Url::parse(CONTENT_ORIGIN)?),
            Self::Cache(url) | Self::Mirror(url) => Ok(url.clone()),
        }
    }

    /// Full download URL for a package; the base query is kept
    pub fn package_url(&self, pkg: &ContentPackage) -> Result<Url> {
        let mut url = self.base_url()?;
        let path = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            pkg.download_path.trim_start_matches('/')
        );
        url.set_path(&path);
        Ok(url)
    }

    pub fn is_origin(&self) -> bool {
        matches!(self, Self::Origin)
    }
}

impl fmt::Display for ContentServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Origin => write!(f, "{}", CONTENT_ORIGIN),
            Self::Cache(url) => write!(f, "{} (caching server)", url),
            Self::Mirror(url) => write!(f, "{} (mirror)", url),
        }
    }
}
