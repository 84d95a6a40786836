//! Dotted package version comparison
//!
//! Receipt versions look like `2.1.0.0.20251224` and metadata versions like
//! `2.1`, so neither fits semver. Only the numeric release segments matter.

use std::fmt;

/// Numeric release segments of a dotted version string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageVersion {
    release: Vec<u64>,
}

impl PackageVersion {
    /// Parse leading numeric segments; parsing stops at the first segment
    /// without a leading digit
    pub fn parse(raw: &str) -> Self {
        let mut release = Vec::new();

        for segment in raw.trim().split('.') {
            let digits: String = segment.chars().take_while(|c| c.is_ascii_digit()).collect();
            match digits.parse::<u64>() {
                Ok(n) => release.push(n),
                Err(_) => break,
            }
        }

        Self { release }
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Prefix-floor check: `self` satisfies `required` when its release,
    /// truncated or zero-padded to the length of `required`, is not lower
    ///
    /// `2.1.0.0.20251224` satisfies `2.1`; an empty requirement is always met.
    pub fn satisfies(&self, required: &PackageVersion) -> bool {
        if required.release.is_empty() {
            return true;
        }

        let prefix: Vec<u64> = (0..required.release.len())
            .map(|i| self.release.get(i).copied().unwrap_or(0))
            .collect();

        prefix >= required.release
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.release.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}
