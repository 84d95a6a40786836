//! Byte counts with human readable rendering

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

const BLOCK_SIZE: f64 = 1024.0;
const SUFFIXES: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// A signed byte count
///
/// Package metadata reports sizes as signed integers, so the raw value is kept
/// as `i64` rather than clamping to an unsigned type.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ByteSize(i64);

impl ByteSize {
    pub const ZERO: ByteSize = ByteSize(0);

    pub const fn new(bytes: i64) -> Self {
        Self(bytes)
    }

    pub const fn bytes(self) -> i64 {
        self.0
    }

    /// Render with a 1024 block size, e.g. `1536` becomes `1.50KB`
    pub fn human(self) -> String {
        let mut value = self.0 as f64;
        let mut idx = 0;

        while value > BLOCK_SIZE && idx < SUFFIXES.len() - 1 {
            idx += 1;
            value /= BLOCK_SIZE;
        }

        format!("{:.2}{}", value, SUFFIXES[idx])
    }
}

impl From<i64> for ByteSize {
    fn from(bytes: i64) -> Self {
        Self(bytes)
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        Self(i64::try_from(bytes).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.human())
    }
}

impl Add for ByteSize {
    type Output = ByteSize;

    fn add(self, rhs: ByteSize) -> ByteSize {
        ByteSize(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for ByteSize {
    fn add_assign(&mut self, rhs: ByteSize) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for ByteSize {
    fn sum<I: Iterator<Item = ByteSize>>(iter: I) -> Self {
        iter.fold(ByteSize::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a ByteSize> for ByteSize {
    fn sum<I: Iterator<Item = &'a ByteSize>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_rendering() {
        assert_eq!(ByteSize::new(0).human(), "0.00B");
        assert_eq!(ByteSize::new(512).human(), "512.00B");
        // Only values strictly greater than the block size step up
        assert_eq!(ByteSize::new(1024).human(), "1024.00B");
        assert_eq!(ByteSize::new(1536).human(), "1.50KB");
        assert_eq!(ByteSize::new(10 * 1024 * 1024 + 1).human(), "10.00MB");
        assert_eq!(ByteSize::new(3 * 1024_i64.pow(4) + 1).human(), "3.00TB");
    }

    #[test]
    fn test_human_rendering_caps_at_petabytes() {
        let huge = ByteSize::new(4096 * 1024_i64.pow(5));
        assert_eq!(huge.human(), "4096.00PB");
    }

    #[test]
    fn test_ordering_and_sum() {
        let sizes = [ByteSize::new(10), ByteSize::new(20), ByteSize::new(30)];
        let total: ByteSize = sizes.iter().sum();

        assert_eq!(total, ByteSize::new(60));
        assert!(ByteSize::new(5) < ByteSize::new(6));
        assert_eq!(sizes.iter().max(), Some(&ByteSize::new(30)));
    }

    #[test]
    fn test_add_assign_saturates() {
        let mut size = ByteSize::new(i64::MAX);
        size += ByteSize::new(1);
        assert_eq!(size.bytes(), i64::MAX);
    }
}
