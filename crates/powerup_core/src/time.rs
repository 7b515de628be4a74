//! # Absolute Timestamps
//!
//! Second resolution is enough for durations measured in minutes and
//! keeps every computation in integers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time, in whole seconds since the Unix epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Self = Self(0);

    /// Creates a timestamp from seconds since the epoch.
    #[inline]
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns seconds since the epoch.
    #[inline]
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Returns this timestamp moved `secs` seconds forward.
    ///
    /// Saturates at the far end of the representable range instead of
    /// wrapping around into the past.
    #[inline]
    #[must_use]
    pub const fn saturating_add_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds from `earlier` to `self`, or zero if `earlier` is later.
    #[inline]
    #[must_use]
    pub const fn saturating_secs_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl From<u64> for Timestamp {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t+{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_saturates() {
        let ts = Timestamp::from_secs(u64::MAX - 5);
        assert_eq!(ts.saturating_add_secs(10).as_secs(), u64::MAX);
    }

    #[test]
    fn test_secs_since() {
        let a = Timestamp::from_secs(100);
        let b = Timestamp::from_secs(1900);
        assert_eq!(b.saturating_secs_since(a), 1800);
        assert_eq!(a.saturating_secs_since(b), 0);
    }

    #[test]
    fn test_ordering() {
        assert!(Timestamp::from_secs(5) < Timestamp::from_secs(6));
        assert_eq!(Timestamp::default(), Timestamp::EPOCH);
    }
}
