//! Timestamp type carried in telemetry reports.
//!
//! Reporting nodes stamp events with their own wall clock. The coordinator
//! assumes those clocks are loosely synchronized, which holds for co-located
//! runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in nanoseconds since epoch (UTC).
///
/// The zero value means "never set".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Whole seconds since epoch.
    pub fn unix_secs(&self) -> u64 {
        self.0 / 1_000_000_000
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_truncate_sub_second_part() {
        let t = Timestamp::from_nanos(3_999_999_999);
        assert_eq!(t.unix_secs(), 3);
        assert_eq!(Timestamp::from_secs(3).unix_secs(), 3);
    }

    #[test]
    fn now_is_not_epoch() {
        assert!(!Timestamp::now().is_zero());
        assert!(Timestamp::EPOCH.is_zero());
    }
}
