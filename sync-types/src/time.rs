//! Timestamps.
//!
//! SyncPS runs everything on one time axis: microseconds since the Unix
//! epoch. Publication identity (the final name component), expiry checks and
//! engine timers all use [`Timestamp`], which lets a test face substitute a
//! virtual clock for the whole stack.

use std::fmt;
use std::ops::{Add, Sub};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A point in time, in microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch itself; also the "unset" sentinel for suppression deadlines.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Construct from raw microseconds.
    pub const fn from_micros(us: u64) -> Self {
        Self(us)
    }

    /// Raw microseconds since the epoch.
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// The wall clock, for production faces and publication stamping.
    pub fn now() -> Self {
        let us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_micros() as u64;
        Self(us)
    }

    /// True for the zero sentinel.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Signed microseconds from `other` to `self` (negative if `self` is
    /// earlier), saturating at the i64 range.
    pub fn micros_since(self, other: Timestamp) -> i64 {
        if self.0 >= other.0 {
            i64::try_from(self.0 - other.0).unwrap_or(i64::MAX)
        } else {
            i64::try_from(other.0 - self.0).map(|d| -d).unwrap_or(i64::MIN)
        }
    }

    /// Duration from `earlier` to `self`, zero if `self` precedes it.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, d: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(d.as_micros() as u64))
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, d: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(d.as_micros() as u64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}
