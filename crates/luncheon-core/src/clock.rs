//! Wall-clock access.
//!
//! Mining stamps every attempt with the current time and validation bounds
//! block timestamps by it, so both take a [`Clock`] instead of reading the
//! system time directly.

use time::OffsetDateTime;

/// Source of unix timestamps in seconds.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now_unix(&self) -> u64;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        OffsetDateTime::now_utc().unix_timestamp().max(0) as u64
    }
}

/// A clock pinned to a single instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0
    }
}
