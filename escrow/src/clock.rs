//! # Clock Abstraction
//!
//! The engine never reads the system time directly. All timing-dependent
//! guards (funding deadlines, expiry, dispute windows) go through the
//! [`Clock`] trait, so the surrounding runtime decides what "now" means
//! — wall clock in production, a hand-advanced clock in tests and
//! simulations.
//!
//! Implementations must be monotonically non-decreasing: time never runs
//! backwards between two engine invocations.

use chrono::{DateTime, Duration, Utc};

/// Source of the current logical timestamp.
pub trait Clock {
    /// Returns the current timestamp. Must never decrease across calls.
    fn now(&self) -> DateTime<Utc>;
}

// ---------------------------------------------------------------------------
// SystemClock
// ---------------------------------------------------------------------------

/// Wall-clock time via `chrono`. The production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// A clock that only moves when told to. Used by tests and the closing
/// simulator to exercise timeout paths deterministically.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: DateTime<Utc>,
}

impl ManualClock {
    /// Creates a manual clock pinned at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { current: start }
    }

    /// Advances the clock by `secs` seconds.
    pub fn advance_secs(&mut self, secs: u64) {
        self.current += Duration::seconds(secs as i64);
    }

    /// Jumps the clock to an absolute instant. Moving backwards is a
    /// caller bug; the clock silently ignores it to preserve
    /// monotonicity.
    pub fn set(&mut self, instant: DateTime<Utc>) {
        if instant > self.current {
            self.current = instant;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.current
    }
}
