//! Refresh interval backoff after consecutive failures.

use std::time::Duration;

use serde::Serialize;

/// Largest exponent applied to the base interval.
pub const MAX_BACKOFF_EXPONENT: u32 = 5;

/// Consecutive-failure counter and the refresh interval it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Interval until the next scheduled refresh:
    /// `min(base * 2^min(failures, 5), max)`.
    pub fn interval(&self) -> Duration {
        let factor = 1u32 << self.failures.min(MAX_BACKOFF_EXPONENT);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Counts one more failure and returns the new interval.
    pub fn record_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.interval()
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}
