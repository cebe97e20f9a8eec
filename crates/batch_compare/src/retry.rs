//! Exponential backoff for retried items.

use core::time::Duration;

/// How many times a failed or timed out item is attempted again, and how long
/// to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// True when another attempt is allowed after `attempts` attempts.
    #[inline]
    #[must_use]
    pub const fn allows_retry(&self, attempts: u32) -> bool {
        attempts <= self.max_retries
    }

    /// Backoff before retry number `retry` (0-based): `base_delay * 2^retry`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1_u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}
