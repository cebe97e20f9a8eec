//! Batch run configuration.
//!
//! A [`BatchConfig`] fixes the limits of one run: comparison tolerance,
//! concurrency, per-item timeout and the opt-in retry policy. It can be built
//! programmatically or loaded from `RASTER_BATCH_*` environment variables, and
//! is always checked with [`BatchConfig::validate`] before a batch starts.

use crate::error::{ConfigError, Result};
use crate::retry::RetryPolicy;
use core::time::Duration;
use raster_compare::check_tolerance;
use std::env;

/// Upper bound for [`BatchConfig::concurrency_limit`].
pub const MAX_CONCURRENCY: usize = 8;

/// Limits for one batch run.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Maximum fraction of differing pixels still considered a match, applied
    /// to pairs submitted with `BatchOrchestrator::run_pairs`
    pub tolerance: f64,
    /// Comparisons allowed to execute at the same time, in `[1, 8]`
    pub concurrency_limit: usize,
    /// Time budget for one comparison attempt in milliseconds
    pub per_item_timeout_ms: u64,
    /// Whether failed or timed out items are attempted again
    pub enable_retry: bool,
    /// Retries after the first attempt when `enable_retry` is set
    pub max_retry_attempts: u32,
    /// Backoff before the first retry in milliseconds
    pub retry_base_delay_ms: u64,
    /// Upper bound for any single backoff in milliseconds
    pub retry_max_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.0,
            concurrency_limit: 4,
            per_item_timeout_ms: 30_000,
            enable_retry: false,
            max_retry_attempts: 3,
            retry_base_delay_ms: 1_000,
            retry_max_delay_ms: 30_000,
        }
    }
}

impl BatchConfig {
    /// Construct a configuration with the given tolerance, concurrency and
    /// timeout; retry stays disabled.
    #[inline]
    #[must_use]
    pub fn new(tolerance: f64, concurrency_limit: usize, per_item_timeout: Duration) -> Self {
        Self {
            tolerance,
            concurrency_limit,
            per_item_timeout_ms: duration_millis(per_item_timeout),
            ..Self::default()
        }
    }

    /// Enable retries with exponential backoff starting at `base_delay`.
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, max_retry_attempts: u32, base_delay: Duration) -> Self {
        self.enable_retry = true;
        self.max_retry_attempts = max_retry_attempts;
        self.retry_base_delay_ms = duration_millis(base_delay);
        self.retry_max_delay_ms = self.retry_max_delay_ms.max(self.retry_base_delay_ms);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `RASTER_BATCH_TOLERANCE`: match tolerance (default: 0.0)
    /// - `RASTER_BATCH_CONCURRENCY`: concurrency limit (default: 4)
    /// - `RASTER_BATCH_TIMEOUT_MS`: per-item timeout in milliseconds (default: 30000)
    /// - `RASTER_BATCH_RETRY`: set to "1" to enable retries (default: disabled)
    /// - `RASTER_BATCH_MAX_RETRIES`: retries per item (default: 3)
    /// - `RASTER_BATCH_RETRY_BASE_MS`: first backoff in milliseconds (default: 1000)
    ///
    /// Unparseable values fall back to the default. Parsed values are not
    /// clamped; out-of-range settings are rejected by [`BatchConfig::validate`].
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`BatchConfig::from_env`] but reads values through `lookup`.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let tolerance = lookup("RASTER_BATCH_TOLERANCE")
            .and_then(|val| val.parse::<f64>().ok())
            .unwrap_or(defaults.tolerance);
        let concurrency_limit = lookup("RASTER_BATCH_CONCURRENCY")
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(defaults.concurrency_limit);
        let per_item_timeout_ms = lookup("RASTER_BATCH_TIMEOUT_MS")
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.per_item_timeout_ms);
        let enable_retry = lookup("RASTER_BATCH_RETRY").as_deref() == Some("1");
        let max_retry_attempts = lookup("RASTER_BATCH_MAX_RETRIES")
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(defaults.max_retry_attempts);
        let retry_base_delay_ms = lookup("RASTER_BATCH_RETRY_BASE_MS")
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.retry_base_delay_ms);
        Self {
            tolerance,
            concurrency_limit,
            per_item_timeout_ms,
            enable_retry,
            max_retry_attempts,
            retry_base_delay_ms,
            retry_max_delay_ms: defaults.retry_max_delay_ms.max(retry_base_delay_ms),
        }
    }

    /// Check every limit.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: concurrency outside `[1, 8]`,
    /// tolerance outside `[0.0, 1.0]`, a zero timeout, or a retry base delay
    /// larger than the maximum delay.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency_limit) {
            return Err(ConfigError::ConcurrencyLimit(self.concurrency_limit));
        }
        check_tolerance(self.tolerance).map_err(|_| ConfigError::Tolerance(self.tolerance))?;
        if self.per_item_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.enable_retry && self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(ConfigError::RetryDelay {
                base: self.retry_base_delay(),
                max: self.retry_max_delay(),
            });
        }
        Ok(())
    }

    /// Get the per-item timeout as a `Duration`.
    #[inline]
    #[must_use]
    pub const fn per_item_timeout(&self) -> Duration {
        Duration::from_millis(self.per_item_timeout_ms)
    }

    #[inline]
    #[must_use]
    pub const fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    #[inline]
    #[must_use]
    pub const fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    /// Retry policy for this run. Disabled retries allow zero extra attempts.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: if self.enable_retry {
                self.max_retry_attempts
            } else {
                0
            },
            base_delay: self.retry_base_delay(),
            max_delay: self.retry_max_delay(),
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|&(key, val)| (key.to_owned(), val.to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn default_is_valid() {
        assert_eq!(BatchConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_concurrency_outside_bounds() {
        for limit in [0, 9, 64] {
            let cfg = BatchConfig::new(0.0, limit, Duration::from_secs(1));
            assert_eq!(cfg.validate(), Err(ConfigError::ConcurrencyLimit(limit)));
        }
        for limit in 1..=MAX_CONCURRENCY {
            let cfg = BatchConfig::new(0.0, limit, Duration::from_secs(1));
            assert_eq!(cfg.validate(), Ok(()));
        }
    }

    #[test]
    fn rejects_bad_tolerance_and_zero_timeout() {
        let loose = BatchConfig::new(1.5, 2, Duration::from_secs(1));
        assert_eq!(loose.validate(), Err(ConfigError::Tolerance(1.5)));

        let instant = BatchConfig::new(0.1, 2, Duration::ZERO);
        assert_eq!(instant.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn rejects_base_delay_above_max() {
        let cfg = BatchConfig {
            enable_retry: true,
            retry_base_delay_ms: 5_000,
            retry_max_delay_ms: 1_000,
            ..BatchConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RetryDelay { .. })
        ));
    }

    #[test]
    fn env_values_override_defaults() {
        let cfg = BatchConfig::from_lookup(lookup_from(&[
            ("RASTER_BATCH_TOLERANCE", "0.05"),
            ("RASTER_BATCH_CONCURRENCY", "2"),
            ("RASTER_BATCH_TIMEOUT_MS", "250"),
            ("RASTER_BATCH_RETRY", "1"),
            ("RASTER_BATCH_MAX_RETRIES", "5"),
            ("RASTER_BATCH_RETRY_BASE_MS", "40"),
        ]));
        assert!((cfg.tolerance - 0.05).abs() < f64::EPSILON);
        assert_eq!(cfg.concurrency_limit, 2);
        assert_eq!(cfg.per_item_timeout(), Duration::from_millis(250));
        assert!(cfg.enable_retry);
        assert_eq!(cfg.max_retry_attempts, 5);
        assert_eq!(cfg.retry_base_delay(), Duration::from_millis(40));
    }

    #[test]
    fn env_garbage_falls_back_but_range_is_not_clamped() {
        let cfg = BatchConfig::from_lookup(lookup_from(&[
            ("RASTER_BATCH_TIMEOUT_MS", "soon"),
            ("RASTER_BATCH_CONCURRENCY", "12"),
            ("RASTER_BATCH_RETRY", "yes"),
        ]));
        assert_eq!(cfg.per_item_timeout_ms, 30_000);
        assert!(!cfg.enable_retry);
        assert_eq!(cfg.concurrency_limit, 12);
        assert_eq!(cfg.validate(), Err(ConfigError::ConcurrencyLimit(12)));
    }

    #[test]
    fn disabled_retry_allows_no_extra_attempts() {
        let cfg = BatchConfig::default();
        assert_eq!(cfg.retry_policy().max_retries, 0);
        let cfg = cfg.with_retry(3, Duration::from_millis(10));
        assert_eq!(cfg.retry_policy().max_retries, 3);
    }
}
