//! Submission-time errors.
//!
//! Everything that goes wrong with a single item becomes a
//! [`ComparisonOutcome`](raster_compare::ComparisonOutcome). Only invalid
//! configuration or an invalid item list is fatal, and it is reported before
//! any work starts.

use crate::config::MAX_CONCURRENCY;
use core::time::Duration;
use thiserror::Error;

/// Invalid batch configuration or item list.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("concurrency limit {0} is outside of [1, {max}]", max = MAX_CONCURRENCY)]
    ConcurrencyLimit(usize),

    #[error("tolerance {0} is outside of [0.0, 1.0]")]
    Tolerance(f64),

    #[error("per-item timeout must be greater than zero")]
    ZeroTimeout,

    #[error("retry base delay {base:?} exceeds the maximum delay {max:?}")]
    RetryDelay { base: Duration, max: Duration },

    #[error("item index {0} was submitted more than once")]
    DuplicateIndex(usize),
}

/// Result alias for batch submission.
pub type Result<T> = core::result::Result<T, ConfigError>;
