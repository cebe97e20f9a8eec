//! Bounded-concurrency batch runner for raster comparisons.
//!
//! A batch is a list of [`BatchItem`]s run by a [`BatchOrchestrator`] under
//! one [`BatchConfig`]. The orchestrator admits at most `concurrency_limit`
//! comparisons at once, honours a per-item timeout and cooperative
//! cancellation, optionally retries failed items with exponential backoff, and
//! always returns exactly one [`BatchResult`] per item together with the run's
//! [`BatchRunMetrics`].

pub mod cancel;
pub mod config;
pub mod error;
pub mod item;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod retry;

pub use cancel::{CancelHandle, CancelSignal};
pub use config::{BatchConfig, MAX_CONCURRENCY};
pub use error::{ConfigError, Result};
pub use item::{BatchItem, BatchResult};
pub use metrics::{BatchRunMetrics, InflightGauge, MetricsCollector, OutcomeCounts};
pub use orchestrator::{BatchOrchestrator, BatchReport, Comparator};
pub use progress::{ProgressObserver, ProgressTracker};
pub use retry::RetryPolicy;
