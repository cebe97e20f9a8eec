//! Per-run metrics.
//!
//! A [`MetricsCollector`] is created when a batch starts and fed by the
//! orchestrator as items reach a terminal outcome. Once every item is terminal,
//! [`MetricsCollector::finish`] returns the frozen [`BatchRunMetrics`].

use chrono::{DateTime, Utc};
use core::sync::atomic::{AtomicUsize, Ordering};
use core::time::Duration;
use raster_compare::{ComparisonOutcome, OutcomeTag};
use serde::{Serialize, Serializer};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use uuid::Uuid;

/// Items per outcome bucket. `completed` is `matched + mismatched`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub completed: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, tag: OutcomeTag) {
        match tag {
            OutcomeTag::Matched => {
                self.matched += 1;
                self.completed += 1;
            }
            OutcomeTag::Mismatched => {
                self.mismatched += 1;
                self.completed += 1;
            }
            OutcomeTag::Failed => self.failed += 1,
            OutcomeTag::TimedOut => self.timed_out += 1,
            OutcomeTag::Cancelled => self.cancelled += 1,
        }
    }

    /// Sum over the terminal buckets; equals the item count once a run is over.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.completed + self.failed + self.timed_out + self.cancelled
    }
}

/// Tracks how many comparisons hold a slot right now, and the peak.
#[derive(Debug, Default)]
pub struct InflightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InflightGauge {
    /// Marks one comparison as in flight until the guard is dropped.
    pub fn enter(&self) -> InflightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InflightGuard { gauge: self }
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the owning [`InflightGauge`] on drop.
#[derive(Debug)]
pub struct InflightGuard<'gauge> {
    gauge: &'gauge InflightGauge,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mutable metrics for a batch that is still running.
#[derive(Debug)]
pub struct MetricsCollector {
    correlation_id: Uuid,
    started_at: DateTime<Utc>,
    started: Instant,
    total_items: usize,
    concurrency_level: usize,
    counts: Mutex<OutcomeCounts>,
    retries: AtomicUsize,
    inflight: InflightGauge,
}

impl MetricsCollector {
    /// Starts the clock and assigns a fresh correlation id.
    #[must_use]
    pub fn start(total_items: usize, concurrency_level: usize) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: Instant::now(),
            total_items,
            concurrency_level,
            counts: Mutex::new(OutcomeCounts::default()),
            retries: AtomicUsize::new(0),
            inflight: InflightGauge::default(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    #[inline]
    #[must_use]
    pub const fn inflight(&self) -> &InflightGauge {
        &self.inflight
    }

    pub fn record_outcome(&self, outcome: &ComparisonOutcome) {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(outcome.tag());
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn counts(&self) -> OutcomeCounts {
        *self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops the clock and returns a frozen copy of the collected values.
    #[must_use]
    pub fn finish(&self) -> BatchRunMetrics {
        BatchRunMetrics {
            correlation_id: self.correlation_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration: self.started.elapsed(),
            total_items: self.total_items,
            counts: self.counts(),
            retries: self.retries.load(Ordering::Relaxed),
            concurrency_level: self.concurrency_level,
            peak_concurrency: self.inflight.peak(),
        }
    }
}

/// Read-only metrics of a finished batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRunMetrics {
    pub correlation_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub total_items: usize,
    pub counts: OutcomeCounts,
    pub retries: usize,
    pub concurrency_level: usize,
    pub peak_concurrency: usize,
}

impl BatchRunMetrics {
    /// Items per second; zero for a zero-length run.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let seconds = self.duration.as_secs_f64();
        if seconds > 0.0 {
            self.total_items as f64 / seconds
        } else {
            0.0
        }
    }

    /// Wall time divided by item count; zero for an empty batch.
    #[must_use]
    pub fn average_time_per_item(&self) -> Duration {
        u32::try_from(self.total_items)
            .ok()
            .and_then(|items| self.duration.checked_div(items))
            .unwrap_or(Duration::ZERO)
    }

    /// One-line JSON summary including the derived rates.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn summary_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Summary<'metrics> {
            #[serde(flatten)]
            metrics: &'metrics BatchRunMetrics,
            throughput_per_sec: f64,
            #[serde(serialize_with = "serialize_millis")]
            average_time_per_item_ms: Duration,
        }

        serde_json::to_string(&Summary {
            metrics: self,
            throughput_per_sec: self.throughput(),
            average_time_per_item_ms: self.average_time_per_item(),
        })
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
}
