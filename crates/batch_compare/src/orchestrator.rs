//! Bounded-concurrency batch runner.
//!
//! [`BatchOrchestrator::run_batch`] fans every item out onto its own tokio
//! task. Tasks wait on a semaphore sized from the run's config before the
//! comparison is handed to the blocking pool, so at most `concurrency_limit`
//! comparisons hold a slot at any time. Results are collected in a shared
//! sink and returned sorted by index once every task has finished.
//!
//! Per item the runner checks cancellation before waiting for a slot, while
//! waiting, and again after acquiring it. Each attempt is raced against the
//! per-item timeout. Comparator errors and panics are turned into `Failed`
//! outcomes for that item only.

use crate::cancel::CancelSignal;
use crate::config::BatchConfig;
use crate::error::Result;
use crate::item::{BatchItem, BatchResult, check_unique_indices};
use crate::metrics::{BatchRunMetrics, MetricsCollector};
use crate::progress::{ProgressObserver, ProgressTracker};
use crate::retry::RetryPolicy;
use core::fmt;
use core::time::Duration;
use futures::future::join_all;
use log::{debug, info, warn};
use raster_compare::{ComparisonOutcome, ComparisonRequest, ComparisonUnit, RasterImage};
use serde::Serialize;
use std::collections::HashSet;
use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task;
use tokio::time::{sleep, timeout};

/// The operation run for every item.
///
/// Implementations run on the blocking pool and may be called from several
/// threads at once.
pub trait Comparator: Send + Sync + 'static {
    /// Compares one request.
    ///
    /// # Errors
    ///
    /// Any error is recorded as a `Failed` outcome for this item; it never
    /// affects other items.
    fn compare(&self, request: ComparisonRequest) -> anyhow::Result<ComparisonOutcome>;
}

impl Comparator for ComparisonUnit {
    fn compare(&self, request: ComparisonRequest) -> anyhow::Result<ComparisonOutcome> {
        Ok(self.evaluate(request))
    }
}

/// Everything a finished batch hands back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// One result per submitted item, sorted by index.
    pub results: Vec<BatchResult>,
    pub metrics: BatchRunMetrics,
}

impl BatchReport {
    /// Result for the item submitted with `index`.
    #[must_use]
    pub fn result(&self, index: usize) -> Option<&BatchResult> {
        self.results
            .binary_search_by_key(&index, |result| result.index)
            .ok()
            .and_then(|pos| self.results.get(pos))
    }
}

/// Runs batches of comparisons under one configuration.
///
/// Each call to [`BatchOrchestrator::run_batch`] gets its own worker pool; a
/// running batch never changes its concurrency.
pub struct BatchOrchestrator {
    config: BatchConfig,
    comparator: Arc<dyn Comparator>,
    observer: Option<ProgressObserver>,
}

impl BatchOrchestrator {
    /// Orchestrator running the default [`ComparisonUnit`].
    #[must_use]
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            comparator: Arc::new(ComparisonUnit::default()),
            observer: None,
        }
    }

    #[must_use]
    pub fn with_comparator<C: Comparator>(mut self, comparator: C) -> Self {
        self.comparator = Arc::new(comparator);
        self
    }

    /// Registers a callback receiving the running count of terminal items.
    #[must_use]
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Builds items from `(label, expected, actual)` triples using the
    /// configured tolerance, then runs them with [`BatchOrchestrator::run_batch`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::ConfigError) before any work starts if
    /// the configuration is invalid.
    pub async fn run_pairs<I, L>(&self, pairs: I, cancel: CancelSignal) -> Result<BatchReport>
    where
        I: IntoIterator<Item = (L, RasterImage, RasterImage)>,
        L: Into<String>,
    {
        self.config.validate()?;
        let items = BatchItem::from_pairs(pairs, self.config.tolerance)?;
        self.run_batch(items, cancel).await
    }

    /// Runs every item and returns one result per item plus run metrics.
    ///
    /// Each item is judged at the tolerance carried by its own request; use
    /// [`BatchOrchestrator::run_pairs`] to apply the configured tolerance.
    ///
    /// Item-level problems (size mismatch, comparator errors, panics,
    /// timeouts, cancellation) never fail the call.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::ConfigError) before any work starts if
    /// the configuration is invalid or two items share an index.
    pub async fn run_batch(
        &self,
        items: Vec<BatchItem>,
        cancel: CancelSignal,
    ) -> Result<BatchReport> {
        self.config.validate()?;
        check_unique_indices(&items)?;

        let metrics = MetricsCollector::start(items.len(), self.config.concurrency_limit);
        let prefix = format!("[batch {}]", metrics.correlation_id());
        info!(
            "{prefix} starting {} item(s): concurrency {}, timeout {:?}, retries {}",
            items.len(),
            self.config.concurrency_limit,
            self.config.per_item_timeout(),
            self.config.retry_policy().max_retries,
        );

        let state = Arc::new(RunState {
            prefix,
            semaphore: Semaphore::new(self.config.concurrency_limit),
            comparator: Arc::clone(&self.comparator),
            cancel,
            per_item_timeout: self.config.per_item_timeout(),
            retry: self.config.retry_policy(),
            progress: ProgressTracker::new(self.observer.clone()),
            sink: Mutex::new(Vec::with_capacity(items.len())),
            total_items: items.len(),
            metrics,
        });

        let mut keys = Vec::with_capacity(items.len());
        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            keys.push((item.index, item.request.label().to_owned()));
            handles.push(task::spawn(Arc::clone(&state).run_item(item)));
        }

        let lost: Vec<_> = keys
            .into_iter()
            .zip(join_all(handles).await)
            .filter_map(|(key, joined)| joined.err().map(|err| (key, err)))
            .collect();
        if !lost.is_empty() {
            let recorded: HashSet<usize> = state
                .sink
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|result| result.index)
                .collect();
            for ((index, label), err) in lost {
                if recorded.contains(&index) {
                    warn!(
                        "{} item {index} ({label}) worker failed after recording: {err}",
                        state.prefix
                    );
                    continue;
                }
                state.record(
                    index,
                    label,
                    ComparisonOutcome::failed(format!("worker task failed: {err}")),
                    0,
                );
            }
        }

        let mut results = mem::take(&mut *state.sink.lock().unwrap_or_else(PoisonError::into_inner));
        results.sort_by_key(|result| result.index);
        let run_metrics = state.metrics.finish();

        match run_metrics.summary_json() {
            Ok(line) => info!("{} finished: {line}", state.prefix),
            Err(err) => warn!("{} finished, summary unavailable: {err}", state.prefix),
        }
        Ok(BatchReport {
            results,
            metrics: run_metrics,
        })
    }
}

impl fmt::Debug for BatchOrchestrator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BatchOrchestrator")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

/// Shared state of one running batch. Only the orchestrator and its tasks
/// can reach it.
struct RunState {
    prefix: String,
    semaphore: Semaphore,
    comparator: Arc<dyn Comparator>,
    cancel: CancelSignal,
    per_item_timeout: Duration,
    retry: RetryPolicy,
    progress: ProgressTracker,
    sink: Mutex<Vec<BatchResult>>,
    total_items: usize,
    metrics: MetricsCollector,
}

impl RunState {
    async fn run_item(self: Arc<Self>, item: BatchItem) {
        let BatchItem { index, request } = item;
        let mut attempts = 0_u32;

        let outcome = loop {
            if self.cancel.is_cancelled() {
                break ComparisonOutcome::Cancelled;
            }

            let permit = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                acquired = self.semaphore.acquire() => acquired.ok(),
            };
            let Some(permit) = permit else {
                break ComparisonOutcome::Cancelled;
            };
            if self.cancel.is_cancelled() {
                break ComparisonOutcome::Cancelled;
            }

            attempts += 1;
            let outcome = {
                let _inflight = self.metrics.inflight().enter();
                self.attempt(request.clone()).await
            };
            drop(permit);

            if !outcome.is_retryable() || !self.retry.allows_retry(attempts) {
                break outcome;
            }

            let delay = self.retry.backoff(attempts - 1);
            self.metrics.record_retry();
            warn!(
                "{} item {index} ({}) attempt {attempts} ended {:?}, retrying in {delay:?}",
                self.prefix,
                request.label(),
                outcome.tag(),
            );
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break ComparisonOutcome::Cancelled,
                () = sleep(delay) => {}
            }
        };

        self.record(index, request.label().to_owned(), outcome, attempts);
    }

    /// One comparison on the blocking pool, raced against the item timeout.
    ///
    /// On timeout the blocking work is left to finish on its own and its
    /// result is discarded.
    async fn attempt(&self, request: ComparisonRequest) -> ComparisonOutcome {
        let comparator = Arc::clone(&self.comparator);
        let work = task::spawn_blocking(move || comparator.compare(request));
        match timeout(self.per_item_timeout, work).await {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(err))) => ComparisonOutcome::failed(format!("{err:#}")),
            Ok(Err(err)) => ComparisonOutcome::failed(format!("comparison aborted: {err}")),
            Err(_elapsed) => ComparisonOutcome::TimedOut,
        }
    }

    fn record(&self, index: usize, label: String, outcome: ComparisonOutcome, attempts: u32) {
        match &outcome {
            ComparisonOutcome::Failed { reason } => {
                warn!("{} item {index} ({label}) failed: {reason}", self.prefix);
            }
            ComparisonOutcome::TimedOut => {
                warn!(
                    "{} item {index} ({label}) timed out after {:?}",
                    self.prefix, self.per_item_timeout
                );
            }
            ComparisonOutcome::Matched { .. }
            | ComparisonOutcome::Mismatched { .. }
            | ComparisonOutcome::Cancelled => {
                debug!("{} item {index} ({label}) {:?}", self.prefix, outcome.tag());
            }
        }

        self.metrics.record_outcome(&outcome);
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(BatchResult {
                index,
                label,
                outcome,
                attempts,
            });
        let finished = self.progress.item_finished();
        debug!("{} progress {finished}/{}", self.prefix, self.total_items);
    }
}
