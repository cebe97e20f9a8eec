#![allow(dead_code, reason = "each test binary uses a different subset of helpers")]

use anyhow::Result;
use batch_compare::{BatchItem, Comparator};
use core::sync::atomic::{AtomicUsize, Ordering};
use core::time::Duration;
use env_logger::{Builder as LogBuilder, Env as EnvLoggerEnv};
use raster_compare::{ComparisonOutcome, ComparisonRequest, ComparisonUnit, INK, RasterImage};
use std::panic;
use std::sync::Arc;
use std::thread;

/// Initialise logging for tests. Honours `RUST_LOG`, defaults to `error`.
pub fn init_test_logger() {
    let _ignore_result = LogBuilder::from_env(EnvLoggerEnv::default().filter_or("RUST_LOG", "error"))
        .is_test(false)
        .try_init();
}

/// `count` identical 8x8 pairs labelled `item-<index>`.
pub fn identical_items(count: usize) -> Result<Vec<BatchItem>> {
    let pairs = (0..count).map(|index| {
        (
            format!("item-{index}"),
            RasterImage::blank(8, 8),
            RasterImage::blank(8, 8),
        )
    });
    Ok(BatchItem::from_pairs(pairs, 0.0)?)
}

/// A pair whose actual image has `changed` ink pixels on the first row.
pub fn changed_item(index: usize, changed: u32, tolerance: f64) -> Result<BatchItem> {
    let expected = RasterImage::blank(10, 10);
    let actual = (0..changed).fold(expected.clone(), |img, x_pos| img.with_pixel(x_pos, 0, INK));
    let request = ComparisonRequest::new(expected, actual, format!("item-{index}"), tolerance)?;
    Ok(BatchItem::new(index, request))
}

/// Counts calls and the number of comparisons running at the same time.
#[derive(Debug, Default)]
pub struct Probe {
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Probe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn enter(&self) -> usize {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        call
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Comparator with scripted latency, failures and panics around the real
/// [`ComparisonUnit`].
#[derive(Debug, Default)]
pub struct Scripted {
    pub probe: Arc<Probe>,
    /// Sleep applied to every call.
    pub delay: Duration,
    /// Label that sleeps for a different duration.
    pub slow: Option<(String, Duration)>,
    /// The first `slow_calls.0` calls sleep for `slow_calls.1` instead.
    pub slow_calls: (usize, Duration),
    /// The first `failures` calls return an error.
    pub failures: usize,
    /// Label whose comparison panics.
    pub explode: Option<String>,
}

impl Scripted {
    pub fn new(probe: &Arc<Probe>) -> Self {
        Self {
            probe: Arc::clone(probe),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_slow(mut self, label: &str, delay: Duration) -> Self {
        self.slow = Some((label.to_owned(), delay));
        self
    }

    pub fn with_slow_calls(mut self, calls: usize, delay: Duration) -> Self {
        self.slow_calls = (calls, delay);
        self
    }

    pub fn with_failures(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    pub fn with_explosion(mut self, label: &str) -> Self {
        self.explode = Some(label.to_owned());
        self
    }

    fn delay_for(&self, call: usize, label: &str) -> Duration {
        let (slow_calls, slow_delay) = self.slow_calls;
        if call < slow_calls {
            return slow_delay;
        }
        match &self.slow {
            Some((slow_label, delay)) if slow_label == label => *delay,
            _ => self.delay,
        }
    }
}

impl Comparator for Scripted {
    fn compare(&self, request: ComparisonRequest) -> Result<ComparisonOutcome> {
        let call = self.probe.enter();
        thread::sleep(self.delay_for(call, request.label()));
        self.probe.exit();

        if self.explode.as_deref() == Some(request.label()) {
            panic::panic_any("comparator exploded");
        }
        if call < self.failures {
            anyhow::bail!("transient failure on call {call}");
        }
        Ok(ComparisonUnit::default().evaluate(request))
    }
}
