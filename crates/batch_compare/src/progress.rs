//! Terminal-item progress reporting.

use core::fmt;
use core::panic::AssertUnwindSafe;
use core::sync::atomic::{AtomicUsize, Ordering};
use log::warn;
use std::panic;
use std::sync::Arc;

/// Callback receiving the running count of terminal items.
///
/// It may be invoked concurrently from several workers.
pub type ProgressObserver = Arc<dyn Fn(usize) + Send + Sync>;

/// Shared counter of items that reached a terminal outcome.
#[derive(Default)]
pub struct ProgressTracker {
    finished: AtomicUsize,
    observer: Option<ProgressObserver>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(observer: Option<ProgressObserver>) -> Self {
        Self {
            finished: AtomicUsize::new(0),
            observer,
        }
    }

    /// Counts one more terminal item and notifies the observer.
    ///
    /// Returns the new count. Counts handed to the observer are unique; two
    /// concurrent calls never report the same value. A panicking observer is
    /// logged and otherwise ignored.
    pub fn item_finished(&self) -> usize {
        let count = self.finished.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(observer) = &self.observer
            && panic::catch_unwind(AssertUnwindSafe(|| observer(count))).is_err()
        {
            warn!("progress observer panicked at count {count}");
        }
        count
    }

    #[must_use]
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProgressTracker")
            .field("finished", &self.finished())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
