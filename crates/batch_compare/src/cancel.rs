//! Cooperative batch cancellation.
//!
//! A [`CancelHandle`] is held by whoever may stop the batch; every worker
//! gets a cheap [`CancelSignal`] clone. Cancellation is sticky: once raised it
//! cannot be cleared.

use futures::future;
use tokio::sync::watch;

/// Raises cancellation for every signal created from it.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

/// Observes a [`CancelHandle`].
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelHandle {
    /// Creates a handle together with its first signal.
    #[must_use]
    pub fn new() -> (Self, CancelSignal) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, CancelSignal { receiver })
    }

    /// Requests cancellation. Calling it more than once is harmless.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Another signal tied to this handle.
    #[must_use]
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl CancelSignal {
    /// A signal that is never raised.
    #[must_use]
    pub fn never() -> Self {
        let (sender, receiver) = watch::channel(false);
        // Once the sender is gone `cancelled()` parks forever.
        drop(sender);
        Self { receiver }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation has been requested.
    ///
    /// If the handle is dropped without cancelling, this never resolves.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|&raised| raised).await.is_err() {
            future::pending::<()>().await;
        }
    }
}
