//! Cooperative cancellation tokens
//!
//! A token is a signal, not an interruption: the holder of a token is
//! expected to observe it at its own suspension points and stop. The
//! request coordinator threads a token into every operation it runs; the
//! fetch pipeline's timeout race does not forward one to the fetcher.

use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative cancellation signal shared by all clones of a token.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Signal cancellation. Idempotent; wakes every waiter on every clone.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until cancellation is signalled. Returns immediately if it
    /// already has been.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // wait_for only errs when the sender is gone, and we hold it
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Whether two tokens share the same underlying signal.
    pub(crate) fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
