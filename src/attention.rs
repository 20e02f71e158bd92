//! Focus and visibility revalidation triggers
//!
//! The host application feeds "user returned attention" signals into an
//! [`AttentionHub`]; this core consumes them, never emits them. Each
//! subscriber gets its callback invoked once per forwarded signal, after
//! yielding one scheduling turn. Signals from the two sources are not
//! deduplicated: a visibility change and a focus gain arriving close
//! together invoke the callback twice.

use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cancel::CancelToken;

/// Capacity of the signal fan-out channel. Attention signals are rare and
/// listeners drain fast; lagging listeners skip missed signals.
const SIGNAL_BUFFER: usize = 16;

/// A host-provided attention signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionSignal {
    /// The document changed to a non-hidden state
    Visible,
    /// The window regained focus
    Focused,
}

/// Fan-out point for host attention signals.
///
/// Two sources feed the hub: document visibility changes and window focus
/// gains. Cloning the hub clones the sending side; all clones reach the
/// same subscribers.
#[derive(Debug, Clone)]
pub struct AttentionHub {
    tx: broadcast::Sender<AttentionSignal>,
}

impl AttentionHub {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(SIGNAL_BUFFER);
        Self { tx }
    }

    /// Report a document visibility change.
    ///
    /// Only the transition to a non-hidden state is forwarded to
    /// subscribers; going hidden is not an attention gain.
    pub fn visibility_changed(&self, hidden: bool) {
        if !hidden {
            let _ = self.tx.send(AttentionSignal::Visible);
        }
    }

    /// Report that the window regained focus.
    pub fn window_focused(&self) {
        let _ = self.tx.send(AttentionSignal::Focused);
    }

    /// Invoke `callback` whenever attention returns.
    ///
    /// Each forwarded signal invokes the callback after one scheduling
    /// turn (debounced to the next tick, not coalesced across sources).
    /// The returned subscription removes the listener when dropped or
    /// explicitly unsubscribed; a caller that arms a subscription owns its
    /// disposal.
    pub fn on_attention_regained<F>(&self, callback: F) -> AttentionSubscription
    where
        F: Fn(AttentionSignal) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let mut rx = self.tx.subscribe();
        let cancel = CancelToken::new();
        let guard = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = guard.cancelled() => break,
                    signal = rx.recv() => match signal {
                        Ok(signal) => {
                            // Debounce to the next scheduling turn
                            tokio::task::yield_now().await;
                            callback(signal).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "attention listener lagged; skipping missed signals");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        AttentionSubscription { cancel, handle }
    }

    /// Number of armed listeners.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AttentionHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for an armed attention listener. Unsubscribes on drop.
#[derive(Debug)]
pub struct AttentionSubscription {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

impl AttentionSubscription {
    /// Remove the listener now instead of waiting for drop.
    pub fn unsubscribe(self) {}

    /// Whether the listener task has fully wound down.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for AttentionSubscription {
    fn drop(&mut self) {
        // Cooperative: an in-flight callback finishes, then the loop exits
        self.cancel.cancel();
    }
}
