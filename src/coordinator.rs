//! Per-key request coordination
//!
//! Guarantees at most one live request per canonical key and that only the
//! response matching the latest generation is ever observable. A new call
//! for a key cancels whatever is in flight, takes over the key's
//! generation, and becomes the only call whose outcome is surfaced; every
//! superseded predecessor resolves to [`Outcome::Superseded`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{FetchError, KeyError, Outcome};
use crate::key::{canonicalize, CanonicalKey};

/// Per-key bookkeeping: generation counters and in-flight cancellation
/// tokens.
///
/// The coordinator exclusively owns both maps; no other component reads or
/// mutates them. Construct one coordinator per logical cache and inject it
/// wherever dedup behavior is needed; state is never ambient, so tests can
/// run independent coordinators side by side.
#[derive(Debug, Default)]
pub struct RequestCoordinator {
    state: Mutex<CoordinatorState>,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    /// Monotonic generation per canonical key, starting at 0
    generations: HashMap<String, u64>,
    /// Cancellation token of the in-flight request per key, at most one
    in_flight: HashMap<String, CancelToken>,
}

impl RequestCoordinator {
    /// Create a coordinator with no per-key state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` as the single live request for `key`.
    ///
    /// Any request already in flight for the key is signalled to cancel
    /// before `operation` starts; the superseded operation is expected to
    /// observe its token and stop. When a later call supersedes this one
    /// while it is suspended, its outcome (success or failure) is
    /// discarded as [`Outcome::Superseded`] rather than surfaced: a stale
    /// call must never overwrite newer state or report a misleading error
    /// to its caller.
    ///
    /// # Arguments
    /// * `key` - The structured key identifying the resource
    /// * `operation` - The request to run; receives a fresh cancellation
    ///   token it should observe at its suspension points
    ///
    /// # Returns
    /// * `Ok(Outcome)` - Resolved, failed, or superseded
    /// * `Err(KeyError)` - If the key cannot be canonicalized; nothing ran
    pub async fn dedup_execute<K, T, F, Fut>(
        &self,
        key: &K,
        operation: F,
    ) -> Result<Outcome<T>, KeyError>
    where
        K: Serialize + ?Sized,
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let key = canonicalize(key)?;
        let (my_generation, token) = self.begin(&key);

        let result = operation(token.clone()).await;

        self.settle(&key, &token);

        if self.current_generation(&key) != my_generation {
            debug!(key = key.as_str(), "request superseded; outcome discarded");
            return Ok(Outcome::Superseded);
        }

        Ok(match result {
            Ok(value) => Outcome::Resolved(value),
            Err(err) => Outcome::Failed(err),
        })
    }

    /// Bump the key's generation, cancel any in-flight request, and install
    /// a fresh token. One counter increment and one token registration per
    /// call; the lock is never held across an await.
    fn begin(&self, key: &CanonicalKey) -> (u64, CancelToken) {
        let mut state = self.lock();

        let generation = state.generations.entry(key.as_str().to_owned()).or_insert(0);
        *generation += 1;
        let my_generation = *generation;

        if let Some(previous) = state.in_flight.remove(key.as_str()) {
            previous.cancel();
        }

        let token = CancelToken::new();
        state.in_flight.insert(key.as_str().to_owned(), token.clone());

        (my_generation, token)
    }

    /// Remove the in-flight registration, but only if it still belongs to
    /// the settling call; a newer call may have installed its own token.
    fn settle(&self, key: &CanonicalKey, token: &CancelToken) {
        let mut state = self.lock();
        let still_ours = state
            .in_flight
            .get(key.as_str())
            .is_some_and(|current| current.same_as(token));
        if still_ours {
            state.in_flight.remove(key.as_str());
        }
    }

    fn current_generation(&self, key: &CanonicalKey) -> u64 {
        self.lock()
            .generations
            .get(key.as_str())
            .copied()
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
