//! Stale-tolerant fetch cache for asynchronous remote reads
//!
//! Serves the most recently cached value for a key immediately, guarantees
//! at most one live fetch per key with newest-wins supersession, bounds
//! each fetch attempt by a timeout with one retry for transient network
//! failures, and revalidates cached entries in the background when the
//! application regains user attention.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use swrfetch::{AttentionHub, FetchOptions, MemoryStore, SwrCache};
//!
//! let hub = AttentionHub::new();
//! let cache = SwrCache::new()
//!     .with_store(Arc::new(MemoryStore::new()))
//!     .with_attention(hub.clone());
//!
//! // Cached value served immediately; a miss runs the fetcher with
//! // timeout and bounded retry, then populates the store.
//! let outcome = cache
//!     .fetch_with_cache("user:1", fetch_user, FetchOptions::default())
//!     .await?;
//!
//! // The host event loop feeds attention signals; armed revalidations fire.
//! hub.window_focused();
//! ```

pub mod attention;
pub mod cancel;
pub mod coordinator;
pub mod error;
pub mod key;
pub mod pipeline;
pub mod store;

pub use attention::{AttentionHub, AttentionSignal, AttentionSubscription};
pub use cancel::CancelToken;
pub use coordinator::RequestCoordinator;
pub use error::{FetchError, KeyError, Outcome, StoreError};
pub use key::{canonicalize, CanonicalKey};
pub use pipeline::{FetchOptions, SwrCache, FETCH_TIMEOUT, MAX_ATTEMPTS};
pub use store::{CacheEntry, CacheStore, DiskStore, MemoryStore};
