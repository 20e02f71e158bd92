//! Error taxonomy and call outcomes
//!
//! Failures carry a structured classification instead of relying on message
//! text: the retry loop in the fetch pipeline asks an error whether it is
//! transient, and the answer is decided at the point of failure. Calls that
//! were superseded by a newer call for the same key are not failures at all;
//! they surface as [`Outcome::Superseded`].

use std::time::Duration;

use thiserror::Error;

/// A cache key could not be reduced to a stable string identity.
///
/// This is the one failure that propagates loudly: it aborts the whole
/// operation before any per-key state is touched or any fetcher runs.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key failed to serialize
    #[error("key cannot be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The key serialized to something with no usable identity
    /// (a null or an empty string)
    #[error("key has no stable string identity")]
    Unrepresentable,
}

/// Failure of a fetch attempt, produced by a fetcher or by the pipeline's
/// own timeout race.
///
/// The variant is the classification: only [`FetchError::Network`] is
/// eligible for the pipeline's single bounded retry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transient network-level failure; eligible for one retry
    #[error("network failure: {0}")]
    Network(String),

    /// The attempt exceeded the per-attempt wall-clock bound. Raised by the
    /// pipeline's timer, which carries no network classification, so it is
    /// terminal for the call
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Any other fetcher failure; never retried
    #[error("fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Classify a failure as transient network trouble.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Classify a failure as terminal.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether the retry loop may try again after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Map transport failures onto the structured taxonomy so reqwest-based
/// fetchers participate in retry classification.
///
/// Timeouts, connection failures, and request-stage failures are transient;
/// decode and status failures are not.
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Network(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// A store adapter failed to read or write an entry.
///
/// Store failures never surface through the pipeline: a failed read
/// degrades to a cache miss and a failed write is logged and dropped.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The entry payload could not be encoded
    #[error("entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result of a coordinated or cached fetch call.
///
/// A call either resolves with a value that is still current, fails with a
/// terminal error, or is silently discarded because a newer call for the
/// same key was initiated while it was in flight. Supersession is a
/// deliberate non-error: a stale call must never surface a misleading
/// failure to its caller and must never overwrite newer state.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The call completed and its value is current
    Resolved(T),
    /// The call failed; the error is terminal for this call
    Failed(FetchError),
    /// A newer call for the same key superseded this one
    Superseded,
}

impl<T> Outcome<T> {
    /// The resolved value, if the call succeeded and was not superseded.
    pub fn resolved(self) -> Option<T> {
        match self {
            Self::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// Whether a newer call discarded this one.
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }

    /// Convert to a `Result`, collapsing supersession into `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, FetchError> {
        match self {
            Self::Resolved(value) => Ok(Some(value)),
            Self::Superseded => Ok(None),
            Self::Failed(err) => Err(err),
        }
    }
}
