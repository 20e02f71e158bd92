//! Cache store adapters
//!
//! The fetch pipeline reads and writes cached entries exclusively through
//! the [`CacheStore`] capability. The store is an external collaborator:
//! this crate implements no eviction or TTL policy of its own, and a
//! pipeline built without a store degrades to always-fetch. Two adapters
//! ship with the crate: an in-memory map and a JSON-file store.

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::key::CanonicalKey;

/// A single cached record.
///
/// The payload is opaque to this layer; no TTL or version metadata is
/// attached. Staleness is a store-level concept that adapters may track
/// privately but never expose across this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached payload
    pub data: serde_json::Value,
}

impl CacheEntry {
    /// Wrap a serializable payload into an entry.
    pub fn new<T: Serialize>(data: &T) -> Result<Self, StoreError> {
        Ok(Self {
            data: serde_json::to_value(data)?,
        })
    }

    /// Decode the payload as `T`.
    ///
    /// Returns `None` when the stored shape no longer matches the requested
    /// type; callers treat that as a cache miss.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.data.clone()).ok()
    }
}

/// Capability interface over an external key-value cache.
///
/// Implementations own persisted entries exclusively; the pipeline never
/// touches storage except through this contract.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the entry stored for `key`, if any.
    async fn read(&self, key: &CanonicalKey) -> Result<Option<CacheEntry>, StoreError>;

    /// Replace the entry stored for `key`.
    async fn write(&self, key: &CanonicalKey, entry: CacheEntry) -> Result<(), StoreError>;
}
