//! In-memory store adapter

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::key::CanonicalKey;

use super::{CacheEntry, CacheStore};

/// Process-local store backed by a `HashMap`.
///
/// The default adapter for tests and short-lived agents. Entries live until
/// overwritten or the store is dropped; there is no eviction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn read(&self, key: &CanonicalKey) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.lock().get(key.as_str()).cloned())
    }

    async fn write(&self, key: &CanonicalKey, entry: CacheEntry) -> Result<(), StoreError> {
        self.lock().insert(key.as_str().to_owned(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::canonicalize;

    #[tokio::test]
    async fn test_read_returns_none_for_missing_key() {
        let store = MemoryStore::new();
        let key = canonicalize("missing").expect("key should canonicalize");

        let entry = store.read(&key).await.expect("read should succeed");
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_returns_the_entry() {
        let store = MemoryStore::new();
        let key = canonicalize("user:1").expect("key should canonicalize");
        let entry = CacheEntry::new(&"Ann").expect("payload should encode");

        store
            .write(&key, entry.clone())
            .await
            .expect("write should succeed");

        let read_back = store
            .read(&key)
            .await
            .expect("read should succeed")
            .expect("entry should exist");
        assert_eq!(read_back, entry);
    }

    #[tokio::test]
    async fn test_write_overwrites_the_previous_entry() {
        let store = MemoryStore::new();
        let key = canonicalize("user:1").expect("key should canonicalize");

        let first = CacheEntry::new(&"first").expect("payload should encode");
        let second = CacheEntry::new(&"second").expect("payload should encode");
        store.write(&key, first).await.expect("write should succeed");
        store
            .write(&key, second.clone())
            .await
            .expect("write should succeed");

        let read_back = store
            .read(&key)
            .await
            .expect("read should succeed")
            .expect("entry should exist");
        assert_eq!(read_back, second);
        assert_eq!(store.len(), 1);
    }
}
