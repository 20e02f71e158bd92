//! Disk-backed store adapter
//!
//! Persists one JSON file per canonical key in an XDG-compliant cache
//! directory (`~/.cache/<app>/` on Linux). Read failures (a missing file,
//! unreadable content, unparseable JSON) surface as an absent entry so the
//! pipeline degrades to a fetch instead of an error.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::key::CanonicalKey;

use super::{CacheEntry, CacheStore};

/// On-disk representation of a cached entry.
///
/// `cached_at` is store-level metadata; it never crosses the adapter
/// boundary.
#[derive(Debug, Serialize, Deserialize)]
struct DiskRecord {
    /// The cached payload
    data: serde_json::Value,
    /// When the entry was written
    cached_at: DateTime<Utc>,
}

/// Store adapter persisting entries as JSON files.
///
/// Canonical keys are hex-encoded into file names so arbitrary identities
/// (JSON renderings, URLs, colons) stay filesystem-safe.
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Directory where entry files are stored
    cache_dir: PathBuf,
}

impl DiskStore {
    /// Create a store under the XDG cache directory for `app`.
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no
    /// home directory).
    pub fn new(app: &str) -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", app)?;
        Some(Self {
            cache_dir: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Create a store with a custom directory.
    ///
    /// Useful for testing or when a specific cache location is needed.
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Returns the path to the entry file for the given key.
    fn entry_path(&self, key: &CanonicalKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", hex::encode(key.as_str())))
    }

    /// Ensures the cache directory exists.
    async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn read(&self, key: &CanonicalKey) -> Result<Option<CacheEntry>, StoreError> {
        let path = self.entry_path(key);
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(_) => return Ok(None),
        };
        let record: DiskRecord = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(_) => return Ok(None),
        };
        Ok(Some(CacheEntry { data: record.data }))
    }

    async fn write(&self, key: &CanonicalKey, entry: CacheEntry) -> Result<(), StoreError> {
        self.ensure_dir().await?;

        let record = DiskRecord {
            data: entry.data,
            cached_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record)?;

        tokio::fs::write(self.entry_path(key), json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::canonicalize;
    use tempfile::TempDir;

    fn create_test_store() -> (DiskStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = DiskStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_write_creates_file_in_cache_directory() {
        let (store, temp_dir) = create_test_store();
        let key = canonicalize("user:1").expect("key should canonicalize");
        let entry = CacheEntry::new(&"Ann").expect("payload should encode");

        store.write(&key, entry).await.expect("write should succeed");

        let expected = temp_dir
            .path()
            .join(format!("{}.json", hex::encode("user:1")));
        assert!(expected.exists(), "entry file should exist");

        let content = std::fs::read_to_string(&expected).expect("should read file");
        assert!(content.contains("\"data\""));
        assert!(content.contains("\"cached_at\""));
    }

    #[tokio::test]
    async fn test_read_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();
        let key = canonicalize("nonexistent").expect("key should canonicalize");

        let entry = store.read(&key).await.expect("read should succeed");
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn test_entry_survives_a_roundtrip_through_disk() {
        let (store, _temp_dir) = create_test_store();
        let key = canonicalize(&("user", 1)).expect("key should canonicalize");
        let entry = CacheEntry::new(&serde_json::json!({"name": "Ann", "age": 30}))
            .expect("payload should encode");

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
    async fn test_corrupt_file_reads_as_absent() {
        let (store, temp_dir) = create_test_store();
        let key = canonicalize("user:1").expect("key should canonicalize");

        std::fs::create_dir_all(temp_dir.path()).expect("should create dir");
        std::fs::write(
            temp_dir
                .path()
                .join(format!("{}.json", hex::encode("user:1"))),
            "{ not valid json",
        )
        .expect("should write corrupt file");

        let entry = store.read(&key).await.expect("read should succeed");
        assert!(entry.is_none(), "corrupt entry should read as absent");
    }

    #[tokio::test]
    async fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("cache");
        let store = DiskStore::with_dir(nested.clone());

        let key = canonicalize("user:1").expect("key should canonicalize");
        let entry = CacheEntry::new(&"Ann").expect("payload should encode");
        store.write(&key, entry).await.expect("write should succeed");

        assert!(nested.exists(), "nested directory should be created");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_the_entry() {
        let (store, _temp_dir) = create_test_store();
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
    }

    #[tokio::test]
    async fn test_keys_with_unsafe_characters_map_to_safe_file_names() {
        let (store, temp_dir) = create_test_store();
        let key = canonicalize(&serde_json::json!({"url": "https://api/x?a=1&b=2"}))
            .expect("key should canonicalize");
        let entry = CacheEntry::new(&"payload").expect("payload should encode");

        store.write(&key, entry).await.expect("write should succeed");

        for file in std::fs::read_dir(temp_dir.path()).expect("should list dir") {
            let name = file.expect("should read dir entry").file_name();
            let name = name.to_string_lossy();
            assert!(
                name.chars()
                    .all(|c| c.is_ascii_hexdigit() || c == '.' || c == 'j' || c == 's' || c == 'o' || c == 'n'),
                "file name should be hex-encoded: {}",
                name
            );
        }
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = DiskStore::new("swrfetch-test") {
            let path_str = store.cache_dir.to_string_lossy();
            assert!(
                path_str.contains("swrfetch-test"),
                "cache path should contain the app name"
            );
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
