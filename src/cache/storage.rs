//! Durable tier port and record naming
//!
//! Every cached layer is stored as two records: the payload text and the
//! version token it was fetched under. Both are addressed by keys derived from
//! the layer URL.

#[cfg(test)]
use mockall::automock;
use sha2::{Digest, Sha256};

use crate::cache::error::StorageError;

/// Prefix shared by every record this cache writes
pub const RECORD_PREFIX: &str = "geojson_";

/// Kind of durable medium behind a [`RecordStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Device-local file area
    Filesystem,
    /// Size-constrained key/value store
    LocalStorage,
}

/// Trait for a durable key/value medium
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns the medium this store writes to
    fn kind(&self) -> StoreKind;

    /// Reads a record; `Ok(None)` when it does not exist
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Returns true when a record exists, without loading it
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.read(key).await?.is_some())
    }

    /// Creates or overwrites a record
    async fn write(&self, key: &str, text: &str) -> Result<(), StorageError>;

    /// Deletes a record; deleting a missing record is not an error
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Lists the keys of all records
    async fn list(&self) -> Result<Vec<String>, StorageError>;
}

/// Keys of the two records belonging to one layer URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKeys {
    pub data: String,
    pub version: String,
}

impl RecordKeys {
    /// Derive filesystem-safe keys from a URL (lowercase hex SHA-256)
    pub fn for_url(url: &str) -> Self {
        let digest = Sha256::digest(url.as_bytes());
        let id = format!("{:x}", digest);
        Self {
            data: format!("{}{}.json", RECORD_PREFIX, id),
            version: format!("{}version_{}", RECORD_PREFIX, id),
        }
    }
}

/// Returns true when `key` follows this cache's naming convention
pub fn is_cache_record(key: &str) -> bool {
    key.starts_with(RECORD_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Store relying on the default `exists`
    struct MapStore(HashMap<String, String>);

    #[async_trait::async_trait]
    impl RecordStore for MapStore {
        fn kind(&self) -> StoreKind {
            StoreKind::Filesystem
        }

        async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.0.get(key).cloned())
        }

        async fn write(&self, _key: &str, _text: &str) -> Result<(), StorageError> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }

        async fn list(&self) -> Result<Vec<String>, StorageError> {
            Ok(self.0.keys().cloned().collect())
        }
    }

    #[tokio::test]
    async fn exists_defaults_to_read() {
        let store = MapStore(HashMap::from([("k".to_string(), "v".to_string())]));

        assert!(store.exists("k").await.unwrap());
        assert!(!store.exists("missing").await.unwrap());
    }

    #[test]
    fn for_url_is_deterministic_and_filesystem_safe() {
        let a = RecordKeys::for_url("https://example/a.geojson");
        let again = RecordKeys::for_url("https://example/a.geojson");

        assert_eq!(a, again);
        for key in [&a.data, &a.version] {
            assert!(is_cache_record(key));
            assert!(
                key.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
            );
        }
        assert!(a.data.ends_with(".json"));
        assert!(a.version.starts_with("geojson_version_"));
    }

    #[test]
    fn for_url_separates_distinct_urls() {
        let a = RecordKeys::for_url("https://example/a.geojson");
        let b = RecordKeys::for_url("https://example/b.geojson");

        assert_ne!(a.data, b.data);
        assert_ne!(a.version, b.version);
        assert_ne!(a.data, a.version);
    }

    #[test]
    fn is_cache_record_ignores_foreign_keys() {
        assert!(!is_cache_record("bookings.db"));
        assert!(!is_cache_record("my_geojson_notes.txt"));
    }
}
