//! Tiered resolution of layer payloads: memory, then durable store, then network

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::error::{CacheError, FetchError};
use crate::cache::fetcher::Fetcher;
use crate::cache::manifest::ManifestLoader;
use crate::cache::storage::{RecordKeys, RecordStore, StoreKind, is_cache_record};
use crate::cache::version;

/// Tier that satisfied a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Memory,
    Filesystem,
    LocalStorage,
    Network,
}

impl Provenance {
    fn durable(kind: StoreKind) -> Self {
        match kind {
            StoreKind::Filesystem => Provenance::Filesystem,
            StoreKind::LocalStorage => Provenance::LocalStorage,
        }
    }

    /// Coarse origin label: `memory`, `local` or `network`
    pub fn status(&self) -> &'static str {
        match self {
            Provenance::Memory => "memory",
            Provenance::Filesystem | Provenance::LocalStorage => "local",
            Provenance::Network => "network",
        }
    }

    /// Cache label: `memory`, `filesystem`, `localStorage` or `none`
    pub fn cache_type(&self) -> &'static str {
        match self {
            Provenance::Memory => "memory",
            Provenance::Filesystem => "filesystem",
            Provenance::LocalStorage => "localStorage",
            Provenance::Network => "none",
        }
    }

    pub fn was_cached(&self) -> bool {
        !matches!(self, Provenance::Network)
    }
}

/// Result of [`GeoJsonCache::resolve`]
#[derive(Debug, Clone)]
pub struct Resolution {
    pub data: Arc<Value>,
    pub provenance: Provenance,
}

impl Resolution {
    pub fn status(&self) -> &'static str {
        self.provenance.status()
    }

    pub fn was_cached(&self) -> bool {
        self.provenance.was_cached()
    }

    pub fn cache_type(&self) -> &'static str {
        self.provenance.cache_type()
    }
}

/// Serialized as `{data, status, wasCached, cacheType}`
impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Resolution", 4)?;
        state.serialize_field("data", &*self.data)?;
        state.serialize_field("status", self.status())?;
        state.serialize_field("wasCached", &self.was_cached())?;
        state.serialize_field("cacheType", self.cache_type())?;
        state.end()
    }
}

/// Versioned GeoJSON cache over three tiers.
///
/// Construct once and share; the manifest is loaded on first use and the
/// memory tier lives as long as this value. Concurrent resolutions of the same
/// uncached URL are not coalesced: each fetches and writes independently and
/// the last durable write wins.
pub struct GeoJsonCache {
    manifest: ManifestLoader,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn RecordStore>,
    memory: Mutex<HashMap<String, Arc<Value>>>,
}

impl GeoJsonCache {
    pub fn new(manifest_url: &str, fetcher: Arc<dyn Fetcher>, store: Arc<dyn RecordStore>) -> Self {
        let manifest = ManifestLoader::new(manifest_url, fetcher.clone());
        Self::with_manifest_loader(manifest, fetcher, store)
    }

    pub fn with_manifest_loader(
        manifest: ManifestLoader,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            manifest,
            fetcher,
            store,
            memory: Mutex::new(HashMap::new()),
        }
    }

    /// Load the version manifest now instead of on first use
    pub async fn preload_manifest(&self) -> Result<(), CacheError> {
        self.manifest.load().await.map(|_| ())
    }

    pub fn manifest(&self) -> &ManifestLoader {
        &self.manifest
    }

    /// Normalized published version for `url`, `None` when unpublished or empty
    async fn remote_version(&self, url: &str) -> Result<Option<String>, CacheError> {
        let manifest = self.manifest.load().await?;
        Ok(version::normalize(manifest.lookup_version(url)).filter(|v| !v.is_empty()))
    }

    fn memory_get(&self, url: &str) -> Option<Arc<Value>> {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    fn memory_insert(&self, url: &str, data: Arc<Value>) {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), data);
    }

    /// Number of layers held in the memory tier
    pub fn memory_len(&self) -> usize {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Read a record, downgrading storage failures to a miss
    async fn read_record(&self, key: &str) -> Option<String> {
        self.store
            .read(key)
            .await
            .inspect_err(|e| warn!("Failed to read record {}: {}", key, e))
            .ok()
            .flatten()
    }

    /// Returns true when the layer can be served without a network fetch.
    ///
    /// Storage failures count as "not cached"; only a missing manifest is
    /// reported as an error.
    pub async fn is_cached(&self, url: &str) -> Result<bool, CacheError> {
        let Some(remote) = self.remote_version(url).await? else {
            debug!("No published version for {}", url);
            return Ok(false);
        };

        if self.memory_get(url).is_some() {
            return Ok(true);
        }

        let keys = RecordKeys::for_url(url);
        let stored = self
            .read_record(&keys.version)
            .await
            .and_then(|text| version::decode_record(&text));

        if !version::matches(stored.as_deref(), &remote) {
            return Ok(false);
        }

        // A version record can outlive a failed data write
        let has_data = self
            .store
            .exists(&keys.data)
            .await
            .inspect_err(|e| warn!("Failed to check record {}: {}", keys.data, e))
            .unwrap_or(false);

        Ok(has_data)
    }

    /// Resolve the payload for `url` through memory, durable store and network.
    ///
    /// # Errors
    /// * [`CacheError::ManifestUnavailable`] - the manifest could not be loaded
    /// * [`CacheError::VersionUnknown`] - the manifest has no version for `url`
    /// * [`CacheError::NetworkFetch`] - no cached copy and the fetch failed
    pub async fn resolve(&self, url: &str) -> Result<Resolution, CacheError> {
        let remote = self
            .remote_version(url)
            .await?
            .ok_or_else(|| CacheError::VersionUnknown(url.to_string()))?;

        if let Some(data) = self.memory_get(url) {
            debug!("Memory cache hit: {}", url);
            return Ok(Resolution {
                data,
                provenance: Provenance::Memory,
            });
        }

        let keys = RecordKeys::for_url(url);

        if let Some(data) = self.resolve_durable(url, &keys, &remote).await {
            self.memory_insert(url, data.clone());
            return Ok(Resolution {
                data,
                provenance: Provenance::durable(self.store.kind()),
            });
        }

        let data = self.fetch_and_store(url, &keys, &remote).await?;
        self.memory_insert(url, data.clone());
        Ok(Resolution {
            data,
            provenance: Provenance::Network,
        })
    }

    /// Durable tier lookup. Stale or corrupt version records are removed.
    async fn resolve_durable(&self, url: &str, keys: &RecordKeys, remote: &str) -> Option<Arc<Value>> {
        let raw = self.read_record(&keys.version).await?;
        let stored = version::decode_record(&raw);

        if !version::matches(stored.as_deref(), remote) {
            warn!(
                "Stored version {:?} for {} is corrupt or stale (published {}); discarding",
                stored, url, remote
            );
            let _ = self
                .store
                .delete(&keys.version)
                .await
                .inspect_err(|e| warn!("Failed to delete record {}: {}", keys.version, e));
            return None;
        }

        let text = self.read_record(&keys.data).await?;
        match serde_json::from_str::<Value>(&text) {
            Ok(data) => {
                debug!("Durable cache hit: {}", url);
                Some(Arc::new(data))
            }
            Err(e) => {
                warn!("Stored payload for {} is unreadable: {}", url, e);
                None
            }
        }
    }

    async fn fetch_and_store(
        &self,
        url: &str,
        keys: &RecordKeys,
        remote: &str,
    ) -> Result<Arc<Value>, CacheError> {
        info!("Fetching {} from network", url);

        let body = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|source| CacheError::NetworkFetch {
                url: url.to_string(),
                source,
            })?;

        let data: Value = serde_json::from_str(&body).map_err(|e| CacheError::NetworkFetch {
            url: url.to_string(),
            source: FetchError::InvalidPayload {
                url: url.to_string(),
                reason: e.to_string(),
            },
        })?;

        self.write_durable(url, keys, &body, remote).await;

        Ok(Arc::new(data))
    }

    /// Best-effort write of the payload and then its version record
    async fn write_durable(&self, url: &str, keys: &RecordKeys, body: &str, remote: &str) {
        if let Err(e) = self.store.write(&keys.data, body).await {
            warn!("Skipping durable cache for {}: {}", url, e);
            return;
        }

        match self
            .store
            .write(&keys.version, &version::encode_record(remote))
            .await
        {
            Ok(()) => debug!("Stored {} at version {}", url, remote),
            Err(e) => warn!("Failed to store version record for {}: {}", url, e),
        }
    }

    /// Delete every durable record written by this cache.
    ///
    /// Individual failures are logged and skipped. The memory tier is left
    /// untouched, so layers resolved earlier in this process remain cached.
    /// Returns the number of records deleted.
    pub async fn clear_all(&self) -> usize {
        let keys = match self.store.list().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to list cache records: {}", e);
                return 0;
            }
        };

        let mut deleted = 0;
        for key in keys.iter().filter(|key| is_cache_record(key)) {
            match self.store.delete(key).await {
                Ok(()) => {
                    debug!("Deleted {}", key);
                    deleted += 1;
                }
                Err(e) => warn!("Failed to delete record {}: {}", key, e),
            }
        }

        info!("Cleared {} cache records", deleted);
        deleted
    }
}
