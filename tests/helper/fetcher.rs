//! In-process network tier for tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use geojson_cache::cache::GeoJsonCache;
use geojson_cache::cache::error::FetchError;
use geojson_cache::cache::fetcher::Fetcher;
use geojson_cache::cache::storage::RecordStore;
use geojson_cache::cache::stores::{FsRecordStore, SqliteRecordStore};

pub const MANIFEST_URL: &str = "https://example/manifest.json";
pub const LAYER_URL: &str = "https://example/a.geojson";
pub const EMPTY_COLLECTION: &str = r#"{"type":"FeatureCollection","features":[]}"#;

/// Serves canned bodies and counts requests per URL
#[derive(Default)]
pub struct CountingFetcher {
    bodies: Mutex<HashMap<String, String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: &str, body: &str) -> Self {
        self.set_body(url, body);
        self
    }

    /// Serve a manifest publishing `version` for `url` under STATES/Telangana/districts
    pub fn with_manifest(self, url: &str, version: &str) -> Self {
        self.set_manifest(url, version);
        self
    }

    pub fn set_manifest(&self, url: &str, version: &str) {
        let mut districts = serde_json::Map::new();
        districts.insert(url.to_string(), version.into());
        let manifest = serde_json::json!({
            "STATES": { "Telangana": { "districts": districts } }
        });
        self.set_body(MANIFEST_URL, &manifest.to_string());
    }

    pub fn set_body(&self, url: &str, body: &str) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Build a cache over a filesystem store in `dir`
pub fn fs_cache(fetcher: &Arc<CountingFetcher>, dir: &Path) -> GeoJsonCache {
    let store: Arc<dyn RecordStore> = Arc::new(FsRecordStore::new(dir).unwrap());
    GeoJsonCache::new(MANIFEST_URL, fetcher.clone(), store)
}

/// Build a cache over a SQLite store in `dir`
pub fn sqlite_cache(
    fetcher: &Arc<CountingFetcher>,
    dir: &Path,
    max_record_bytes: usize,
) -> GeoJsonCache {
    let store: Arc<dyn RecordStore> =
        Arc::new(SqliteRecordStore::new(&dir.join("records.db"), max_record_bytes).unwrap());
    GeoJsonCache::new(MANIFEST_URL, fetcher.clone(), store)
}
