use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Published version manifest of the GeoJSON layer catalog
pub const DEFAULT_MANIFEST_URL: &str = "https://raw.githubusercontent.com/Scaleorange-Technologies/MAPS_VERSION2/main/capacitor/custom_maps/public/geojsonLinks.json";

/// Largest record accepted by the key/value store (4.5 MiB)
pub const DEFAULT_MAX_RECORD_BYTES: usize = 4_718_592;

/// Timeout for HTTP requests in milliseconds (30 seconds)
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Durable record store backend
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum Backend {
    /// One file per record in a directory
    #[default]
    Filesystem,
    /// Single SQLite table with a per-record size ceiling
    Sqlite,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub manifest_url: String,
    pub backend: Backend,
    /// Directory for durable records; defaults to `<data_dir>/records`
    pub storage_dir: Option<PathBuf>,
    pub max_record_bytes: usize,
    /// HTTP timeout in milliseconds; 0 disables it
    pub fetch_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            backend: Backend::default(),
            storage_dir: None,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

impl CacheConfig {
    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("records"))
    }
}

/// Returns the path to the data directory for geojson-cache.
/// Uses $XDG_DATA_HOME/geojson-cache if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/geojson-cache,
/// or ./geojson-cache if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the directory holding log files.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("geojson-cache")
}
