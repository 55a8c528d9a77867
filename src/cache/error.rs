use thiserror::Error;

/// Failure of the network tier
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid payload from {url}: {reason}")]
    InvalidPayload { url: String, reason: String },
}

/// Failure of a durable record store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Record {key} is {size} bytes, exceeding the {limit} byte limit")]
    QuotaExceeded { key: String, size: usize, limit: usize },

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Errors surfaced to callers of the cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Version manifest unavailable: {0}")]
    ManifestUnavailable(#[source] FetchError),

    #[error("No published version for {0}")]
    VersionUnknown(String),

    #[error("Failed to fetch {url}: {source}")]
    NetworkFetch {
        url: String,
        #[source]
        source: FetchError,
    },
}
