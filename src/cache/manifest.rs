//! Version manifest: the published mapping from layer URLs to version tokens
//!
//! The manifest is an arbitrarily nested JSON object. Leaves are version
//! tokens keyed by the URL they describe; every other level only groups
//! entries (category, state, layer).

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::cache::error::{CacheError, FetchError};
use crate::cache::fetcher::Fetcher;

/// A node of the manifest tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ManifestNode {
    /// A version token
    Leaf(String),
    /// A grouping level, in document order
    Branch(IndexMap<String, ManifestNode>),
    /// Anything else (numbers, arrays, null); ignored by lookups
    Other(serde_json::Value),
}

impl ManifestNode {
    pub fn as_branch(&self) -> Option<&IndexMap<String, ManifestNode>> {
        match self {
            ManifestNode::Branch(map) => Some(map),
            _ => None,
        }
    }
}

/// A parsed, immutable version manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    root: IndexMap<String, ManifestNode>,
}

impl Manifest {
    /// Parse a manifest document. The root must be a JSON object.
    pub fn from_json(text: &str) -> Result<Self, String> {
        match serde_json::from_str::<ManifestNode>(text) {
            Ok(ManifestNode::Branch(root)) => Ok(Self { root }),
            Ok(_) => Err("manifest root is not an object".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    pub fn root(&self) -> &IndexMap<String, ManifestNode> {
        &self.root
    }

    /// Find the raw version token published for `url`.
    ///
    /// Each level is checked for a direct `url` entry before descending into
    /// its children in document order. When the same URL appears under
    /// several branches the first one found wins.
    pub fn lookup_version(&self, url: &str) -> Option<&str> {
        fn search<'a>(map: &'a IndexMap<String, ManifestNode>, url: &str) -> Option<&'a str> {
            if let Some(ManifestNode::Leaf(version)) = map.get(url) {
                return Some(version);
            }
            map.values()
                .filter_map(ManifestNode::as_branch)
                .find_map(|child| search(child, url))
        }

        search(&self.root, url)
    }
}

/// Loads the manifest once per process and serves lookups from it
pub struct ManifestLoader {
    url: String,
    fetcher: Arc<dyn Fetcher>,
    manifest: OnceCell<Manifest>,
}

impl ManifestLoader {
    pub fn new(url: &str, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            url: url.to_string(),
            fetcher,
            manifest: OnceCell::new(),
        }
    }

    /// Create a loader that already holds `manifest` and never fetches
    pub fn preloaded(manifest: Manifest, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            url: String::new(),
            fetcher,
            manifest: OnceCell::new_with(Some(manifest)),
        }
    }

    /// Returns the manifest, fetching it on first use.
    ///
    /// A failed load is not remembered; the next call fetches again.
    pub async fn load(&self) -> Result<&Manifest, CacheError> {
        self.manifest
            .get_or_try_init(|| async {
                info!("Loading version manifest from {}", self.url);
                let body = self
                    .fetcher
                    .fetch(&self.url)
                    .await
                    .map_err(CacheError::ManifestUnavailable)?;

                let manifest = Manifest::from_json(&body).map_err(|reason| {
                    error!("Version manifest at {} is invalid: {}", self.url, reason);
                    CacheError::ManifestUnavailable(FetchError::InvalidPayload {
                        url: self.url.clone(),
                        reason,
                    })
                })?;

                debug!("Version manifest loaded with {} top-level entries", manifest.root.len());
                Ok::<_, CacheError>(manifest)
            })
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.manifest.initialized()
    }
}
