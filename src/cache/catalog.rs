//! Bulk cache-status probing for a catalog of layers
//!
//! A catalog has the manifest's shape:
//!
//! ```text
//! category ─▶ layer ─▶ { url: version }
//! category ─▶ layer ─▶ sub-layer ─▶ { url: version }
//! STATES ─▶ state ─▶ layer ─▶ { url: version }
//! STATES ─▶ state ─▶ layer ─▶ sub-layer ─▶ { url: version }
//! ```
//!
//! A layer whose mapping holds version tokens directly is a single layer;
//! otherwise each of its children is a sub-layer.

use futures::future::join_all;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::cache::manifest::ManifestNode;
use crate::cache::tiered::GeoJsonCache;

/// Category whose layers are grouped by state
pub const STATES_CATEGORY: &str = "STATES";

/// A layer to check: the synthesized layer key and the URL it resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLayer {
    pub key: String,
    pub url: String,
}

/// Placeholder for the state part of a stateless sub-layer key
pub const NO_STATE: &str = "null";

/// Layer key: category, state, layer and sub-layer joined by `-`.
///
/// Sub-layer keys always carry a state part, [`NO_STATE`] when there is none,
/// so `INDIA-null-rivers-north` cannot collide with a layer named `rivers-north`.
pub fn layer_key(category: &str, state: Option<&str>, layer: &str, sub_layer: Option<&str>) -> String {
    match (state, sub_layer) {
        (Some(state), Some(sub_layer)) => format!("{category}-{state}-{layer}-{sub_layer}"),
        (None, Some(sub_layer)) => format!("{category}-{NO_STATE}-{layer}-{sub_layer}"),
        (Some(state), None) => format!("{category}-{state}-{layer}"),
        (None, None) => format!("{category}-{layer}"),
    }
}

/// First URL published directly under `entries`
fn first_url(entries: &IndexMap<String, ManifestNode>) -> Option<&str> {
    entries
        .iter()
        .find(|(_, node)| matches!(node, ManifestNode::Leaf(_)))
        .map(|(url, _)| url.as_str())
}

fn collect_layer(
    layers: &mut Vec<CatalogLayer>,
    category: &str,
    state: Option<&str>,
    layer: &str,
    entries: &IndexMap<String, ManifestNode>,
) {
    if let Some(url) = first_url(entries) {
        layers.push(CatalogLayer {
            key: layer_key(category, state, layer, None),
            url: url.to_string(),
        });
        return;
    }

    for (sub_layer, node) in entries {
        if let Some(url) = node.as_branch().and_then(first_url) {
            layers.push(CatalogLayer {
                key: layer_key(category, state, layer, Some(sub_layer)),
                url: url.to_string(),
            });
        }
    }
}

/// Flatten a catalog into layers to check, in document order
pub fn catalog_layers(catalog: &IndexMap<String, ManifestNode>) -> Vec<CatalogLayer> {
    let mut layers = Vec::new();

    for (category, node) in catalog {
        let Some(category_entries) = node.as_branch() else {
            continue;
        };

        if category == STATES_CATEGORY {
            for (state, node) in category_entries {
                let Some(state_entries) = node.as_branch() else {
                    continue;
                };
                for (layer, node) in state_entries {
                    if let Some(entries) = node.as_branch() {
                        collect_layer(&mut layers, category, Some(state), layer, entries);
                    }
                }
            }
        } else {
            for (layer, node) in category_entries {
                if let Some(entries) = node.as_branch() {
                    collect_layer(&mut layers, category, None, layer, entries);
                }
            }
        }
    }

    layers
}

impl GeoJsonCache {
    /// Report, per layer key, whether each layer of `catalog` is cached.
    ///
    /// No payload is fetched. A layer whose status cannot be determined,
    /// including when the manifest cannot be loaded, is reported as not cached.
    pub async fn catalog_status(&self, catalog: &IndexMap<String, ManifestNode>) -> IndexMap<String, bool> {
        let layers = catalog_layers(catalog);
        debug!("Checking cache status of {} layers", layers.len());

        if let Err(e) = self.manifest().load().await {
            warn!("Cannot check catalog: {}", e);
            return layers.into_iter().map(|layer| (layer.key, false)).collect();
        }

        let statuses = join_all(layers.iter().map(|layer| self.is_cached(&layer.url))).await;

        layers
            .into_iter()
            .zip(statuses)
            .map(|(layer, status)| {
                let cached = status
                    .inspect_err(|e| warn!("Failed to check cache for {}: {}", layer.key, e))
                    .unwrap_or(false);
                (layer.key, cached)
            })
            .collect()
    }
}
