use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde_json::json;

use geojson_cache::cache::GeoJsonCache;
use geojson_cache::cache::fetcher::{Fetcher, HttpFetcher};
use geojson_cache::cache::manifest::Manifest;
use geojson_cache::cache::storage::RecordStore;
use geojson_cache::cache::stores::{FsRecordStore, SqliteRecordStore};
use geojson_cache::config::{self, Backend, CacheConfig};
use geojson_cache::logging;

#[derive(Parser)]
#[command(name = "geojson-cache")]
#[command(version, about = "Versioned offline cache for GeoJSON map layers")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the version manifest URL
    #[arg(long, global = true)]
    manifest_url: Option<String>,

    /// Override the durable record backend
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// Override the durable record directory
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report whether a layer is available without a network fetch
    Status { url: String },
    /// Resolve a layer, fetching it if needed
    Get {
        url: String,
        /// Write the payload here and print the rest of the result
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Report cache status for every layer of a catalog (default: the manifest)
    Catalog {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete every durable cache record
    Clear,
}

fn load_config(cli: &Cli) -> anyhow::Result<CacheConfig> {
    let mut config = match &cli.config {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => CacheConfig::default(),
    };

    if let Some(url) = &cli.manifest_url {
        config.manifest_url = url.clone();
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(dir) = &cli.storage_dir {
        config.storage_dir = Some(dir.clone());
    }

    Ok(config)
}

fn build_cache(config: &CacheConfig) -> anyhow::Result<GeoJsonCache> {
    let timeout = (config.fetch_timeout_ms > 0).then(|| Duration::from_millis(config.fetch_timeout_ms));
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(timeout)?);

    let dir = config.storage_dir();
    let store: Arc<dyn RecordStore> = match config.backend {
        Backend::Filesystem => Arc::new(FsRecordStore::new(&dir)?),
        Backend::Sqlite => Arc::new(SqliteRecordStore::new(
            &dir.join("records.db"),
            config.max_record_bytes,
        )?),
    };

    Ok(GeoJsonCache::new(&config.manifest_url, fetcher, store))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let cache = build_cache(&config)?;

    match cli.command {
        Command::Status { url } => {
            let cached = cache.is_cached(&url).await?;
            println!("{}", json!({ "url": url, "cached": cached }));
        }
        Command::Get { url, output } => {
            let resolution = cache.resolve(&url).await?;
            let mut report = serde_json::to_value(&resolution)?;
            if let Some(path) = output {
                let data = report
                    .as_object_mut()
                    .and_then(|fields| fields.remove("data"))
                    .unwrap_or_default();
                std::fs::write(&path, serde_json::to_string(&data)?)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            println!("{}", report);
        }
        Command::Catalog { file } => {
            let statuses: IndexMap<String, bool> = match file {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read catalog {}", path.display()))?;
                    let catalog = Manifest::from_json(&text).map_err(anyhow::Error::msg)?;
                    cache.catalog_status(catalog.root()).await
                }
                None => {
                    let manifest = cache.manifest().load().await?;
                    cache.catalog_status(manifest.root()).await
                }
            };
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
        Command::Clear => {
            let deleted = cache.clear_all().await;
            println!("{}", json!({ "deleted": deleted }));
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(&config::log_dir(), cli.verbose)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}
