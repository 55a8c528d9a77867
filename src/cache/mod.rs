//! Versioned, tiered cache for remotely published GeoJSON layers
//!
//! A layer is addressed by its URL. A published manifest maps every URL to the
//! version token of its current revision, and a locally stored copy is only
//! trusted while its recorded version matches that token.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Manifest   │────▶│   Tiered    │◀────│   Catalog   │
//! │  (versions) │     │    Cache    │     │  (probing)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                       │         │
//!                       ▼         ▼
//!               ┌─────────────┐ ┌─────────────┐
//!               │ RecordStore │ │   Fetcher   │
//!               │  (durable)  │ │  (network)  │
//!               └─────────────┘ └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`tiered`]: memory → durable → network resolution
//! - [`manifest`]: load-once version manifest and URL lookup
//! - [`version`]: version token normalization and corruption heuristic
//! - [`storage`]: durable record port and record naming
//! - [`stores`]: filesystem and SQLite record stores
//! - [`fetcher`]: network port and its reqwest implementation
//! - [`catalog`]: bulk cache-status probing for a layer catalog
//! - [`error`]: error types

pub mod catalog;
pub mod error;
pub mod fetcher;
pub mod manifest;
pub mod storage;
pub mod stores;
pub mod tiered;
pub mod version;

pub use tiered::{GeoJsonCache, Provenance, Resolution};
