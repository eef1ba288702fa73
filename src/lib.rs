//! # gwc-filecache
//!
//! A read-only tile layer for tile caches that were seeded by someone else.
//!
//! Tiles live in a directory tree laid out the way GeoWebCache's file blob
//! store lays them out. This crate maps a tile request to its file in that
//! tree and serves the file, falling back to a static `blank.png` or
//! `missing.jpg` when the tile was never seeded. It never renders, writes,
//! seeds or evicts tiles.
//!
//! ## Architecture
//!
//! - [`tile`] - Tile requests, image formats and the request → path mapping
//! - [`layer`] - The `TileLayer` interface, the file cache layer and the
//!   layer registry
//! - [`config`] - CLI configuration types
//! - [`error`] - Configuration and per-request error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use gwc_filecache::layer::{FileCacheLayer, FileCacheLayerConfig, TileLayer};
//! use gwc_filecache::tile::{ImageFormat, TileCoordinate, TileRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut layer = FileCacheLayer::new(FileCacheLayerConfig::new("roads", "/cache/roads"));
//!     layer.initialize().await?;
//!
//!     let request = TileRequest::new("EPSG:4326", TileCoordinate::new(37, 19, 4), ImageFormat::Png);
//!     let tile = layer.get_tile(&request).await?;
//!     println!("{}: {} bytes", tile.outcome.as_str(), tile.data.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod layer;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, GetArgs, LayerSource, TileArgs};
pub use error::{ConfigError, TileError};
pub use layer::{
    FallbackImage, FileCacheLayer, FileCacheLayerConfig, LayerEntry, LayerFactories,
    LayerFactory, LayerInfo, LayerRegistry, LayersFile, TileLayer, BLANK_TILE,
    FILE_CACHE_LAYER_TYPE, MISSING_TILE,
};
pub use tile::{
    parameters_id, zero_pad, BucketLayout, CacheOutcome, GridHeights, ImageFormat, PathResolver,
    ResolvedPath, RowOrder, TileCoordinate, TileRequest, TileResult,
};
