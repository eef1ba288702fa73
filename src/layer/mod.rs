//! Tile layers.
//!
//! A layer is anything that can answer tile requests. Layers share a small
//! capability interface, [`TileLayer`], and carry their common settings in a
//! [`LayerInfo`] value rather than inheriting them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Host (CLI, dispatcher)         │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             LayerRegistry               │
//! │  (type tag → factory, name → layer)     │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          TileLayer Trait                │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   FileCacheLayer (read-only, on disk)   │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ PathResolver │  │ blank/missing   │  │
//! │  │              │  │ fallback images │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```

mod file_cache;
mod registry;

use async_trait::async_trait;

use crate::error::{ConfigError, TileError};
use crate::tile::{ResolvedPath, TileRequest, TileResult};

pub use file_cache::{
    FallbackImage, FileCacheLayer, FileCacheLayerConfig, BLANK_TILE, MISSING_TILE,
};
pub use registry::{
    LayerEntry, LayerFactories, LayerFactory, LayerRegistry, LayersFile, FILE_CACHE_LAYER_TYPE,
};

/// Settings every layer has, whatever its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    /// Unique layer name
    pub name: String,

    /// Disabled layers stay registered but refuse requests
    pub enabled: bool,

    /// Grid sets the layer is published in; empty means any
    pub grid_sets: Vec<String>,
}

impl LayerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            grid_sets: Vec::new(),
        }
    }

    /// Whether the layer is published in `grid_set_id`.
    pub fn serves_grid_set(&self, grid_set_id: &str) -> bool {
        self.grid_sets.is_empty() || self.grid_sets.iter().any(|g| g == grid_set_id)
    }
}

/// Capability interface of a tile layer.
#[async_trait]
pub trait TileLayer: Send + Sync {
    /// Common layer settings.
    fn info(&self) -> &LayerInfo;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn is_enabled(&self) -> bool {
        self.info().enabled
    }

    /// Validate configuration and prepare the layer for requests.
    ///
    /// Called once by the registry before the layer is shared.
    async fn initialize(&mut self) -> Result<(), ConfigError>;

    /// Where this layer stores the tile for `request`.
    fn resolve(&self, request: &TileRequest) -> Result<ResolvedPath, TileError>;

    /// Serve a tile, from cache or fallback.
    async fn get_tile(&self, request: &TileRequest) -> Result<TileResult, TileError>;

    /// Produce a tile bypassing any cache.
    async fn get_non_cached_tile(&self, request: &TileRequest) -> Result<TileResult, TileError>;

    /// Render and store a tile.
    async fn seed_tile(&self, request: &TileRequest, try_cache: bool) -> Result<(), TileError>;

    /// Forward a request straight to the backend without metatiling.
    async fn perform_direct_operation(
        &self,
        request: &TileRequest,
    ) -> Result<TileResult, TileError>;

    /// The image served in place of missing tiles, if any.
    async fn fallback_tile(&self) -> Result<Option<FallbackImage>, TileError> {
        Ok(None)
    }

    /// Style list advertised for the layer.
    fn styles(&self) -> Option<String>;

    /// Cache max-age to advertise for tiles at `zoom`.
    fn expiration_max_age(&self, zoom: u32) -> Option<u32>;
}
