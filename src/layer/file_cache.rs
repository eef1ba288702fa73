//! Read-only layer backed by a pre-seeded tile directory.
//!
//! The layer never renders, writes or seeds tiles. Each request is resolved
//! to a file with [`PathResolver`]; if the file exists its bytes are served,
//! otherwise a `blank.png` or `missing.jpg` image from the fallback
//! directory is served in its place.
//!
//! # Example
//!
//! ```ignore
//! use gwc_filecache::layer::{FileCacheLayer, FileCacheLayerConfig, TileLayer};
//! use gwc_filecache::tile::{ImageFormat, TileCoordinate, TileRequest};
//!
//! let mut layer = FileCacheLayer::new(FileCacheLayerConfig::new("roads", "/cache/roads"));
//! layer.initialize().await?;
//!
//! let request = TileRequest::new("EPSG:4326", TileCoordinate::new(37, 19, 4), ImageFormat::Png);
//! let tile = layer.get_tile(&request).await?;
//! println!("{} bytes, {}", tile.data.len(), tile.outcome.as_str());
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{ConfigError, TileError};
use crate::tile::{
    CacheOutcome, GridHeights, ImageFormat, PathResolver, ResolvedPath, RowOrder, TileRequest,
    TileResult,
};

use super::{LayerInfo, TileLayer};

/// Fallback image served for missing tiles, looked up first.
pub const BLANK_TILE: &str = "blank.png";

/// Fallback image served for missing tiles when there is no blank tile.
pub const MISSING_TILE: &str = "missing.jpg";

const FALLBACKS: [(&str, ImageFormat); 2] = [
    (BLANK_TILE, ImageFormat::Png),
    (MISSING_TILE, ImageFormat::Jpeg),
];

// =============================================================================
// Configuration
// =============================================================================

/// Settings of a file cache layer, as found in the layer configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileCacheLayerConfig {
    /// Layer name
    pub name: String,

    /// Directory holding the tiles
    pub tile_cache_path: Option<PathBuf>,

    /// Defaults to enabled when not set
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Directory holding `blank.png` / `missing.jpg`; defaults to the cache
    /// directory
    #[serde(default)]
    pub fallback_dir: Option<PathBuf>,

    #[serde(default)]
    pub grid_sets: Vec<String>,

    #[serde(default)]
    pub row_order: RowOrder,

    /// Tiles high at each zoom level, per grid set. Only used with
    /// inverted rows.
    #[serde(default)]
    pub grid_heights: GridHeights,
}

impl FileCacheLayerConfig {
    pub fn new(name: impl Into<String>, tile_cache_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            tile_cache_path: Some(tile_cache_path.into()),
            enabled: None,
            fallback_dir: None,
            grid_sets: Vec::new(),
            row_order: RowOrder::AsRequested,
            grid_heights: GridHeights::new(),
        }
    }

    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = Some(dir.into());
        self
    }

    pub fn with_inverted_rows(mut self, grid_heights: GridHeights) -> Self {
        self.row_order = RowOrder::Inverted;
        self.grid_heights = grid_heights;
        self
    }
}

// =============================================================================
// Fallback Image
// =============================================================================

/// A fallback image read from disk.
#[derive(Debug, Clone)]
pub struct FallbackImage {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub data: Bytes,
}

// =============================================================================
// File Cache Layer
// =============================================================================

/// State fixed at initialization.
#[derive(Debug)]
struct Ready {
    resolver: PathResolver,
    fallback_dir: PathBuf,
}

/// Read-only tile layer over an externally populated cache directory.
#[derive(Debug)]
pub struct FileCacheLayer {
    info: LayerInfo,
    config: FileCacheLayerConfig,
    ready: Option<Ready>,
}

impl FileCacheLayer {
    /// Create an uninitialized layer.
    pub fn new(config: FileCacheLayerConfig) -> Self {
        let info = LayerInfo {
            name: config.name.clone(),
            enabled: config.enabled.unwrap_or(true),
            grid_sets: config.grid_sets.clone(),
        };
        Self {
            info,
            config,
            ready: None,
        }
    }

    /// Layer factory for the registry: builds a layer from its JSON settings.
    pub fn from_settings(settings: serde_json::Value) -> Result<Box<dyn TileLayer>, ConfigError> {
        let config: FileCacheLayerConfig = serde_json::from_value(settings)?;
        Ok(Box::new(Self::new(config)))
    }

    pub fn config(&self) -> &FileCacheLayerConfig {
        &self.config
    }

    /// Absolute cache root, once initialized.
    pub fn root(&self) -> Option<&Path> {
        self.ready.as_ref().map(|r| r.resolver.root())
    }

    /// Directory searched for fallback images, once initialized.
    pub fn fallback_dir(&self) -> Option<&Path> {
        self.ready.as_ref().map(|r| r.fallback_dir.as_path())
    }

    fn ready(&self) -> Result<&Ready, TileError> {
        self.ready
            .as_ref()
            .ok_or_else(|| TileError::LayerNotInitialized(self.info.name.clone()))
    }

    fn unsupported(&self, operation: &'static str) -> TileError {
        TileError::UnsupportedOperation {
            layer: self.info.name.clone(),
            operation,
        }
    }

    /// Resolve a request, refusing grid sets the layer is not published in.
    fn resolve_published(
        &self,
        ready: &Ready,
        request: &TileRequest,
    ) -> Result<ResolvedPath, TileError> {
        if !self.info.serves_grid_set(&request.grid_set_id) {
            return Err(TileError::InvalidRequest(format!(
                "layer '{}' is not published in grid set '{}'",
                self.info.name, request.grid_set_id
            )));
        }
        ready.resolver.resolve(request)
    }

    async fn find_fallback(&self, ready: &Ready) -> Result<Option<FallbackImage>, TileError> {
        for (file_name, format) in FALLBACKS {
            let path = ready.fallback_dir.join(file_name);
            if is_file(&path).await? {
                let data = read_file(&path).await?;
                return Ok(Some(FallbackImage { path, format, data }));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl TileLayer for FileCacheLayer {
    fn info(&self) -> &LayerInfo {
        &self.info
    }

    async fn initialize(&mut self) -> Result<(), ConfigError> {
        let name = self.info.name.clone();

        let configured = self.config.tile_cache_path.as_deref().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "tileCachePath has not been set for layer '{}'. \
                 It should point to the directory containing the tiles",
                name
            ))
        })?;
        let root = absolute(configured)?;
        validate_directory(&name, "tileCachePath", &root).await?;

        let fallback_dir = match self.config.fallback_dir.as_deref() {
            Some(dir) => {
                let dir = absolute(dir)?;
                validate_directory(&name, "fallbackDir", &dir).await?;
                dir
            }
            None => root.clone(),
        };

        if self.config.row_order == RowOrder::Inverted && self.config.grid_heights.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "layer '{}' inverts rows but has no gridHeights",
                name
            )));
        }

        info!(
            layer = %name,
            root = %root.display(),
            fallback_dir = %fallback_dir.display(),
            row_order = ?self.config.row_order,
            "Configured file cache layer"
        );

        let resolver = PathResolver::new(name, root)
            .with_row_order(self.config.row_order, self.config.grid_heights.clone());
        self.ready = Some(Ready {
            resolver,
            fallback_dir,
        });
        Ok(())
    }

    fn resolve(&self, request: &TileRequest) -> Result<ResolvedPath, TileError> {
        self.resolve_published(self.ready()?, request)
    }

    async fn get_tile(&self, request: &TileRequest) -> Result<TileResult, TileError> {
        let ready = self.ready()?;
        let resolved = self.resolve_published(ready, request)?;

        if is_file(&resolved.path).await? {
            let data = read_file(&resolved.path).await?;
            debug!(layer = %self.info.name, path = %resolved.path.display(), "Tile cache hit");
            return Ok(TileResult {
                outcome: CacheOutcome::Hit,
                data,
                format: request.format,
                path: resolved.path,
                parameters_id: resolved.parameters_id,
            });
        }

        debug!(layer = %self.info.name, path = %resolved.path.display(), "Tile cache miss");

        match self.find_fallback(ready).await? {
            Some(fallback) => {
                debug!(
                    layer = %self.info.name,
                    fallback = %fallback.path.display(),
                    "Serving fallback image"
                );
                Ok(TileResult {
                    outcome: CacheOutcome::MissFallback,
                    data: fallback.data,
                    format: fallback.format,
                    path: fallback.path,
                    parameters_id: resolved.parameters_id,
                })
            }
            None => {
                let coordinate = request.coordinate;
                Err(TileError::OutsideCoverage {
                    layer: self.info.name.clone(),
                    x: coordinate.x,
                    y: coordinate.y,
                    z: coordinate.z,
                })
            }
        }
    }

    async fn get_non_cached_tile(&self, _request: &TileRequest) -> Result<TileResult, TileError> {
        Err(self.unsupported("get_non_cached_tile"))
    }

    async fn seed_tile(&self, _request: &TileRequest, _try_cache: bool) -> Result<(), TileError> {
        Err(self.unsupported("seed_tile"))
    }

    async fn perform_direct_operation(
        &self,
        _request: &TileRequest,
    ) -> Result<TileResult, TileError> {
        Err(self.unsupported("perform_direct_operation"))
    }

    async fn fallback_tile(&self) -> Result<Option<FallbackImage>, TileError> {
        let ready = self.ready()?;
        self.find_fallback(ready).await
    }

    fn styles(&self) -> Option<String> {
        None
    }

    fn expiration_max_age(&self, _zoom: u32) -> Option<u32> {
        None
    }
}

// =============================================================================
// Filesystem Helpers
// =============================================================================

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!(
            "cannot make '{}' absolute: {}",
            path.display(),
            e
        ))
    })?;
    Ok(cwd.join(path))
}

async fn validate_directory(layer: &str, role: &'static str, path: &Path) -> Result<(), ConfigError> {
    let metadata = match fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::MissingDirectory {
                layer: layer.to_string(),
                role,
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ConfigError::UnreadableDirectory {
                layer: layer.to_string(),
                role,
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if !metadata.is_dir() {
        return Err(ConfigError::NotADirectory {
            layer: layer.to_string(),
            role,
            path: path.to_path_buf(),
        });
    }

    // Listing the directory is the readability check.
    fs::read_dir(path)
        .await
        .map_err(|source| ConfigError::UnreadableDirectory {
            layer: layer.to_string(),
            role,
            path: path.to_path_buf(),
            source,
        })?;

    Ok(())
}

/// Whether a regular file exists at `path`.
///
/// A missing ancestor directory, or a file standing where one is expected,
/// means the file does not exist; any other failure is an I/O error.
async fn is_file(path: &Path) -> Result<bool, TileError> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => Ok(false),
        Err(source) => Err(TileError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn read_file(path: &Path) -> Result<Bytes, TileError> {
    fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|source| TileError::Io {
            path: path.to_path_buf(),
            source,
        })
}

// =============================================================================
// Tests
// =============================================================================
