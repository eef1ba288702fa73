use std::path::PathBuf;

use thiserror::Error;

use crate::tile::CacheOutcome;

/// Errors raised while configuring or initializing a layer.
///
/// These are fatal: a layer that fails to initialize stays unusable until its
/// configuration is corrected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A directory the layer depends on does not exist
    #[error("{role} for layer '{layer}' is set to '{}' but the directory does not exist", path.display())]
    MissingDirectory {
        layer: String,
        role: &'static str,
        path: PathBuf,
    },

    /// The configured path exists but is not a directory
    #[error("{role} for layer '{layer}' is set to '{}' but it is not a directory", path.display())]
    NotADirectory {
        layer: String,
        role: &'static str,
        path: PathBuf,
    },

    /// The configured directory cannot be listed
    #[error("{role} for layer '{layer}' is set to '{}' but the directory is not readable: {source}", path.display())]
    UnreadableDirectory {
        layer: String,
        role: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The layer configuration file could not be read
    #[error("Failed to read layer configuration '{}': {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The layer configuration could not be parsed
    #[error("Invalid layer configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// No factory is registered for a layer type tag
    #[error("Unknown layer type '{0}'")]
    UnknownLayerType(String),

    /// Two layers share the same name
    #[error("Duplicate layer name '{0}'")]
    DuplicateLayer(String),

    /// Any other invalid setting
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur while looking up a single tile.
#[derive(Debug, Error)]
pub enum TileError {
    /// The requested format has no file extension this cache can look up
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// No tile file and no fallback image exists for the request
    #[error("Tile {x},{y} at zoom {z} is outside the coverage of layer '{layer}'")]
    OutsideCoverage {
        layer: String,
        x: u64,
        y: u64,
        z: u32,
    },

    /// The layer is read-only and does not provide this operation
    #[error("Operation '{operation}' is not supported by read-only layer '{layer}'")]
    UnsupportedOperation {
        layer: String,
        operation: &'static str,
    },

    /// The request itself is malformed
    #[error("Invalid tile request: {0}")]
    InvalidRequest(String),

    /// No layer with this name is registered
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// The layer is configured but disabled
    #[error("Layer '{0}' is disabled")]
    LayerDisabled(String),

    /// The layer has not been initialized yet
    #[error("Layer '{0}' has not been initialized")]
    LayerNotInitialized(String),

    /// Reading an existing cache file failed
    #[error("I/O error reading '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TileError {
    /// The cache outcome a host should report for this error, if any.
    ///
    /// Only `OutsideCoverage` corresponds to a lookup that ran to completion
    /// (a miss with no fallback); every other variant is a failure.
    pub fn cache_outcome(&self) -> Option<CacheOutcome> {
        match self {
            TileError::OutsideCoverage { .. } => Some(CacheOutcome::MissNoCoverage),
            _ => None,
        }
    }

    /// Whether the caller should treat this as "tile does not exist" rather
    /// than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TileError::OutsideCoverage { .. } | TileError::LayerNotFound(_)
        )
    }
}
