//! Tile request and result types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bytes::Bytes;

use super::format::ImageFormat;

// =============================================================================
// Tile Coordinate
// =============================================================================

/// Position of a tile inside a grid set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    /// Column index
    pub x: u64,

    /// Row index
    pub y: u64,

    /// Zoom level (index into the grid set's resolution levels)
    pub z: u32,
}

impl TileCoordinate {
    pub fn new(x: u64, y: u64, z: u32) -> Self {
        Self { x, y, z }
    }
}

// =============================================================================
// Tile Request
// =============================================================================

/// A request for a single cached tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    /// Tile position
    pub coordinate: TileCoordinate,

    /// Grid set the tile belongs to (e.g. `EPSG:4326`)
    pub grid_set_id: String,

    /// Explicit parameters id; takes precedence over `parameters`
    pub parameters_id: Option<String>,

    /// Non-coordinate request parameters (e.g. `STYLES`)
    pub parameters: BTreeMap<String, String>,

    /// Requested image format
    pub format: ImageFormat,
}

impl TileRequest {
    /// Create a request with no parameters.
    pub fn new(
        grid_set_id: impl Into<String>,
        coordinate: TileCoordinate,
        format: ImageFormat,
    ) -> Self {
        Self {
            coordinate,
            grid_set_id: grid_set_id.into(),
            parameters_id: None,
            parameters: BTreeMap::new(),
            format,
        }
    }

    /// Set an explicit parameters id.
    pub fn with_parameters_id(mut self, parameters_id: impl Into<String>) -> Self {
        self.parameters_id = Some(parameters_id.into());
        self
    }

    /// Add a request parameter. A repeated key replaces the earlier value.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Replace all request parameters.
    pub fn with_parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters = parameters
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }
}

// =============================================================================
// Tile Result
// =============================================================================

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOutcome {
    /// The tile file exists and was served
    Hit,

    /// The tile file is missing and a fallback image was served instead
    MissFallback,

    /// The tile file is missing and there is no fallback image
    MissNoCoverage,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "HIT",
            CacheOutcome::MissFallback => "MISS_FALLBACK",
            CacheOutcome::MissNoCoverage => "MISS_NO_COVERAGE",
        }
    }
}

/// The result of a successful lookup.
#[derive(Debug, Clone)]
pub struct TileResult {
    /// Whether the tile itself or a fallback image was served
    pub outcome: CacheOutcome,

    /// The image bytes
    pub data: Bytes,

    /// Format of `data`; differs from the requested format on fallback
    pub format: ImageFormat,

    /// File the bytes were read from
    pub path: PathBuf,

    /// Parameters id used to build the tile path (explicit or derived)
    pub parameters_id: Option<String>,
}

impl TileResult {
    pub fn is_hit(&self) -> bool {
        self.outcome == CacheOutcome::Hit
    }
}
