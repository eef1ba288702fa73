//! Tile path resolution.
//!
//! Maps a [`TileRequest`] to the file that holds the tile inside a layer's
//! cache directory:
//!
//! ```text
//! <root>/<gridSetId>_<zz>[_<parametersId>]/<bucketX>_<bucketY>/<x>_<y>.<ext>
//! ```
//!
//! Tiles of one zoom level are split into square buckets of `half × half`
//! tiles, where `half = 2 << (z / 2)`. The number of decimal digits of
//! `half` sets the padding width of the bucket indices, and twice that
//! width pads the tile indices, so names within a directory always sort
//! and line up regardless of zoom.
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//! use gwc_filecache::tile::{ImageFormat, PathResolver, TileCoordinate, TileRequest};
//!
//! let resolver = PathResolver::new("layer1", "/cache/layer1");
//! let request = TileRequest::new("EPSG_4326", TileCoordinate::new(37, 19, 4), ImageFormat::Png);
//!
//! let resolved = resolver.resolve(&request).unwrap();
//! assert_eq!(resolved.path, PathBuf::from("/cache/layer1/EPSG_4326_04/4_2/37_19.png"));
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TileError;

use super::params::parameters_id;
use super::request::{TileCoordinate, TileRequest};

/// Largest shift for which `2 << shift` still fits in a `u64`.
const MAX_BUCKET_SHIFT: u32 = 62;

// =============================================================================
// Layout Primitives
// =============================================================================

/// Number of decimal digits needed to print `n`.
pub fn decimal_digits(mut n: u64) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Append `n` in decimal, left-padded with zeros to at least `width` digits.
///
/// Numbers wider than `width` are written in full.
pub fn zero_pad_into(n: u64, width: usize, out: &mut String) {
    for _ in decimal_digits(n)..width {
        out.push('0');
    }
    out.push_str(&n.to_string());
}

/// `n` in decimal, left-padded with zeros to at least `width` digits.
pub fn zero_pad(n: u64, width: usize) -> String {
    let mut out = String::with_capacity(width.max(20));
    zero_pad_into(n, width, &mut out);
    out
}

/// Append `value` with every character other than ASCII letters, digits,
/// `-` and `.` replaced by `_`.
pub fn append_filtered(value: &str, out: &mut String) {
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
}

/// Bucket geometry of one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketLayout {
    /// Side length of a bucket, in tiles
    pub half: u64,

    /// Padding width of bucket indices; tile indices use twice this
    pub digits: usize,
}

impl BucketLayout {
    /// Layout for zoom level `z`, or `None` when the bucket side would not
    /// fit in 64 bits.
    pub fn for_zoom(z: u32) -> Option<Self> {
        let shift = z / 2;
        if shift > MAX_BUCKET_SHIFT {
            return None;
        }
        let half = 2u64 << shift;
        let digits = if half <= 10 { 1 } else { decimal_digits(half) };
        Some(Self { half, digits })
    }

    /// Bucket directory name for a tile, e.g. `4_2`.
    pub fn bucket_dir(&self, x: u64, y: u64) -> String {
        let mut name = String::new();
        zero_pad_into(x / self.half, self.digits, &mut name);
        name.push('_');
        zero_pad_into(y / self.half, self.digits, &mut name);
        name
    }

    /// Tile file name, e.g. `37_19.png`.
    pub fn file_name(&self, x: u64, y: u64, extension: &str) -> String {
        let mut name = String::new();
        zero_pad_into(x, 2 * self.digits, &mut name);
        name.push('_');
        zero_pad_into(y, 2 * self.digits, &mut name);
        name.push('.');
        name.push_str(extension);
        name
    }
}

/// Zoom directory name: `<gridSetId>_<zz>[_<parametersId>]`.
///
/// Both the grid set id and the parameters id go through [`append_filtered`],
/// so an explicit id such as `a:b` lands in `..._a_b`.
pub fn zoom_dir(grid_set_id: &str, z: u32, parameters_id: Option<&str>) -> String {
    let mut name = String::new();
    append_filtered(grid_set_id, &mut name);
    name.push('_');
    zero_pad_into(u64::from(z), 2, &mut name);
    if let Some(id) = parameters_id {
        name.push('_');
        append_filtered(id, &mut name);
    }
    name
}

// =============================================================================
// Row Order
// =============================================================================

/// How a request's row index maps to the row index stored on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowOrder {
    /// The row index is used as requested.
    #[default]
    AsRequested,

    /// The row index is counted from the opposite edge of the grid:
    /// `tilesHigh(z) - 1 - y`.
    Inverted,
}

/// Number of tile rows at each zoom level, per grid set.
pub type GridHeights = HashMap<String, Vec<u64>>;

// =============================================================================
// Path Resolver
// =============================================================================

/// A resolved tile location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Absolute path of the tile file
    pub path: PathBuf,

    /// Parameters id used in the zoom directory, explicit or derived
    pub parameters_id: Option<String>,

    /// Coordinate as stored on disk (differs from the request when rows
    /// are inverted)
    pub stored: TileCoordinate,
}

/// Resolves tile requests to files under a layer's cache root.
///
/// Resolution does no I/O; the same request always yields the same path.
#[derive(Debug, Clone)]
pub struct PathResolver {
    layer: String,
    root: PathBuf,
    row_order: RowOrder,
    grid_heights: GridHeights,
}

impl PathResolver {
    /// Create a resolver for `root`, using row indices as requested.
    pub fn new(layer: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            layer: layer.into(),
            root: root.into(),
            row_order: RowOrder::AsRequested,
            grid_heights: GridHeights::new(),
        }
    }

    /// Invert row indices against the given grid heights.
    pub fn with_inverted_rows(mut self, grid_heights: GridHeights) -> Self {
        self.row_order = RowOrder::Inverted;
        self.grid_heights = grid_heights;
        self
    }

    /// Set the row order and grid heights explicitly.
    pub fn with_row_order(mut self, row_order: RowOrder, grid_heights: GridHeights) -> Self {
        self.row_order = row_order;
        self.grid_heights = grid_heights;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    /// Resolve the path of the tile file for `request`.
    ///
    /// An explicit `parameters_id` on the request takes precedence over its
    /// parameter map. Either way the id is character-filtered like the grid
    /// set id before it becomes part of the zoom directory, so ids holding
    /// characters other than ASCII letters, digits, `-` and `.` are stored
    /// with those characters replaced by `_`. Derived ids are lowercase hex
    /// and pass through unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the grid set id is empty
    /// - `UnsupportedFormat` if the format has no file extension
    /// - `OutsideCoverage` if the zoom level is too deep to bucket, or rows
    ///   are inverted and the row cannot be mapped
    pub fn resolve(&self, request: &TileRequest) -> Result<ResolvedPath, TileError> {
        if request.grid_set_id.is_empty() {
            return Err(TileError::InvalidRequest(
                "grid set id must not be empty".to_string(),
            ));
        }
        let extension = request.format.require_extension()?;

        let stored = self.stored_coordinate(request)?;
        let layout = BucketLayout::for_zoom(stored.z)
            .ok_or_else(|| self.outside(&request.coordinate))?;

        let parameters_id = match &request.parameters_id {
            Some(id) => Some(id.clone()),
            None => parameters_id(&request.parameters),
        };

        let path = self
            .root
            .join(zoom_dir(
                &request.grid_set_id,
                stored.z,
                parameters_id.as_deref(),
            ))
            .join(layout.bucket_dir(stored.x, stored.y))
            .join(layout.file_name(stored.x, stored.y, extension));

        Ok(ResolvedPath {
            path,
            parameters_id,
            stored,
        })
    }

    fn stored_coordinate(&self, request: &TileRequest) -> Result<TileCoordinate, TileError> {
        let coordinate = request.coordinate;
        match self.row_order {
            RowOrder::AsRequested => Ok(coordinate),
            RowOrder::Inverted => {
                let tiles_high = self
                    .grid_heights
                    .get(&request.grid_set_id)
                    .and_then(|levels| levels.get(coordinate.z as usize))
                    .copied()
                    .ok_or_else(|| self.outside(&coordinate))?;

                if coordinate.y >= tiles_high {
                    return Err(self.outside(&coordinate));
                }

                Ok(TileCoordinate {
                    y: tiles_high - 1 - coordinate.y,
                    ..coordinate
                })
            }
        }
    }

    fn outside(&self, coordinate: &TileCoordinate) -> TileError {
        TileError::OutsideCoverage {
            layer: self.layer.clone(),
            x: coordinate.x,
            y: coordinate.y,
            z: coordinate.z,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
