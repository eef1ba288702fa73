//! Tile addressing.
//!
//! This module holds everything needed to turn a tile request into the file
//! that stores it, without touching the filesystem.
//!
//! # Components
//!
//! - [`TileRequest`] / [`TileCoordinate`]: what the caller asks for
//! - [`ImageFormat`]: the closed table of formats and their file extensions
//! - [`parameters_id`]: stable token for a request's non-coordinate parameters
//! - [`PathResolver`]: the request → path mapping
//! - [`TileResult`] / [`CacheOutcome`]: what a lookup returns
//!
//! # On-disk layout
//!
//! ```text
//! <root>/
//! ├── blank.png                      (optional fallback)
//! ├── missing.jpg                    (optional fallback)
//! └── EPSG_4326_04/                  <gridSetId>_<zz>[_<parametersId>]
//!     └── 4_2/                       <bucketX>_<bucketY>
//!         └── 37_19.png              <x>_<y>.<ext>
//! ```

mod format;
mod params;
mod path;
mod request;

pub use format::ImageFormat;
pub use params::{canonical_parameters, parameters_id};
pub use path::{
    append_filtered, decimal_digits, zero_pad, zero_pad_into, zoom_dir, BucketLayout,
    GridHeights, PathResolver, ResolvedPath, RowOrder,
};
pub use request::{CacheOutcome, TileCoordinate, TileRequest, TileResult};
