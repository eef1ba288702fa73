//! Command-line configuration.
//!
//! Layers come either from a JSON layer configuration file (`--layers`) or,
//! for a quick look at a single cache directory, from `--root`, which
//! configures one file cache layer named after `--name`.
//!
//! # Environment Variables
//!
//! - `GWC_LAYERS` - Layer configuration file
//! - `GWC_ROOT` - Cache directory of an ad-hoc single layer
//! - `GWC_LAYER_NAME` - Name of the ad-hoc layer (default: default)
//! - `GWC_FALLBACK_DIR` - Fallback image directory of the ad-hoc layer

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::TileError;
use crate::layer::FileCacheLayerConfig;
use crate::tile::{ImageFormat, TileCoordinate, TileRequest};

// =============================================================================
// Default Values
// =============================================================================

/// Default name of the layer configured with `--root`.
pub const DEFAULT_LAYER_NAME: &str = "default";

/// Default requested format.
pub const DEFAULT_FORMAT: &str = "image/png";

// =============================================================================
// CLI Arguments
// =============================================================================

/// gwc-filecache - Serve tiles from a pre-seeded tile cache directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "gwc-filecache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Layer configuration file (JSON).
    #[arg(long, env = "GWC_LAYERS", conflicts_with = "root")]
    pub layers: Option<PathBuf>,

    /// Cache directory of a single ad-hoc layer.
    #[arg(long, env = "GWC_ROOT")]
    pub root: Option<PathBuf>,

    /// Name of the ad-hoc layer configured with --root.
    #[arg(long, default_value = DEFAULT_LAYER_NAME, env = "GWC_LAYER_NAME")]
    pub name: String,

    /// Directory holding blank.png / missing.jpg for the ad-hoc layer.
    ///
    /// Defaults to the cache directory itself.
    #[arg(long, env = "GWC_FALLBACK_DIR", requires = "root")]
    pub fallback_dir: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the file a tile is stored in.
    Resolve(TileArgs),

    /// Look a tile up and report how it was served.
    Get(GetArgs),

    /// Initialize every layer and report its fallback images.
    Check,
}

/// Where the layers come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSource {
    /// A layer configuration file
    File(PathBuf),

    /// A single file cache layer
    Directory(FileCacheLayerConfig),
}

impl Cli {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.layers.is_none() && self.root.is_none() {
            return Err(
                "No layers configured. Set --layers or GWC_LAYERS to a layer configuration \
                 file, or --root or GWC_ROOT to a cache directory"
                    .to_string(),
            );
        }

        if self.root.is_some() && self.name.trim().is_empty() {
            return Err("Layer name must not be empty. Set --name or GWC_LAYER_NAME".to_string());
        }

        match &self.command {
            Command::Resolve(args) => args.validate(),
            Command::Get(args) => args.tile.validate(),
            Command::Check => Ok(()),
        }
    }

    /// The configured layer source; call `validate()` first.
    pub fn layer_source(&self) -> Option<LayerSource> {
        if let Some(path) = &self.layers {
            return Some(LayerSource::File(path.clone()));
        }
        self.root.as_ref().map(|root| {
            let mut config = FileCacheLayerConfig::new(self.name.clone(), root.clone());
            config.fallback_dir = self.fallback_dir.clone();
            LayerSource::Directory(config)
        })
    }

    /// Layer a tile command addresses: `--layer`, or the ad-hoc layer name.
    pub fn target_layer<'a>(&'a self, args: &'a TileArgs) -> &'a str {
        args.layer.as_deref().unwrap_or(&self.name)
    }
}

// =============================================================================
// Tile Arguments
// =============================================================================

/// Arguments identifying one tile.
#[derive(Args, Debug, Clone)]
pub struct TileArgs {
    /// Layer to query (defaults to the --name layer).
    #[arg(long)]
    pub layer: Option<String>,

    /// Grid set id, e.g. EPSG:4326.
    #[arg(short = 'g', long)]
    pub grid_set: String,

    /// Zoom level.
    #[arg(short, long)]
    pub z: u32,

    /// Column index.
    #[arg(short, long)]
    pub x: u64,

    /// Row index.
    #[arg(short, long)]
    pub y: u64,

    /// Image format, as MIME type or short name.
    #[arg(short, long, default_value = DEFAULT_FORMAT)]
    pub format: String,

    /// Request parameter as KEY=VALUE; may be repeated.
    #[arg(long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Explicit parameters id, overriding --param.
    #[arg(long)]
    pub parameters_id: Option<String>,
}

impl TileArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_set.is_empty() {
            return Err("Grid set id must not be empty".to_string());
        }
        self.format
            .parse::<ImageFormat>()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Build the tile request these arguments describe.
    pub fn to_request(&self) -> Result<TileRequest, TileError> {
        let format = self.format.parse::<ImageFormat>()?;
        let mut request = TileRequest::new(
            self.grid_set.clone(),
            TileCoordinate::new(self.x, self.y, self.z),
            format,
        )
        .with_parameters(self.params.iter().cloned());
        request.parameters_id = self.parameters_id.clone();
        Ok(request)
    }
}

/// Arguments of the `get` command.
#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    #[command(flatten)]
    pub tile: TileArgs,

    /// Write the tile bytes to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
