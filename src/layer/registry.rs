//! Layer registry.
//!
//! The registry owns every configured layer and hands out shared references
//! to them. Layers are built from the JSON layer configuration file: each
//! entry names a layer type, and the type tag is looked up in a table of
//! factories. The file cache layer is registered under `gwcLayer`; hosts can
//! register factories for their own layer types.
//!
//! ```json
//! {
//!   "layers": [
//!     { "type": "gwcLayer", "name": "roads", "tileCachePath": "/cache/roads" }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ConfigError, TileError};
use crate::tile::{TileRequest, TileResult};

use super::file_cache::FileCacheLayer;
use super::TileLayer;

/// Type tag of the read-only file cache layer.
pub const FILE_CACHE_LAYER_TYPE: &str = "gwcLayer";

/// Builds a layer from the settings of one configuration entry (everything
/// except the `type` tag).
pub type LayerFactory = fn(serde_json::Value) -> Result<Box<dyn TileLayer>, ConfigError>;

// =============================================================================
// Configuration File
// =============================================================================

/// Top level of the layer configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct LayersFile {
    #[serde(default)]
    pub layers: Vec<LayerEntry>,
}

impl LayersFile {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json)
    }
}

/// One layer entry: a type tag plus type-specific settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerEntry {
    #[serde(rename = "type")]
    pub layer_type: String,

    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// Factories
// =============================================================================

/// Table of layer factories keyed by type tag.
pub struct LayerFactories {
    factories: HashMap<String, LayerFactory>,
}

impl LayerFactories {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under `type_tag`, replacing any earlier one.
    pub fn register(&mut self, type_tag: impl Into<String>, factory: LayerFactory) {
        self.factories.insert(type_tag.into(), factory);
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.factories.contains_key(type_tag)
    }

    /// Build the (uninitialized) layer described by `entry`.
    pub fn create(&self, entry: &LayerEntry) -> Result<Box<dyn TileLayer>, ConfigError> {
        let factory = self
            .factories
            .get(&entry.layer_type)
            .ok_or_else(|| ConfigError::UnknownLayerType(entry.layer_type.clone()))?;
        factory(serde_json::Value::Object(entry.settings.clone()))
    }
}

impl Default for LayerFactories {
    /// A table with the file cache layer registered.
    fn default() -> Self {
        let mut factories = Self::empty();
        factories.register(FILE_CACHE_LAYER_TYPE, FileCacheLayer::from_settings);
        factories
    }
}

// =============================================================================
// Layer Registry
// =============================================================================

/// Initialized layers by name.
#[derive(Default)]
pub struct LayerRegistry {
    layers: BTreeMap<String, Arc<dyn TileLayer>>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and initialize every layer of a configuration file.
    ///
    /// Fails on the first layer that cannot be built or initialized.
    pub async fn from_config(
        config: &LayersFile,
        factories: &LayerFactories,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for entry in &config.layers {
            let layer = factories.create(entry)?;
            registry.add(layer).await?;
        }
        info!(layers = registry.len(), "Loaded layer configuration");
        Ok(registry)
    }

    /// Read, build and initialize the layers of a configuration file.
    pub async fn load(path: &Path, factories: &LayerFactories) -> Result<Self, ConfigError> {
        let config = LayersFile::load(path).await?;
        Self::from_config(&config, factories).await
    }

    /// Initialize a layer and add it to the registry.
    pub async fn add(&mut self, mut layer: Box<dyn TileLayer>) -> Result<(), ConfigError> {
        let name = layer.name().to_string();
        if self.layers.contains_key(&name) {
            return Err(ConfigError::DuplicateLayer(name));
        }

        layer.initialize().await?;
        debug!(layer = %name, enabled = layer.is_enabled(), "Registered layer");
        self.layers.insert(name, Arc::from(layer));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TileLayer>> {
        self.layers.get(name).cloned()
    }

    /// Layer names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Arc<dyn TileLayer>> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Look up an enabled layer by name.
    pub fn enabled_layer(&self, name: &str) -> Result<Arc<dyn TileLayer>, TileError> {
        match self.layers.get(name) {
            Some(layer) if layer.is_enabled() => Ok(Arc::clone(layer)),
            Some(_) => Err(TileError::LayerDisabled(name.to_string())),
            None => Err(TileError::LayerNotFound(name.to_string())),
        }
    }

    /// Serve a tile from the named layer.
    pub async fn get_tile(&self, layer: &str, request: &TileRequest) -> Result<TileResult, TileError> {
        self.enabled_layer(layer)?.get_tile(request).await
    }
}

// =============================================================================
// Tests
// =============================================================================
