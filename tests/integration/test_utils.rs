//! Test utilities for integration tests.
//!
//! Provides a scratch cache directory with helpers to seed tiles and
//! fallback images, and encoders for small real PNG/JPEG images.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use tempfile::TempDir;

use gwc_filecache::layer::{FileCacheLayer, FileCacheLayerConfig, TileLayer, BLANK_TILE, MISSING_TILE};
use gwc_filecache::tile::{PathResolver, TileRequest};

// =============================================================================
// Images
// =============================================================================

fn test_image() -> RgbImage {
    RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 128]))
}

/// Encode a small PNG image.
pub fn create_test_png() -> Vec<u8> {
    let mut buf = Vec::new();
    test_image()
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Encode a small JPEG image.
pub fn create_test_jpeg() -> Vec<u8> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, 90);
    encoder.encode_image(&test_image()).unwrap();
    buf
}

// =============================================================================
// Cache Directory
// =============================================================================

/// A temporary, externally "seeded" cache directory.
pub struct CacheDir {
    dir: TempDir,
}

impl CacheDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `data` at a path relative to the cache root.
    pub fn write(&self, relative: impl AsRef<Path>, data: &[u8]) -> PathBuf {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, data).unwrap();
        path
    }

    /// Seed a tile where the default resolver places it.
    pub fn seed(&self, request: &TileRequest, data: &[u8]) -> PathBuf {
        let resolved = PathResolver::new("seed", self.dir.path())
            .resolve(request)
            .unwrap();
        std::fs::create_dir_all(resolved.path.parent().unwrap()).unwrap();
        std::fs::write(&resolved.path, data).unwrap();
        resolved.path
    }

    pub fn write_blank_png(&self) -> Vec<u8> {
        let data = create_test_png();
        self.write(BLANK_TILE, &data);
        data
    }

    pub fn write_missing_jpg(&self) -> Vec<u8> {
        let data = create_test_jpeg();
        self.write(MISSING_TILE, &data);
        data
    }

    pub fn config(&self, name: &str) -> FileCacheLayerConfig {
        FileCacheLayerConfig::new(name, self.dir.path())
    }

    /// An initialized layer over this directory.
    pub async fn layer(&self, name: &str) -> FileCacheLayer {
        open_layer(self.config(name)).await
    }
}

pub async fn open_layer(config: FileCacheLayerConfig) -> FileCacheLayer {
    let mut layer = FileCacheLayer::new(config);
    layer.initialize().await.unwrap();
    layer
}

/// Whether `data` starts with the PNG signature.
pub fn is_valid_png(data: &[u8]) -> bool {
    data.len() > 8 && data[..8] == [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
}

/// Whether `data` starts with the JPEG SOI marker.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() > 2 && data[0] == 0xFF && data[1] == 0xD8
}
