//! Image formats a tile can be requested in.
//!
//! The table is closed: every format the cache knows about is a variant of
//! [`ImageFormat`], and each variant knows its MIME type, its short format
//! name, and the file extension tiles of that format are stored under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TileError;

/// A tile image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageFormat {
    Png,
    Png8,
    Png24,
    Jpeg,
    Gif,
    Tiff,
    Bmp,
    /// Mixed JPEG/PNG output. Each stored tile carries whichever encoding
    /// won, so there is no single extension to look the file up under.
    JpegPng,
}

impl ImageFormat {
    /// Every known format, in table order.
    pub const ALL: [ImageFormat; 8] = [
        ImageFormat::Png,
        ImageFormat::Png8,
        ImageFormat::Png24,
        ImageFormat::Jpeg,
        ImageFormat::Gif,
        ImageFormat::Tiff,
        ImageFormat::Bmp,
        ImageFormat::JpegPng,
    ];

    /// MIME type used on the wire.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Png8 => "image/png8",
            ImageFormat::Png24 => "image/png; mode=24bit",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::JpegPng => "image/vnd.jpeg-png",
        }
    }

    /// Short format name (as used in configuration and on the command line).
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Png8 => "png8",
            ImageFormat::Png24 => "png24",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Bmp => "bmp",
            ImageFormat::JpegPng => "jpeg-png",
        }
    }

    /// Canonical extension of stored tiles, if the format has one.
    pub fn file_extension(&self) -> Option<&'static str> {
        match self {
            ImageFormat::Png | ImageFormat::Png8 | ImageFormat::Png24 => Some("png"),
            ImageFormat::Jpeg => Some("jpeg"),
            ImageFormat::Gif => Some("gif"),
            ImageFormat::Tiff => Some("tiff"),
            ImageFormat::Bmp => Some("bmp"),
            ImageFormat::JpegPng => None,
        }
    }

    /// Extension of stored tiles, or `UnsupportedFormat` if there is none.
    pub fn require_extension(&self) -> Result<&'static str, TileError> {
        self.file_extension()
            .ok_or_else(|| TileError::UnsupportedFormat {
                format: self.mime_type().to_string(),
            })
    }

    /// Look a format up by MIME type.
    ///
    /// Matching ignores ASCII case and whitespace around `;` parameters, so
    /// `image/png;mode=24bit` and `image/png; mode=24bit` are the same.
    pub fn from_mime(mime: &str) -> Result<Self, TileError> {
        let normalized = normalize_mime(mime);
        Self::ALL
            .iter()
            .copied()
            .find(|f| normalize_mime(f.mime_type()) == normalized)
            .ok_or_else(|| TileError::UnsupportedFormat {
                format: mime.to_string(),
            })
    }

    /// Look a format up by its short name.
    pub fn from_name(name: &str) -> Result<Self, TileError> {
        let lower = name.trim().to_ascii_lowercase();
        if lower == "jpg" {
            return Ok(ImageFormat::Jpeg);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == lower)
            .ok_or_else(|| TileError::UnsupportedFormat {
                format: name.to_string(),
            })
    }

    /// Whether this is one of the PNG variants.
    pub fn is_png(&self) -> bool {
        matches!(
            self,
            ImageFormat::Png | ImageFormat::Png8 | ImageFormat::Png24
        )
    }
}

fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .map(|part| part.trim().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(";")
}

impl FromStr for ImageFormat {
    type Err = TileError;

    /// Accepts either a MIME type (anything containing `/`) or a short name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('/') {
            Self::from_mime(s)
        } else {
            Self::from_name(s)
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}
