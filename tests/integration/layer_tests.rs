//! File cache layer integration tests.
//!
//! Tests verify:
//! - Tiles seeded at resolved paths are found as hits
//! - Fallback images are chosen in order and tagged with their own format
//! - Configured fallback directory and row inversion
//! - Read errors propagate instead of turning into misses
//! - Concurrent lookups on a shared layer

use std::sync::Arc;

use bytes::Bytes;

use gwc_filecache::error::TileError;
use gwc_filecache::layer::TileLayer;
use gwc_filecache::tile::{
    parameters_id, CacheOutcome, GridHeights, ImageFormat, TileCoordinate, TileRequest,
};

use super::test_utils::{
    create_test_png, is_valid_jpeg, is_valid_png, open_layer, CacheDir,
};

fn request(x: u64, y: u64, z: u32) -> TileRequest {
    TileRequest::new("EPSG:4326", TileCoordinate::new(x, y, z), ImageFormat::Png)
}

// =============================================================================
// Hits
// =============================================================================

#[tokio::test]
async fn test_seeded_tiles_are_hits() {
    let cache = CacheDir::new();
    let requests = vec![
        request(0, 0, 0),
        request(37, 19, 4),
        request(1000, 77, 12),
        request(262_143, 131_071, 18),
        request(5, 6, 2).with_parameter("STYLES", "night"),
        request(5, 6, 2).with_parameters_id("custom"),
        TileRequest::new("EPSG:900913", TileCoordinate::new(9, 3, 5), ImageFormat::Jpeg),
        TileRequest::new("EPSG:900913", TileCoordinate::new(9, 3, 5), ImageFormat::Gif),
    ];
    for (i, req) in requests.iter().enumerate() {
        cache.seed(req, format!("tile-{}", i).as_bytes());
    }

    let layer = cache.layer("roads").await;
    for (i, req) in requests.iter().enumerate() {
        let result = layer.get_tile(req).await.unwrap();
        assert_eq!(result.outcome, CacheOutcome::Hit, "request {}", i);
        assert_eq!(result.format, req.format);
        assert_eq!(result.data, Bytes::from(format!("tile-{}", i)));
    }
}

#[tokio::test]
async fn test_reference_layout_on_disk() {
    let cache = CacheDir::new();
    let png = create_test_png();
    cache.write("EPSG_4326_04/4_2/37_19.png", &png);

    let layer = cache.layer("layer1").await;
    let req = TileRequest::new("EPSG_4326", TileCoordinate::new(37, 19, 4), ImageFormat::Png);
    let result = layer.get_tile(&req).await.unwrap();

    assert!(result.is_hit());
    assert!(is_valid_png(&result.data));
    assert_eq!(result.path, cache.path().join("EPSG_4326_04/4_2/37_19.png"));
}

#[tokio::test]
async fn test_hit_reports_derived_parameters_id() {
    let cache = CacheDir::new();
    let req = request(1, 1, 2).with_parameter("STYLES", "night");
    cache.seed(&req, b"night");

    let layer = cache.layer("roads").await;
    let result = layer.get_tile(&req).await.unwrap();

    assert_eq!(result.parameters_id, parameters_id(&req.parameters));
    // The derived id is not written back into the caller's request
    assert_eq!(req.parameters_id, None);
}

#[tokio::test]
async fn test_parameter_variants_are_separate() {
    let cache = CacheDir::new();
    let day = request(1, 1, 2).with_parameter("STYLES", "day");
    let night = request(1, 1, 2).with_parameter("STYLES", "night");
    cache.seed(&day, b"day");
    cache.seed(&night, b"night");

    let layer = cache.layer("roads").await;
    assert_eq!(layer.get_tile(&day).await.unwrap().data, Bytes::from_static(b"day"));
    assert_eq!(
        layer.get_tile(&night).await.unwrap().data,
        Bytes::from_static(b"night")
    );
}

#[tokio::test]
async fn test_unsupported_format() {
    let cache = CacheDir::new();
    cache.write_blank_png();
    let layer = cache.layer("roads").await;

    let mut req = request(0, 0, 0);
    req.format = ImageFormat::JpegPng;

    // No fallback is attempted for a request that cannot be resolved
    assert!(matches!(
        layer.get_tile(&req).await,
        Err(TileError::UnsupportedFormat { .. })
    ));
}

// =============================================================================
// Fallbacks
// =============================================================================

#[tokio::test]
async fn test_blank_png_fallback() {
    let cache = CacheDir::new();
    let blank = cache.write_blank_png();
    let layer = cache.layer("roads").await;

    let mut req = request(3, 3, 3);
    req.format = ImageFormat::Jpeg;
    let result = layer.get_tile(&req).await.unwrap();

    assert_eq!(result.outcome, CacheOutcome::MissFallback);
    assert_eq!(result.format, ImageFormat::Png);
    assert_eq!(result.data, Bytes::from(blank));
    assert!(result.path.ends_with("blank.png"));
}

#[tokio::test]
async fn test_blank_png_wins_over_missing_jpg() {
    let cache = CacheDir::new();
    cache.write_blank_png();
    cache.write_missing_jpg();
    let layer = cache.layer("roads").await;

    let result = layer.get_tile(&request(3, 3, 3)).await.unwrap();
    assert_eq!(result.format, ImageFormat::Png);
    assert!(is_valid_png(&result.data));
}

#[tokio::test]
async fn test_missing_jpg_fallback() {
    let cache = CacheDir::new();
    cache.write_missing_jpg();
    let layer = cache.layer("roads").await;

    let result = layer.get_tile(&request(3, 3, 3)).await.unwrap();
    assert_eq!(result.outcome, CacheOutcome::MissFallback);
    assert_eq!(result.format, ImageFormat::Jpeg);
    assert!(is_valid_jpeg(&result.data));
}

#[tokio::test]
async fn test_no_fallback_is_outside_coverage() {
    let cache = CacheDir::new();
    let layer = cache.layer("roads").await;

    let err = layer.get_tile(&request(3, 3, 3)).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.cache_outcome(), Some(CacheOutcome::MissNoCoverage));
}

#[tokio::test]
async fn test_fallback_dir_overrides_layer_root() {
    let cache = CacheDir::new();
    let shared = CacheDir::new();
    // A blank tile in the layer root is ignored once a fallback dir is set
    cache.write_blank_png();
    shared.write_missing_jpg();

    let layer = open_layer(cache.config("roads").with_fallback_dir(shared.path())).await;
    let result = layer.get_tile(&request(3, 3, 3)).await.unwrap();

    assert_eq!(result.outcome, CacheOutcome::MissFallback);
    assert_eq!(result.format, ImageFormat::Jpeg);
    assert!(result.path.starts_with(shared.path()));
    assert_eq!(layer.fallback_dir(), Some(shared.path()));
}

#[tokio::test]
async fn test_fallback_tile_reports_served_image() {
    let cache = CacheDir::new();
    cache.write_missing_jpg();
    let layer = cache.layer("roads").await;

    let fallback = layer.fallback_tile().await.unwrap().unwrap();
    assert_eq!(fallback.format, ImageFormat::Jpeg);
    assert!(fallback.path.ends_with("missing.jpg"));
}

// =============================================================================
// Row Order
// =============================================================================

#[tokio::test]
async fn test_inverted_rows() {
    let cache = CacheDir::new();
    // z=4 has 16 rows: requested row 3 is stored as row 12
    cache.write("EPSG_4326_04/4_1/37_12.png", b"flipped");

    let mut heights = GridHeights::new();
    heights.insert("EPSG:4326".to_string(), vec![1, 2, 4, 8, 16]);
    let layer = open_layer(cache.config("roads").with_inverted_rows(heights)).await;

    let result = layer.get_tile(&request(37, 3, 4)).await.unwrap();
    assert!(result.is_hit());
    assert_eq!(result.data, Bytes::from_static(b"flipped"));

    // Same request with rows as requested misses
    let plain = cache.layer("plain").await;
    assert!(plain.get_tile(&request(37, 3, 4)).await.is_err());
}

#[tokio::test]
async fn test_inverted_rows_outside_grid() {
    let cache = CacheDir::new();
    cache.write_blank_png();

    let mut heights = GridHeights::new();
    heights.insert("EPSG:4326".to_string(), vec![1, 2]);
    let layer = open_layer(cache.config("roads").with_inverted_rows(heights)).await;

    // Unmappable rows are outside coverage even with a fallback image present
    assert!(matches!(
        layer.get_tile(&request(0, 5, 1)).await,
        Err(TileError::OutsideCoverage { .. })
    ));
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_file_where_directory_expected_is_a_miss() {
    let cache = CacheDir::new();
    cache.write_blank_png();
    // A file where the zoom directory should be means the tile was never seeded
    cache.write("EPSG_4326_04", b"not a directory");
    let layer = cache.layer("roads").await;

    let result = layer.get_tile(&request(37, 19, 4)).await.unwrap();
    assert_eq!(result.outcome, CacheOutcome::MissFallback);
    assert!(is_valid_png(&result.data));
}

#[cfg(unix)]
#[tokio::test]
async fn test_read_errors_propagate() {
    let cache = CacheDir::new();
    cache.write_blank_png();
    // A self-referencing link at the tile path cannot be stat'ed
    let tile = cache.path().join("EPSG_4326_04/4_2/37_19.png");
    std::fs::create_dir_all(tile.parent().unwrap()).unwrap();
    std::os::unix::fs::symlink(&tile, &tile).unwrap();
    let layer = cache.layer("roads").await;

    let err = layer.get_tile(&request(37, 19, 4)).await.unwrap_err();
    assert!(matches!(err, TileError::Io { .. }));
    assert_eq!(err.cache_outcome(), None);
}

#[tokio::test]
async fn test_read_only_operations() {
    let cache = CacheDir::new();
    cache.write_blank_png();
    let layer = cache.layer("roads").await;
    let req = request(0, 0, 0);

    for result in [
        layer.get_non_cached_tile(&req).await.map(|_| ()),
        layer.seed_tile(&req, false).await,
        layer.perform_direct_operation(&req).await.map(|_| ()),
    ] {
        assert!(matches!(
            result,
            Err(TileError::UnsupportedOperation { .. })
        ));
    }

    // Seeding did not create the tile
    assert_eq!(
        layer.get_tile(&req).await.unwrap().outcome,
        CacheOutcome::MissFallback
    );
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_lookups() {
    let cache = CacheDir::new();
    cache.write_blank_png();
    for x in 0..8 {
        cache.seed(&request(x, x, 6), format!("tile-{}", x).as_bytes());
    }
    let layer = Arc::new(cache.layer("roads").await);

    let mut handles = Vec::new();
    for x in 0..16u64 {
        let layer = Arc::clone(&layer);
        handles.push(tokio::spawn(async move {
            let result = layer.get_tile(&request(x, x, 6)).await.unwrap();
            (x, result)
        }));
    }

    for handle in handles {
        let (x, result) = handle.await.unwrap();
        if x < 8 {
            assert!(result.is_hit());
            assert_eq!(result.data, Bytes::from(format!("tile-{}", x)));
        } else {
            assert_eq!(result.outcome, CacheOutcome::MissFallback);
        }
    }
}
