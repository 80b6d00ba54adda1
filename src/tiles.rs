//! Offline map-tile caching.
//!
//! Uses standard slippy-map tile addressing (z/x/y, web mercator) to work
//! out which tiles a route touches across a zoom range, then downloads them
//! into a local `{root}/{z}/{x}/{y}.png` layout that a map widget can serve
//! from when offline.
//!
//! Downloads are best-effort: fetches are unordered and independent, every
//! individual failure is logged and swallowed, and a batch is done when all
//! attempts have settled regardless of their outcomes.

use std::collections::HashSet;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use log::{debug, info};
use reqwest::Client;

use crate::error::{Result, WaytraceError};
use crate::GpsPoint;

// ============================================================================
// Web Mercator Math
// ============================================================================

/// Convert longitude to tile X coordinate at the given zoom.
#[inline]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> f64 {
    let n = 2.0_f64.powi(zoom as i32);
    (lon + 180.0) / 360.0 * n
}

/// Convert latitude to tile Y coordinate at the given zoom.
#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> f64 {
    let n = 2.0_f64.powi(zoom as i32);
    let lat_rad = lat.to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n
}

/// Convert tile X coordinate back to longitude.
#[inline]
pub fn tile_x_to_lon(x: f64, zoom: u8) -> f64 {
    let n = 2.0_f64.powi(zoom as i32);
    x / n * 360.0 - 180.0
}

/// Convert tile Y coordinate back to latitude.
#[inline]
pub fn tile_y_to_lat(y: f64, zoom: u8) -> f64 {
    let n = 2.0_f64.powi(zoom as i32);
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
    lat_rad.to_degrees()
}

/// A slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// WGS84 bounds of a tile.
#[derive(Debug, Clone, Copy)]
pub struct TileBounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// The WGS84 bounds of a tile.
pub fn tile_bounds(tile: TileId) -> TileBounds {
    TileBounds {
        min_lon: tile_x_to_lon(tile.x as f64, tile.z),
        max_lon: tile_x_to_lon((tile.x + 1) as f64, tile.z),
        max_lat: tile_y_to_lat(tile.y as f64, tile.z), // Y is inverted in web mercator
        min_lat: tile_y_to_lat((tile.y + 1) as f64, tile.z),
    }
}

/// Tile containing a point at the given zoom.
pub fn tile_for_point(point: &GpsPoint, zoom: u8) -> TileId {
    let max = 2.0_f64.powi(zoom as i32) - 1.0;
    // lon 180 / extreme latitudes land exactly on the grid seam
    let x = lon_to_tile_x(point.longitude, zoom).floor().clamp(0.0, max) as u32;
    let y = lat_to_tile_y(point.latitude, zoom).floor().clamp(0.0, max) as u32;
    TileId { z: zoom, x, y }
}

/// Unique tiles a route touches at one zoom level, in grid order.
pub fn tiles_for_route(points: &[GpsPoint], zoom: u8) -> Vec<TileId> {
    let mut tiles = HashSet::new();
    for point in points {
        if !point.is_valid() {
            continue;
        }
        tiles.insert(tile_for_point(point, zoom));
    }
    let mut tiles: Vec<_> = tiles.into_iter().collect();
    tiles.sort();
    tiles
}

/// Unique tiles a route touches across an inclusive zoom range.
pub fn tiles_for_zoom_range(points: &[GpsPoint], min_zoom: u8, max_zoom: u8) -> Vec<TileId> {
    let mut all = Vec::new();
    for zoom in min_zoom..=max_zoom {
        all.extend(tiles_for_route(points, zoom));
    }
    all
}

// ============================================================================
// Tile Cache
// ============================================================================

/// Configuration for tile downloads.
#[derive(Debug, Clone)]
pub struct TileCacheConfig {
    /// URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    /// Lowest zoom level to cache.
    pub min_zoom: u8,
    /// Highest zoom level to cache.
    pub max_zoom: u8,
    /// Parallel downloads in flight.
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            min_zoom: 12,
            max_zoom: 16,
            concurrency: 8,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Outcome of a caching batch.
///
/// The batch itself never fails: `attempted - cached - skipped` tiles had
/// their fetch fail and be swallowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSummary {
    /// Tiles the batch touched.
    pub attempted: u32,
    /// Tiles newly downloaded and written.
    pub cached: u32,
    /// Tiles that were already on disk.
    pub skipped: u32,
}

impl CacheSummary {
    pub fn failed(&self) -> u32 {
        self.attempted - self.cached - self.skipped
    }
}

enum FetchOutcome {
    Cached,
    Skipped,
    Failed,
}

/// Downloads and stores map tiles for offline use.
pub struct TileCache {
    config: TileCacheConfig,
    client: Client,
    root: PathBuf,
}

impl TileCache {
    /// Create a cache rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>, config: TileCacheConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WaytraceError::Http(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            root: root.into(),
        })
    }

    pub fn config(&self) -> &TileCacheConfig {
        &self.config
    }

    /// On-disk path for a tile: `{root}/{z}/{x}/{y}.png`.
    pub fn tile_path(&self, tile: TileId) -> PathBuf {
        self.root
            .join(tile.z.to_string())
            .join(tile.x.to_string())
            .join(format!("{}.png", tile.y))
    }

    /// Download URL for a tile.
    pub fn tile_url(&self, tile: TileId) -> String {
        self.config
            .url_template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    pub fn is_cached(&self, tile: TileId) -> bool {
        self.tile_path(tile).exists()
    }

    /// Cache every tile the route touches across the configured zoom range.
    pub async fn cache_route(&self, points: &[GpsPoint]) -> CacheSummary {
        let tiles = tiles_for_zoom_range(points, self.config.min_zoom, self.config.max_zoom);
        self.cache_tiles(tiles).await
    }

    /// Download a batch of tiles, settling every fetch independently.
    pub async fn cache_tiles(&self, tiles: Vec<TileId>) -> CacheSummary {
        let attempted = tiles.len() as u32;
        let start = Instant::now();
        info!(
            "[TileCache] Caching {} tiles ({} parallel)",
            attempted, self.config.concurrency
        );

        let outcomes: Vec<FetchOutcome> = stream::iter(tiles)
            .map(|tile| {
                let client = &self.client;
                let url = self.tile_url(tile);
                let path = self.tile_path(tile);
                async move { fetch_tile(client, &url, &path).await }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut summary = CacheSummary {
            attempted,
            ..CacheSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                FetchOutcome::Cached => summary.cached += 1,
                FetchOutcome::Skipped => summary.skipped += 1,
                FetchOutcome::Failed => {}
            }
        }

        info!(
            "[TileCache] Batch settled: {} cached, {} skipped, {} failed in {:.2}s",
            summary.cached,
            summary.skipped,
            summary.failed(),
            start.elapsed().as_secs_f64()
        );
        summary
    }

    /// Blocking wrapper around [`cache_route`](Self::cache_route) for hosts
    /// without a runtime of their own.
    pub fn cache_route_blocking(&self, points: &[GpsPoint]) -> Result<CacheSummary> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(rt.block_on(self.cache_route(points)))
    }
}

/// Fetch one tile to disk. Every failure is logged at debug level and
/// reported as a plain outcome; nothing escalates past this function.
async fn fetch_tile(client: &Client, url: &str, path: &Path) -> FetchOutcome {
    if path.exists() {
        return FetchOutcome::Skipped;
    }

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("[TileCache] GET {} failed: {}", url, e);
            return FetchOutcome::Failed;
        }
    };
    if !response.status().is_success() {
        debug!("[TileCache] GET {} -> HTTP {}", url, response.status());
        return FetchOutcome::Failed;
    }
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("[TileCache] Reading body of {} failed: {}", url, e);
            return FetchOutcome::Failed;
        }
    };

    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            debug!("[TileCache] Creating {} failed: {}", parent.display(), e);
            return FetchOutcome::Failed;
        }
    }
    match std::fs::write(path, &bytes) {
        Ok(()) => FetchOutcome::Cached,
        Err(e) => {
            debug!("[TileCache] Writing {} failed: {}", path.display(), e);
            FetchOutcome::Failed
        }
    }
}
