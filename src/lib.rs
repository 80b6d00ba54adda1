//! # Waytrace
//!
//! Route drawing and GPS tracking engine for map-based apps.
//!
//! This library provides:
//! - Incremental route distance accumulation with undo
//! - Interval markers (every km) placed by interpolation along the path
//! - Normalization of heterogeneous point/route representations
//! - SQLite-backed route persistence
//! - GPX and GeoJSON import/export
//! - Best-effort offline caching of map tiles
//!
//! The rendering surface, geolocation source and UI are external
//! collaborators: they feed events in and draw the state they read back
//! out. Nothing in this crate holds a renderer handle.
//!
//! ## Quick Start
//!
//! ```rust
//! use waytrace::{GpsPoint, TrackingConfig, TrackingSession};
//!
//! let mut session = TrackingSession::new(TrackingConfig::default());
//! session.push_point(GpsPoint::new(51.5074, -0.1278));
//! session.push_point(GpsPoint::new(51.5080, -0.1290));
//! session.push_point(GpsPoint::new(51.5090, -0.1300));
//!
//! let route = session.finalize("Thames loop")?;
//! println!("{}: {}", route.name(), waytrace::geo_utils::format_km(route.distance()));
//! # Ok::<(), waytrace::WaytraceError>(())
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, WaytraceError};

// Geographic utilities (haversine, interpolation, formatting)
pub mod geo_utils;
pub use geo_utils::{haversine_distance, SegmentDistance};

// Canonical normalization of point and route representations
pub mod normalize;
pub use normalize::{normalize_record, point_from_value};

// Route entity and distance accumulation
pub mod route;
pub use route::{cumulative_distances_of, Route, RouteRecord};

// Interval markers along a path
pub mod markers;
pub use markers::{interval_markers, MarkerTracker, MARKER_INTERVAL_M};

// Tracking sessions (drawing / recording state machine)
pub mod session;
pub use session::{TrackingConfig, TrackingMode, TrackingSession};

// Route persistence
pub mod store;
pub use store::{RouteStore, SqliteRouteStore};

// GPX / GeoJSON codecs
pub mod codec;
pub use codec::{decode_gpx, encode_gpx, route_from_geojson, route_from_gpx, route_to_geojson};

// Offline tile caching
pub mod tiles;
pub use tiles::{CacheSummary, TileCache, TileCacheConfig, TileId};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use waytrace::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box for a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_validity() {
        assert!(GpsPoint::new(51.5074, -0.1278).is_valid());
        assert!(GpsPoint::new(-90.0, 180.0).is_valid());
        assert!(!GpsPoint::new(90.5, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, -180.5).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_bounds_from_points() {
        let points = vec![
            GpsPoint::new(47.0, 8.0),
            GpsPoint::new(47.5, 8.5),
            GpsPoint::new(46.5, 9.0),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, 46.5);
        assert_eq!(bounds.max_lat, 47.5);
        assert_eq!(bounds.min_lng, 8.0);
        assert_eq!(bounds.max_lng, 9.0);

        let center = bounds.center();
        assert_eq!(center.latitude, 47.0);
        assert_eq!(center.longitude, 8.5);
    }

    #[test]
    fn test_bounds_of_empty_slice() {
        assert!(Bounds::from_points(&[]).is_none());
    }
}
