//! Tracking sessions: the single mutable owner of a route under
//! construction.
//!
//! All mutation runs through `&mut self` methods driven by one sequential
//! event stream (a map click, a geolocation fix, an undo press), so two
//! mutations can never interleave on the same in-progress route.
//! Battery-saver polling is modeled explicitly: `poll_due` tells the host
//! when to issue a position request, and the pending flag guarantees a new
//! request is never started while one is in flight.

use std::time::{Duration, Instant};

use log::{debug, info};
use serde_json::Value;

use crate::error::{Result, WaytraceError};
use crate::geo_utils::{self, SegmentDistance};
use crate::markers::{MarkerTracker, MARKER_INTERVAL_M};
use crate::normalize;
use crate::route::Route;
use crate::GpsPoint;

/// How a session receives its points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// Points are placed by hand on the map.
    Draw,
    /// Points arrive from a geolocation source.
    Record,
}

/// Per-session configuration. Mode and power behavior are explicit here;
/// there are no ambient tracking flags anywhere in the crate.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub mode: TrackingMode,
    /// Poll positions on a timer instead of holding a continuous watch.
    pub battery_saver: bool,
    /// Minimum time between position polls in battery-saver mode.
    pub poll_interval: Duration,
    /// Distance between interval markers, in meters.
    pub marker_interval: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            mode: TrackingMode::Draw,
            battery_saver: false,
            poll_interval: Duration::from_secs(30),
            marker_interval: MARKER_INTERVAL_M,
        }
    }
}

/// A route being drawn or recorded, with live distance and markers.
#[derive(Debug)]
pub struct TrackingSession {
    config: TrackingConfig,
    route: Route,
    markers: MarkerTracker,
    last_poll: Option<Instant>,
    poll_pending: bool,
    skipped_points: u32,
}

impl TrackingSession {
    /// Start a session using the haversine segment distance.
    pub fn new(config: TrackingConfig) -> Self {
        Self::with_distance_fn(config, geo_utils::haversine_distance)
    }

    /// Start a session with a custom segment-distance function.
    pub fn with_distance_fn(config: TrackingConfig, segment_distance: SegmentDistance) -> Self {
        let markers = MarkerTracker::new(config.marker_interval);
        Self {
            config,
            route: Route::with_distance_fn(segment_distance),
            markers,
            last_poll: None,
            poll_pending: false,
            skipped_points: 0,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// The route under construction.
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Interval markers for the current geometry, in distance order.
    pub fn markers(&self) -> &[GpsPoint] {
        self.markers.markers()
    }

    pub fn distance(&self) -> f64 {
        self.route.distance()
    }

    /// Points dropped because they were not finite coordinates.
    pub fn skipped_points(&self) -> u32 {
        self.skipped_points
    }

    /// Append a position to the route.
    ///
    /// Invalid coordinates are counted and skipped; the route remains
    /// usable from its valid points. Returns whether the point was taken.
    pub fn push_point(&mut self, point: GpsPoint) -> bool {
        if !point.is_valid() {
            self.skipped_points += 1;
            debug!(
                "[TrackingSession] Skipping invalid point lat={} lng={}",
                point.latitude, point.longitude
            );
            return false;
        }
        self.route.append_point(point);
        self.markers.update(&self.route);
        true
    }

    /// Append a position given in any accepted JSON representation.
    ///
    /// Unparseable values count as skipped, same as invalid coordinates.
    pub fn push_value(&mut self, value: &Value) -> bool {
        match normalize::point_from_value(value) {
            Some(point) => self.push_point(point),
            None => {
                self.skipped_points += 1;
                debug!("[TrackingSession] Skipping unparseable point: {}", value);
                false
            }
        }
    }

    /// Undo the most recent point. No-op when the route is empty.
    pub fn undo(&mut self) -> Option<GpsPoint> {
        let removed = self.route.remove_last_point();
        if removed.is_some() {
            self.markers.update(&self.route);
        }
        removed
    }

    /// Whether a battery-saver position poll should be issued now.
    ///
    /// Only ever true for recording sessions with battery saver on, and
    /// never while a previous request is still pending, so two position
    /// requests cannot overlap.
    pub fn poll_due(&self, now: Instant) -> bool {
        if self.config.mode != TrackingMode::Record
            || !self.config.battery_saver
            || self.poll_pending
        {
            return false;
        }
        match self.last_poll {
            Some(at) => now.duration_since(at) >= self.config.poll_interval,
            None => true,
        }
    }

    /// Mark a position request as issued.
    pub fn begin_poll(&mut self, now: Instant) {
        self.poll_pending = true;
        self.last_poll = Some(now);
    }

    /// Deliver the outcome of a position request. `None` means the request
    /// failed; the session simply becomes eligible for the next poll.
    pub fn complete_poll(&mut self, position: Option<GpsPoint>) -> bool {
        self.poll_pending = false;
        match position {
            Some(point) => self.push_point(point),
            None => false,
        }
    }

    /// Finish the route under construction.
    ///
    /// On success the completed route is handed back and the session is
    /// reset, ready for a new drawing. Fewer than 2 points is a validation
    /// failure that leaves the session untouched.
    pub fn finalize(&mut self, name: &str) -> Result<Route> {
        if self.route.point_count() < 2 {
            return Err(WaytraceError::TooFewPoints {
                count: self.route.point_count(),
            });
        }
        let segment_distance = self.route.segment_distance_fn();
        let mut finished =
            std::mem::replace(&mut self.route, Route::with_distance_fn(segment_distance));
        finished.finalize(name)?;
        self.markers.clear();
        self.last_poll = None;
        self.poll_pending = false;
        self.skipped_points = 0;
        info!(
            "[TrackingSession] Finalized '{}': {} points, {}",
            finished.name(),
            finished.point_count(),
            geo_utils::format_km(finished.distance())
        );
        Ok(finished)
    }
}
