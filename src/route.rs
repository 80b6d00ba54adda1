//! Route entity: an ordered path of GPS points with derived distances.
//!
//! A route under construction grows one point at a time (map clicks or
//! geolocation fixes) and supports undo. Distance lives in a cumulative
//! sequence alongside the points: `cumulative[i]` is the path length from
//! point 0 to point i. Appending a point costs one segment-distance
//! evaluation; the incremental sequence is identical to a from-scratch
//! rebuild, which finalization and every load from storage perform anyway
//! because stored derived data is never trusted.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WaytraceError};
use crate::geo_utils::{self, SegmentDistance};
use crate::normalize::{self, DEFAULT_ROUTE_NAME};
use crate::{Bounds, GpsPoint};

static ROUTE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh route id, unique within the process even when two
/// routes are created in the same millisecond.
pub(crate) fn next_route_id() -> String {
    let seq = ROUTE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("route_{}_{}", chrono::Utc::now().timestamp_millis(), seq)
}

/// Compute the full cumulative-distance sequence for a point list.
///
/// `out[0]` is 0; `out[i] = out[i-1] + segment(points[i-1], points[i])`.
/// Empty input gives an empty sequence.
pub fn cumulative_distances_of(points: &[GpsPoint], segment: SegmentDistance) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            total += segment(&points[i - 1], point);
        }
        out.push(total);
    }
    out
}

/// Canonical storage form of a route, exactly as persisted.
///
/// One JSON document per route, keyed by `id`. Points are stored as
/// `[lat, lng]` pairs; cumulative distances are derived data and are not
/// stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub id: String,
    pub name: String,
    pub points: Vec<[f64; 2]>,
    /// Total path length in meters.
    pub distance: f64,
    /// Always 0 here (no elevation source integrated); kept for schema
    /// completeness.
    pub elevation_gain: f64,
    /// ISO-8601 timestamp with milliseconds.
    pub created: String,
}

/// A named, ordered path of geographic points with derived total distance.
///
/// Fields are private so the cumulative-distance invariant can only be
/// touched through the mutation methods that maintain it. A route stops
/// accepting mutation once it is finished (finalized, imported, or loaded
/// from storage).
#[derive(Debug, Clone)]
pub struct Route {
    id: String,
    name: String,
    points: Vec<GpsPoint>,
    cumulative_distances: Vec<f64>,
    distance: f64,
    elevation_gain: f64,
    created: String,
    finished: bool,
    segment_distance: SegmentDistance,
}

impl Route {
    /// Create an empty route using the haversine segment distance.
    pub fn new() -> Self {
        Self::with_distance_fn(geo_utils::haversine_distance)
    }

    /// Create an empty route with a custom segment-distance function.
    pub fn with_distance_fn(segment_distance: SegmentDistance) -> Self {
        Self {
            id: next_route_id(),
            name: String::new(),
            points: Vec::new(),
            cumulative_distances: Vec::new(),
            distance: 0.0,
            elevation_gain: 0.0,
            created: normalize::now_iso(),
            finished: false,
            segment_distance,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.points
    }

    pub fn cumulative_distances(&self) -> &[f64] {
        &self.cumulative_distances
    }

    /// Total path length in meters (last cumulative entry, 0 when fewer
    /// than 2 points).
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn elevation_gain(&self) -> f64 {
        self.elevation_gain
    }

    /// Creation timestamp as an ISO-8601 string.
    pub fn created(&self) -> &str {
        &self.created
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the route is finished and no longer accepts mutation.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn segment_distance_fn(&self) -> SegmentDistance {
        self.segment_distance
    }

    /// Bounding box of the path, `None` for an empty route.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    /// Append a point, extending the cumulative-distance sequence by one
    /// entry. Only the new segment's distance is computed.
    ///
    /// Returns whether the point was taken; a finished route rejects it.
    pub fn append_point(&mut self, point: GpsPoint) -> bool {
        if self.finished {
            return false;
        }
        if let Some(last) = self.points.last() {
            let prev_total = self.cumulative_distances.last().copied().unwrap_or(0.0);
            let total = prev_total + (self.segment_distance)(last, &point);
            self.points.push(point);
            self.cumulative_distances.push(total);
            self.distance = total;
        } else {
            self.points.push(point);
            self.cumulative_distances.push(0.0);
        }
        true
    }

    /// Undo the most recent point. No-op on an empty or finished route.
    pub fn remove_last_point(&mut self) -> Option<GpsPoint> {
        if self.finished {
            return None;
        }
        let removed = self.points.pop()?;
        self.cumulative_distances.pop();
        self.distance = self.cumulative_distances.last().copied().unwrap_or(0.0);
        Some(removed)
    }

    /// Recompute the cumulative-distance sequence from scratch.
    pub fn rebuild_cumulative_distances(&mut self) {
        self.cumulative_distances = cumulative_distances_of(&self.points, self.segment_distance);
        self.distance = self.cumulative_distances.last().copied().unwrap_or(0.0);
    }

    /// Finish a drawn route: validate the point count, rebuild distances
    /// end-to-end, normalize the name (trimmed, placeholder when blank) and
    /// mark the route finished. From then on mutators reject their input.
    ///
    /// A route with fewer than 2 points is a validation failure and is left
    /// unchanged. Finalizing an already-finished route is a no-op.
    pub fn finalize(&mut self, name: &str) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if self.points.len() < 2 {
            return Err(WaytraceError::TooFewPoints {
                count: self.points.len(),
            });
        }
        self.rebuild_cumulative_distances();
        let trimmed = name.trim();
        self.name = if trimmed.is_empty() {
            DEFAULT_ROUTE_NAME.to_string()
        } else {
            trimmed.to_string()
        };
        self.finished = true;
        Ok(())
    }

    /// Canonical storage record for this route.
    pub fn to_record(&self) -> RouteRecord {
        RouteRecord {
            id: self.id.clone(),
            name: if self.name.is_empty() {
                DEFAULT_ROUTE_NAME.to_string()
            } else {
                self.name.clone()
            },
            points: self
                .points
                .iter()
                .map(|p| [p.latitude, p.longitude])
                .collect(),
            distance: self.distance,
            elevation_gain: self.elevation_gain,
            created: self.created.clone(),
        }
    }

    /// Rebuild a route from its storage record.
    ///
    /// Points that are not finite coordinates are dropped and all derived
    /// data is recomputed; the stored `distance` is ignored. Persisted
    /// routes are finished, so the result does not accept mutation.
    pub fn from_record(record: RouteRecord) -> Self {
        let mut route = Self {
            id: record.id,
            name: record.name,
            points: record
                .points
                .iter()
                .map(|[lat, lng]| GpsPoint::new(*lat, *lng))
                .filter(GpsPoint::is_valid)
                .collect(),
            cumulative_distances: Vec::new(),
            distance: 0.0,
            elevation_gain: record.elevation_gain,
            created: record.created,
            finished: true,
            segment_distance: geo_utils::haversine_distance,
        };
        route.rebuild_cumulative_distances();
        route
    }
}

impl Default for Route {
    fn default() -> Self {
        Self::new()
    }
}
