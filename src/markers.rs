//! Interval markers along a route path.
//!
//! A marker sits at every whole multiple of the marker interval (1 km by
//! default) that fits within the route's total distance. Each marker is
//! found by locating the segment whose cumulative span straddles the target
//! distance and interpolating linearly within it, so markers land exactly
//! on the rendered path.

use crate::geo_utils::{self, SegmentDistance};
use crate::route::{self, Route};
use crate::GpsPoint;

/// Default distance between consecutive interval markers, in meters.
pub const MARKER_INTERVAL_M: f64 = 1000.0;

/// Interpolate the point at path distance `target` along a polyline.
///
/// `cumulative` must parallel `points` (`cumulative[i]` is the path length
/// from point 0 to point i). Returns `None` when the path is shorter than
/// the target or has fewer than 2 points.
pub fn point_at_distance(
    points: &[GpsPoint],
    cumulative: &[f64],
    target: f64,
) -> Option<GpsPoint> {
    if points.len() < 2 || cumulative.len() != points.len() {
        return None;
    }
    let i = cumulative.iter().position(|&d| d >= target)?;
    if i == 0 {
        return Some(points[0]);
    }
    let span = cumulative[i] - cumulative[i - 1];
    if span <= 0.0 {
        // Zero-length segment (duplicate point); nothing to interpolate.
        return Some(points[i]);
    }
    let t = (target - cumulative[i - 1]) / span;
    Some(geo_utils::interpolate(&points[i - 1], &points[i], t))
}

/// Place markers at every `interval` meters along a path of `total` meters.
///
/// When `cumulative` does not parallel the point list (stale or absent), the
/// sequence is recomputed on the fly with `segment` before placing markers.
pub fn interval_markers(
    points: &[GpsPoint],
    cumulative: &[f64],
    total: f64,
    interval: f64,
    segment: SegmentDistance,
) -> Vec<GpsPoint> {
    if points.len() < 2 || interval <= 0.0 || total < interval {
        return Vec::new();
    }

    let rebuilt;
    let cumulative = if cumulative.len() == points.len() {
        cumulative
    } else {
        rebuilt = route::cumulative_distances_of(points, segment);
        rebuilt.as_slice()
    };

    let count = (total / interval).floor() as usize;
    let mut markers = Vec::with_capacity(count);
    for k in 1..=count {
        match point_at_distance(points, cumulative, k as f64 * interval) {
            Some(marker) => markers.push(marker),
            None => break,
        }
    }
    markers
}

/// Incrementally maintained marker set for a route under construction.
///
/// After every mutation the tracker truncates markers past the new
/// whole-interval count and appends only the missing ones. Markers that
/// keep their position are never re-interpolated, so undo followed by
/// redraw leaves the surviving markers bit-identical.
#[derive(Debug, Clone)]
pub struct MarkerTracker {
    interval: f64,
    markers: Vec<GpsPoint>,
}

impl MarkerTracker {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            markers: Vec::new(),
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Markers currently placed, in distance order.
    pub fn markers(&self) -> &[GpsPoint] {
        &self.markers
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Bring the marker set in line with the route's current geometry.
    pub fn update(&mut self, route: &Route) {
        let count = if self.interval > 0.0 && route.distance() >= self.interval {
            (route.distance() / self.interval).floor() as usize
        } else {
            0
        };

        self.markers.truncate(count);
        for k in (self.markers.len() + 1)..=count {
            match point_at_distance(
                route.points(),
                route.cumulative_distances(),
                k as f64 * self.interval,
            ) {
                Some(marker) => self.markers.push(marker),
                None => break,
            }
        }
    }
}

impl Default for MarkerTracker {
    fn default() -> Self {
        Self::new(MARKER_INTERVAL_M)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::haversine_distance;

    // Straight path along the equator; 1 degree of longitude ~111.2 km.
    fn equator_points() -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 0.01),
            GpsPoint::new(0.0, 0.02),
        ]
    }

    #[test]
    fn test_marker_interpolates_within_straddling_segment() {
        let points = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 1.0),
            GpsPoint::new(0.0, 2.0),
        ];
        let cumulative = [0.0, 600.0, 1600.0];

        let markers = interval_markers(&points, &cumulative, 1600.0, 1000.0, haversine_distance);
        assert_eq!(markers.len(), 1);

        // 1000 m target is 400/1000 of the way through the second segment.
        let marker = markers[0];
        assert!((marker.longitude - 1.4).abs() < 1e-12);
        assert_eq!(marker.latitude, 0.0);
    }

    #[test]
    fn test_no_marker_below_one_interval() {
        let points = equator_points();
        let cumulative = [0.0, 400.0, 800.0];
        let markers = interval_markers(&points, &cumulative, 800.0, 1000.0, haversine_distance);
        assert!(markers.is_empty());
    }

    #[test]
    fn test_marker_at_exact_path_end() {
        let points = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 2.0)];
        let cumulative = [0.0, 2000.0];
        let markers = interval_markers(&points, &cumulative, 2000.0, 1000.0, haversine_distance);
        assert_eq!(markers.len(), 2);
        assert!((markers[0].longitude - 1.0).abs() < 1e-12);
        assert!((markers[1].longitude - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_stale_cumulative_falls_back_to_recompute() {
        let points = equator_points();
        let total = crate::geo_utils::polyline_length(&points);
        assert!(total > 2000.0);

        let with_fresh = interval_markers(
            &points,
            &route::cumulative_distances_of(&points, haversine_distance),
            total,
            1000.0,
            haversine_distance,
        );
        let with_stale = interval_markers(&points, &[], total, 1000.0, haversine_distance);
        assert_eq!(with_fresh, with_stale);
        assert_eq!(with_fresh.len(), 2);
    }

    #[test]
    fn test_point_at_distance_beyond_path_is_none() {
        let points = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0)];
        let cumulative = [0.0, 500.0];
        assert!(point_at_distance(&points, &cumulative, 501.0).is_none());
    }

    #[test]
    fn test_tracker_matches_full_recompute() {
        let mut route = Route::new();
        let mut tracker = MarkerTracker::default();
        for lng in [0.0, 0.01, 0.02, 0.03, 0.04] {
            route.append_point(GpsPoint::new(0.0, lng));
            tracker.update(&route);
        }

        let recomputed = interval_markers(
            route.points(),
            route.cumulative_distances(),
            route.distance(),
            MARKER_INTERVAL_M,
            route.segment_distance_fn(),
        );
        assert_eq!(tracker.markers(), recomputed.as_slice());
        assert!(!recomputed.is_empty());
    }

    #[test]
    fn test_tracker_truncates_on_undo_without_moving_survivors() {
        let mut route = Route::new();
        let mut tracker = MarkerTracker::default();
        for lng in [0.0, 0.01, 0.02, 0.03] {
            route.append_point(GpsPoint::new(0.0, lng));
            tracker.update(&route);
        }
        let before = tracker.markers().to_vec();
        assert!(before.len() >= 2);

        route.remove_last_point();
        tracker.update(&route);
        let after = tracker.markers().to_vec();
        assert!(after.len() < before.len());
        // Surviving markers are the exact same values, never re-derived.
        assert_eq!(&before[..after.len()], after.as_slice());

        // Redrawing the same point brings the set back.
        route.append_point(GpsPoint::new(0.0, 0.03));
        tracker.update(&route);
        assert_eq!(tracker.markers(), before.as_slice());
    }

    #[test]
    fn test_tracker_clears_when_route_resets() {
        let mut route = Route::new();
        let mut tracker = MarkerTracker::default();
        route.append_point(GpsPoint::new(0.0, 0.0));
        route.append_point(GpsPoint::new(0.0, 0.02));
        tracker.update(&route);
        assert!(!tracker.markers().is_empty());

        tracker.clear();
        assert!(tracker.markers().is_empty());
    }
}
