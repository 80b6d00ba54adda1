//! Geographic utilities: segment distances, path length, interpolation
//! and distance formatting.
//!
//! Distances use the haversine great-circle formula on a spherical Earth.
//! The error against an ellipsoidal model is well under 0.5%, which is
//! irrelevant next to consumer GPS noise.

use crate::GpsPoint;

/// Mean Earth radius in meters (spherical model).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Signature of a segment-distance function.
///
/// Everything that accumulates distance takes one of these, so a host that
/// prefers its mapping widget's own geodesic can swap it in. The crate-wide
/// default is [`haversine_distance`].
pub type SegmentDistance = fn(&GpsPoint, &GpsPoint) -> f64;

/// Great-circle distance between two points in meters.
pub fn haversine_distance(a: &GpsPoint, b: &GpsPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Total haversine length of a polyline in meters.
///
/// Zero for fewer than two points.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance(&pair[0], &pair[1]))
        .sum()
}

/// Linear interpolation between two points.
///
/// `t` is the fraction of the way from `a` to `b`. Interpolation is done
/// directly on latitude and longitude, which is what marker placement wants:
/// markers must sit exactly on the rendered straight-line segment, not on
/// the geodesic between its endpoints.
pub fn interpolate(a: &GpsPoint, b: &GpsPoint, t: f64) -> GpsPoint {
    GpsPoint::new(
        a.latitude + (b.latitude - a.latitude) * t,
        a.longitude + (b.longitude - a.longitude) * t,
    )
}

/// Format a distance in meters as kilometers with two decimals, e.g. "4.21 km".
pub fn format_km(meters: f64) -> String {
    format!("{:.2} km", meters / 1000.0)
}
