//! GPX decoding and encoding.
//!
//! Decoding reads the first track, flattening its segments into one point
//! sequence in document order; further tracks belong to other recordings
//! and are ignored. Documents whose tracks yield no points fall back to
//! the first `<rte>` route. Encoding always writes a single-track GPX 1.1
//! document.

use std::io::Read;

use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use log::debug;

use crate::error::{Result, WaytraceError};
use crate::route::Route;
use crate::GpsPoint;

/// Geometry and metadata extracted from a GPX document.
#[derive(Debug, Clone)]
pub struct DecodedGpx {
    /// Name of the decoded track (or route, or document metadata), if any.
    pub name: Option<String>,
    /// Points of the decoded track's segments, in document order.
    pub points: Vec<GpsPoint>,
}

/// Extract line geometry from the first track of a GPX document, falling
/// back to the first `<rte>` route when the tracks yield no points.
///
/// Fails with [`WaytraceError::NoRouteData`] when no points can be
/// extracted; points with non-finite coordinates are dropped silently.
pub fn decode_gpx<R: Read>(reader: R) -> Result<DecodedGpx> {
    let doc = gpx::read(reader)?;

    let mut name = None;
    let mut points = Vec::new();

    if let Some(track) = doc.tracks.first() {
        name = track.name.clone();
        for segment in &track.segments {
            collect_waypoints(&segment.points, &mut points);
        }
    }

    // Planned-route documents carry <rte> instead of <trk>.
    if points.is_empty() {
        if let Some(route) = doc.routes.first() {
            if name.is_none() {
                name = route.name.clone();
            }
            collect_waypoints(&route.points, &mut points);
        }
    }

    if name.is_none() {
        name = doc.metadata.as_ref().and_then(|m| m.name.clone());
    }

    if points.is_empty() {
        return Err(WaytraceError::NoRouteData);
    }

    debug!(
        "[GpxCodec] Decoded {} points ({} tracks, {} routes)",
        points.len(),
        doc.tracks.len(),
        doc.routes.len()
    );
    Ok(DecodedGpx { name, points })
}

/// Import a GPX document as an already-finalized route.
pub fn route_from_gpx<R: Read>(reader: R) -> Result<Route> {
    let decoded = decode_gpx(reader)?;
    if decoded.points.len() < 2 {
        // A single point is not line geometry.
        return Err(WaytraceError::NoRouteData);
    }

    let mut route = Route::new();
    for point in decoded.points {
        route.append_point(point);
    }
    route.finalize(decoded.name.as_deref().unwrap_or(""))?;
    Ok(route)
}

/// Encode a route as a single-track GPX 1.1 document.
pub fn encode_gpx(route: &Route) -> Result<String> {
    let mut segment = TrackSegment::default();
    for point in route.points() {
        // GPX wants lon/lat order through the geo point type.
        segment
            .points
            .push(Waypoint::new(geo::Point::new(point.longitude, point.latitude)));
    }

    let mut track = Track::default();
    track.name = Some(route.name().to_string());
    track.segments.push(segment);

    let doc = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("waytrace".to_string()),
        tracks: vec![track],
        ..Gpx::default()
    };

    let mut out = Vec::new();
    gpx::write(&doc, &mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn collect_waypoints(waypoints: &[Waypoint], out: &mut Vec<GpsPoint>) {
    for waypoint in waypoints {
        let p = waypoint.point();
        let point = GpsPoint::new(p.y(), p.x());
        if point.is_valid() {
            out.push(point);
        }
    }
}
