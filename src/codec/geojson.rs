//! GeoJSON encoding and decoding.
//!
//! Exports are a single `Feature` with a `LineString` geometry. GeoJSON
//! position order is `[lng, lat]`, the reverse of the crate-internal
//! `[lat, lng]`; the swap happens on every export and import here.

use geojson::feature::Id;
use geojson::{Feature, GeoJson, Geometry, JsonObject, Value as GeoValue};

use crate::error::{Result, WaytraceError};
use crate::route::Route;
use crate::GpsPoint;

/// Export a route as a GeoJSON `Feature` with `LineString` geometry.
///
/// The route's metadata travels in `properties`; the bounding box is set
/// in west/south/east/north order as GeoJSON wants it.
pub fn route_to_geojson(route: &Route) -> Feature {
    let coordinates: Vec<Vec<f64>> = route
        .points()
        .iter()
        .map(|p| vec![p.longitude, p.latitude])
        .collect();

    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), route.name().into());
    properties.insert("distance".to_string(), route.distance().into());
    properties.insert("elevationGain".to_string(), route.elevation_gain().into());
    properties.insert("created".to_string(), route.created().into());

    Feature {
        bbox: route
            .bounds()
            .map(|b| vec![b.min_lng, b.min_lat, b.max_lng, b.max_lat]),
        geometry: Some(Geometry::new(GeoValue::LineString(coordinates))),
        id: Some(Id::String(route.id().to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Import a GeoJSON document as an already-finalized route.
///
/// Accepts a bare `LineString` geometry, a `Feature` wrapping one, or a
/// `FeatureCollection` (the first feature with a `LineString` wins). All
/// derived data is recomputed on import; a `distance` property is ignored.
pub fn route_from_geojson(input: &str) -> Result<Route> {
    let parsed: GeoJson = input.parse()?;

    let (coordinates, name) = match &parsed {
        GeoJson::Geometry(geometry) => (line_string_of(geometry), None),
        GeoJson::Feature(feature) => (feature_line_string(feature), feature_name(feature)),
        GeoJson::FeatureCollection(collection) => {
            match collection
                .features
                .iter()
                .find(|f| feature_line_string(f).is_some())
            {
                Some(feature) => (feature_line_string(feature), feature_name(feature)),
                None => (None, None),
            }
        }
    };

    let coordinates = coordinates.ok_or(WaytraceError::NoRouteData)?;
    let points: Vec<GpsPoint> = coordinates
        .iter()
        .filter(|pos| pos.len() >= 2)
        .map(|pos| GpsPoint::new(pos[1], pos[0]))
        .filter(GpsPoint::is_valid)
        .collect();

    if points.len() < 2 {
        return Err(WaytraceError::NoRouteData);
    }

    let mut route = Route::new();
    for point in points {
        route.append_point(point);
    }
    route.finalize(name.as_deref().unwrap_or(""))?;
    Ok(route)
}

fn line_string_of(geometry: &Geometry) -> Option<&Vec<Vec<f64>>> {
    match &geometry.value {
        GeoValue::LineString(coordinates) => Some(coordinates),
        _ => None,
    }
}

fn feature_line_string(feature: &Feature) -> Option<&Vec<Vec<f64>>> {
    feature.geometry.as_ref().and_then(line_string_of)
}

fn feature_name(feature: &Feature) -> Option<String> {
    feature
        .properties
        .as_ref()
        .and_then(|props| props.get("name"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_route() -> Route {
        let mut route = Route::new();
        route.append_point(GpsPoint::new(47.3769, 8.5417));
        route.append_point(GpsPoint::new(47.3800, 8.5500));
        route.append_point(GpsPoint::new(47.3850, 8.5600));
        route.finalize("Lake loop").unwrap();
        route
    }

    #[test]
    fn test_export_inverts_to_lng_lat() {
        let route = sample_route();
        let feature = route_to_geojson(&route);

        let geometry = feature.geometry.unwrap();
        match geometry.value {
            GeoValue::LineString(coords) => {
                assert_eq!(coords.len(), 3);
                // Internal order is [lat, lng]; exported positions are [lng, lat].
                assert_eq!(coords[0], vec![8.5417, 47.3769]);
            }
            other => panic!("expected LineString, got {:?}", other),
        }
    }

    #[test]
    fn test_export_carries_metadata() {
        let route = sample_route();
        let feature = route_to_geojson(&route);

        let props = feature.properties.unwrap();
        assert_eq!(props.get("name").unwrap(), "Lake loop");
        assert_eq!(
            props.get("distance").unwrap().as_f64().unwrap(),
            route.distance()
        );
        assert!(feature.bbox.is_some());
        assert!(matches!(feature.id, Some(Id::String(_))));
    }

    #[test]
    fn test_export_import_round_trip() {
        let route = sample_route();
        let json = route_to_geojson(&route).to_string();
        let reimported = route_from_geojson(&json).unwrap();

        assert_eq!(reimported.name(), "Lake loop");
        assert_eq!(reimported.point_count(), 3);
        for (a, b) in route.points().iter().zip(reimported.points()) {
            assert!((a.latitude - b.latitude).abs() < 1e-9);
            assert!((a.longitude - b.longitude).abs() < 1e-9);
        }
        assert!((reimported.distance() - route.distance()).abs() < 1e-6);
    }

    #[test]
    fn test_import_bare_geometry() {
        let json = r#"{"type":"LineString","coordinates":[[8.5,47.3],[8.6,47.4]]}"#;
        let route = route_from_geojson(json).unwrap();
        assert_eq!(route.point_count(), 2);
        assert_eq!(route.points()[0].latitude, 47.3);
        assert_eq!(route.points()[0].longitude, 8.5);
    }

    #[test]
    fn test_import_feature_collection_takes_first_line_string() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "A point"},
                 "geometry": {"type": "Point", "coordinates": [8.0, 47.0]}},
                {"type": "Feature", "properties": {"name": "The line"},
                 "geometry": {"type": "LineString", "coordinates": [[8.0, 47.0], [8.1, 47.1]]}}
            ]
        }"#;
        let route = route_from_geojson(json).unwrap();
        assert_eq!(route.name(), "The line");
        assert_eq!(route.point_count(), 2);
    }

    #[test]
    fn test_import_without_line_geometry_is_no_route_data() {
        let json = r#"{"type":"Feature","properties":{},
            "geometry":{"type":"Point","coordinates":[8.0,47.0]}}"#;
        let err = route_from_geojson(json).unwrap_err();
        assert!(matches!(err, WaytraceError::NoRouteData));
    }

    #[test]
    fn test_import_malformed_json_is_parse_error() {
        let err = route_from_geojson("{not geojson").unwrap_err();
        assert!(matches!(err, WaytraceError::GeoJson(_)));
    }

    #[test]
    fn test_import_ignores_stored_distance_property() {
        let json = r#"{"type":"Feature","properties":{"name":"Tampered","distance":1.0},
            "geometry":{"type":"LineString","coordinates":[[0.0,0.0],[1.0,0.0]]}}"#;
        let route = route_from_geojson(json).unwrap();
        assert!(route.distance() > 100_000.0);
    }
}
