//! Canonical normalization of heterogeneous point and route representations.
//!
//! Routes arrive from storage, imports and older app versions in several
//! shapes: points as `[lat, lng]` pairs or as `{lat, lng}` objects, numbers
//! as numbers or as numeric strings, timestamps as strings or epoch
//! milliseconds. Everything is funneled through this module before any
//! geometry or persistence code touches it. Shapes that cannot be
//! normalized become "no value" and are skipped by callers, never raised.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use crate::route::RouteRecord;
use crate::GpsPoint;

/// Placeholder applied when a route has no usable name.
pub const DEFAULT_ROUTE_NAME: &str = "Unnamed route";

/// Coerce a JSON value to a float: numbers directly, numeric strings parsed.
fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Normalize an arbitrary point representation.
///
/// Accepted shapes:
/// - a two-element array `[lat, lng]`
/// - an object with `lat`/`lng` or `latitude`/`longitude` fields
///
/// with each coordinate a number or a numeric string. Anything else yields
/// `None`; callers skip the point rather than failing the whole route.
pub fn point_from_value(value: &Value) -> Option<GpsPoint> {
    match value {
        Value::Array(parts) if parts.len() == 2 => {
            let lat = value_to_f64(&parts[0])?;
            let lng = value_to_f64(&parts[1])?;
            Some(GpsPoint::new(lat, lng))
        }
        Value::Object(map) => {
            let lat = map
                .get("lat")
                .or_else(|| map.get("latitude"))
                .and_then(value_to_f64)?;
            let lng = map
                .get("lng")
                .or_else(|| map.get("longitude"))
                .and_then(value_to_f64)?;
            Some(GpsPoint::new(lat, lng))
        }
        _ => None,
    }
}

/// Normalize a creation timestamp to canonical ISO-8601 with milliseconds.
///
/// Existing strings pass through untouched so that normalization stays
/// idempotent. Numbers are taken as epoch milliseconds (the native
/// date-time form in record JSON). Anything else becomes "now".
pub fn created_to_iso(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(format_iso)
            .unwrap_or_else(now_iso),
        _ => now_iso(),
    }
}

/// Canonical timestamp format: `2024-01-01T00:00:00.000Z`.
pub(crate) fn format_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn now_iso() -> String {
    format_iso(Utc::now())
}

/// Normalize an arbitrary route representation into the canonical storage
/// record.
///
/// Coercions: `id` to string, `name` to non-blank string (placeholder when
/// missing or blank), each point to a `[lat, lng]` pair with unparseable
/// points dropped, `distance` and `elevationGain` to numbers defaulting to
/// 0, `created` to ISO-8601. Idempotent: a record already in canonical form
/// comes back field-for-field identical.
///
/// Returns `None` when the value is not an object or carries no usable id;
/// such a record cannot be keyed and is unusable.
pub fn normalize_record(value: &Value) -> Option<RouteRecord> {
    let map = value.as_object()?;

    let id = match map.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return None,
    };

    let name = match map.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => DEFAULT_ROUTE_NAME.to_string(),
    };

    let points = map
        .get("points")
        .and_then(Value::as_array)
        .map(|raw| {
            raw.iter()
                .filter_map(point_from_value)
                .map(|p| [p.latitude, p.longitude])
                .collect()
        })
        .unwrap_or_default();

    let distance = map.get("distance").and_then(value_to_f64).unwrap_or(0.0);
    let elevation_gain = map
        .get("elevationGain")
        .and_then(value_to_f64)
        .unwrap_or(0.0);
    let created = created_to_iso(map.get("created"));

    Some(RouteRecord {
        id,
        name,
        points,
        distance,
        elevation_gain,
        created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_from_numeric_pair() {
        let p = point_from_value(&json!([47.5, 8.7]));
        assert_eq!(p, Some(GpsPoint::new(47.5, 8.7)));
    }

    #[test]
    fn test_point_from_string_pair() {
        let p = point_from_value(&json!(["11", "21"]));
        assert_eq!(p, Some(GpsPoint::new(11.0, 21.0)));
    }

    #[test]
    fn test_point_from_object() {
        let p = point_from_value(&json!({"lat": "10", "lng": "20"}));
        assert_eq!(p, Some(GpsPoint::new(10.0, 20.0)));
    }

    #[test]
    fn test_point_from_long_field_names() {
        let p = point_from_value(&json!({"latitude": 1.5, "longitude": -2.5}));
        assert_eq!(p, Some(GpsPoint::new(1.5, -2.5)));
    }

    #[test]
    fn test_point_invalid_shapes() {
        assert_eq!(point_from_value(&json!([1.0])), None);
        assert_eq!(point_from_value(&json!([1.0, 2.0, 3.0])), None);
        assert_eq!(point_from_value(&json!(["abc", "def"])), None);
        assert_eq!(point_from_value(&json!({"lat": 1.0})), None);
        assert_eq!(point_from_value(&json!(null)), None);
        assert_eq!(point_from_value(&json!(42)), None);
        assert_eq!(point_from_value(&json!({"lat": true, "lng": 2.0})), None);
    }

    #[test]
    fn test_created_from_epoch_millis() {
        // 2024-01-01T00:00:00Z
        let iso = created_to_iso(Some(&json!(1_704_067_200_000_i64)));
        assert_eq!(iso, "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_created_string_passes_through() {
        let iso = created_to_iso(Some(&json!("2024-01-01T00:00:00.000Z")));
        assert_eq!(iso, "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_created_missing_defaults_to_now() {
        let iso = created_to_iso(None);
        assert!(iso.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&iso).is_ok());
    }

    #[test]
    fn test_normalize_mixed_record() {
        let raw = json!({
            "id": 123,
            "name": " Test Route ",
            "points": [{"lat": "10", "lng": "20"}, ["11", "21"]],
            "distance": "42",
            "elevationGain": "5",
            "created": 1_704_067_200_000_i64,
        });
        let record = normalize_record(&raw).unwrap();
        assert_eq!(record.id, "123");
        assert_eq!(record.name, " Test Route ");
        assert_eq!(record.points, vec![[10.0, 20.0], [11.0, 21.0]]);
        assert_eq!(record.distance, 42.0);
        assert_eq!(record.elevation_gain, 5.0);
        assert_eq!(record.created, "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = json!({
            "id": 123,
            "name": " Test Route ",
            "points": [{"lat": "10", "lng": "20"}, ["11", "21"]],
            "distance": "42",
            "elevationGain": "5",
            "created": "2024-01-01T00:00:00.000Z",
        });
        let once = normalize_record(&raw).unwrap();
        let twice = normalize_record(&serde_json::to_value(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_drops_unparseable_points() {
        let raw = json!({
            "id": "r1",
            "name": "Partial",
            "points": [[1.0, 2.0], "garbage", [3.0], {"lat": 4.0, "lng": 5.0}],
            "created": "2024-01-01T00:00:00.000Z",
        });
        let record = normalize_record(&raw).unwrap();
        assert_eq!(record.points, vec![[1.0, 2.0], [4.0, 5.0]]);
        assert_eq!(record.distance, 0.0);
        assert_eq!(record.elevation_gain, 0.0);
    }

    #[test]
    fn test_normalize_blank_name_gets_placeholder() {
        let raw = json!({"id": "r1", "name": "   "});
        let record = normalize_record(&raw).unwrap();
        assert_eq!(record.name, DEFAULT_ROUTE_NAME);

        let raw = json!({"id": "r1"});
        let record = normalize_record(&raw).unwrap();
        assert_eq!(record.name, DEFAULT_ROUTE_NAME);
    }

    #[test]
    fn test_normalize_rejects_unkeyed_records() {
        assert!(normalize_record(&json!({"name": "No id"})).is_none());
        assert!(normalize_record(&json!("not an object")).is_none());
        assert!(normalize_record(&json!({"id": ""})).is_none());
    }
}
