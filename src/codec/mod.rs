//! Import and export codecs.
//!
//! Two formats are spoken: GPX (the interchange format most devices and
//! services emit) and GeoJSON (what web map layers consume). Internal point
//! order is `[lat, lng]`; GeoJSON positions are `[lng, lat]`. That
//! inversion is applied on every export and reversed on every import, in
//! these modules and nowhere else.

pub mod geojson;
pub mod gpx;

pub use self::geojson::{route_from_geojson, route_to_geojson};
pub use self::gpx::{decode_gpx, encode_gpx, route_from_gpx, DecodedGpx};
