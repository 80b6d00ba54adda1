//! Unified error handling for the waytrace library.
//!
//! Geometry helpers stay infallible (invalid input degrades to "no value"),
//! so errors here come from the edges: validation at finalization, codecs,
//! storage, and the tile downloader.

use thiserror::Error;

/// Unified error type for waytrace operations.
#[derive(Debug, Error)]
pub enum WaytraceError {
    /// Route has too few points to be finalized
    #[error("route has {count} points, at least 2 required")]
    TooFewPoints { count: usize },

    /// Imported document contains no usable line geometry
    #[error("no route data found in document")]
    NoRouteData,

    /// Stored route representation could not be normalized
    #[error("invalid route record: {0}")]
    InvalidRecord(String),

    /// GPX parsing or writing error
    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    /// GeoJSON parsing error
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(String),
}

/// Convenience result type for waytrace operations.
pub type Result<T> = std::result::Result<T, WaytraceError>;
