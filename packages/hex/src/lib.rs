#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry resolver over the H3 hexagonal grid.
//!
//! Maps WGS84 points to H3 cells at a fixed resolution and converts cell
//! indices back to boundary polygons and centroids. Cell boundaries and
//! centroids are pure functions of the index, so nothing beyond the index
//! is ever stored.

use geo::{LineString, Polygon};
use h3o::{CellIndex, LatLng, Resolution};

/// Pipeline-wide H3 resolution.
///
/// Resolution 9 cells have a ~174m edge length: fine enough to separate
/// locations within a city, coarse enough that cells collect multiple
/// survey responses for a stable mean.
pub const DEFAULT_RESOLUTION: Resolution = Resolution::Nine;

/// Errors from coordinate and cell index handling.
#[derive(Debug, thiserror::Error)]
pub enum HexError {
    /// Latitude/longitude outside valid degree ranges.
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },

    /// A cell identifier string that is not a valid H3 index.
    #[error("Invalid cell id '{0}'")]
    InvalidCellId(String),

    /// A resolution value outside the H3 range (0–15).
    #[error("Invalid H3 resolution {0}")]
    InvalidResolution(u8),
}

/// Resolves a WGS84 point to its H3 cell at the given resolution.
///
/// Deterministic: the same coordinates always yield the same cell.
///
/// # Errors
///
/// Returns [`HexError::InvalidCoordinate`] if the coordinates are not
/// finite or outside valid degree ranges.
pub fn cell_for(
    latitude: f64,
    longitude: f64,
    resolution: Resolution,
) -> Result<CellIndex, HexError> {
    if !latitude.is_finite()
        || !longitude.is_finite()
        || latitude.abs() > 90.0
        || longitude.abs() > 180.0
    {
        return Err(HexError::InvalidCoordinate {
            latitude,
            longitude,
        });
    }
    let coord = LatLng::new(latitude, longitude).map_err(|_| HexError::InvalidCoordinate {
        latitude,
        longitude,
    })?;
    Ok(coord.to_cell(resolution))
}

/// Parses a cell identifier from its canonical hex string form.
///
/// # Errors
///
/// Returns [`HexError::InvalidCellId`] if the string is not a valid H3
/// cell index.
pub fn parse_cell(id: &str) -> Result<CellIndex, HexError> {
    id.parse::<CellIndex>()
        .map_err(|_| HexError::InvalidCellId(id.to_string()))
}

/// Converts a numeric H3 resolution into the typed [`Resolution`].
///
/// # Errors
///
/// Returns [`HexError::InvalidResolution`] for values outside 0–15.
pub fn resolution_from(value: u8) -> Result<Resolution, HexError> {
    Resolution::try_from(value).map_err(|_| HexError::InvalidResolution(value))
}

/// Returns the cell's boundary as a closed polygon in WGS84 degrees.
#[must_use]
pub fn cell_boundary(cell: CellIndex) -> Polygon<f64> {
    let ring: Vec<(f64, f64)> = cell
        .boundary()
        .iter()
        .map(|vertex| (vertex.lng(), vertex.lat()))
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Returns the cell's centroid as `(latitude, longitude)` degrees.
#[must_use]
pub fn cell_centroid(cell: CellIndex) -> (f64, f64) {
    let center = LatLng::from(cell);
    (center.lat(), center.lng())
}
