#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reference boundary loading and point clipping.
//!
//! Loads the study-area polygons from a `GeoJSON` file, builds an R-tree
//! spatial index over them, and restricts survey points to those inside.
//! The boundary's coordinate reference system is reconciled with the
//! points' WGS84 coordinates before any containment test — comparing raw
//! degrees against a projected boundary is a correctness bug, not a
//! performance concern.

use std::f64::consts::PI;
use std::path::Path;

use emotion_map_models::PointRecord;
use geo::{BoundingRect, Intersects, MultiPolygon};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};

/// WGS84 equatorial radius in meters, as used by Web Mercator.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Errors from boundary loading and clipping.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// I/O error reading the boundary file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The boundary file is not valid `GeoJSON`.
    #[error("GeoJSON parse error: {0}")]
    Geojson(#[from] geojson::Error),

    /// The boundary declares a coordinate reference system this pipeline
    /// cannot reconcile with WGS84 points.
    #[error("Unsupported coordinate reference system '{tag}'")]
    CrsMismatch {
        /// The CRS tag as it appears in the boundary file.
        tag: String,
    },

    /// The boundary file contains no polygon geometry at all.
    #[error("Boundary file contains no polygons")]
    EmptyBoundary,
}

/// A coordinate reference system the clipper can reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Geographic degrees (EPSG:4326 / CRS84). The CRS of all survey
    /// points and the `GeoJSON` default.
    Wgs84,
    /// Spherical Web Mercator meters (EPSG:3857).
    WebMercator,
}

impl Crs {
    /// Parses a `GeoJSON` `crs` name tag.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::CrsMismatch`] for any tag that is neither
    /// WGS84 nor Web Mercator.
    pub fn parse(tag: &str) -> Result<Self, SpatialError> {
        match tag {
            "EPSG:4326" | "urn:ogc:def:crs:EPSG::4326" | "urn:ogc:def:crs:OGC:1.3:CRS84" => {
                Ok(Self::Wgs84)
            }
            "EPSG:3857" | "urn:ogc:def:crs:EPSG::3857" => Ok(Self::WebMercator),
            other => Err(SpatialError::CrsMismatch {
                tag: other.to_string(),
            }),
        }
    }

    /// Projects a WGS84 `(latitude, longitude)` point into this CRS,
    /// returned as an `(x, y)` coordinate.
    #[must_use]
    pub fn project(self, latitude: f64, longitude: f64) -> (f64, f64) {
        match self {
            Self::Wgs84 => (longitude, latitude),
            Self::WebMercator => (
                EARTH_RADIUS_M * longitude.to_radians(),
                EARTH_RADIUS_M * (PI / 4.0 + latitude.to_radians() / 2.0).tan().ln(),
            ),
        }
    }
}

/// A boundary polygon stored in the R-tree.
struct BoundaryEntry {
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// The immutable study-area boundary with its spatial index.
///
/// Loaded once per run and never mutated.
pub struct ReferenceBoundary {
    crs: Crs,
    tree: RTree<BoundaryEntry>,
}

impl ReferenceBoundary {
    /// Loads boundary polygons from a `GeoJSON` file and builds the
    /// R-tree index.
    ///
    /// The CRS is read from the file's `crs` member; a file without one
    /// is WGS84 per the `GeoJSON` specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, declares an
    /// unsupported CRS, or contains no polygons.
    pub fn from_geojson_file(path: &Path) -> Result<Self, SpatialError> {
        let contents = std::fs::read_to_string(path)?;
        let geojson: GeoJson = contents.parse()?;

        let crs = declared_crs(&geojson)?.unwrap_or(Crs::Wgs84);

        let mut entries = Vec::new();
        collect_polygons(&geojson, &mut entries);
        if entries.is_empty() {
            return Err(SpatialError::EmptyBoundary);
        }

        log::info!(
            "Loaded {} boundary polygon(s) from {} ({crs:?})",
            entries.len(),
            path.display()
        );

        Ok(Self {
            crs,
            tree: RTree::bulk_load(entries),
        })
    }

    /// Builds a boundary directly from WGS84 polygons.
    #[must_use]
    pub fn from_polygons(polygons: Vec<MultiPolygon<f64>>) -> Self {
        let entries = polygons
            .into_iter()
            .filter_map(|polygon| {
                let envelope = compute_envelope(&polygon)?;
                Some(BoundaryEntry { envelope, polygon })
            })
            .collect();
        Self {
            crs: Crs::Wgs84,
            tree: RTree::bulk_load(entries),
        }
    }

    /// The boundary's coordinate reference system.
    #[must_use]
    pub const fn crs(&self) -> Crs {
        self.crs
    }

    /// Whether a WGS84 point falls inside (or on the edge of) any
    /// boundary polygon.
    ///
    /// The point is projected into the boundary's CRS before the test.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        let (x, y) = self.crs.project(latitude, longitude);
        let point = geo::Point::new(x, y);
        let query_env = AABB::from_point([x, y]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .any(|entry| entry.polygon.intersects(&point))
    }
}

/// Restricts a point set to those inside the reference boundary.
///
/// Inputs are not mutated; an empty result is valid and flows through to
/// downstream stages as zero aggregated cells.
#[must_use]
pub fn clip(points: &[PointRecord], boundary: &ReferenceBoundary) -> Vec<PointRecord> {
    let clipped: Vec<PointRecord> = points
        .iter()
        .filter(|p| boundary.contains(p.latitude, p.longitude))
        .cloned()
        .collect();

    log::info!(
        "Clipped {} points to {} inside the boundary",
        points.len(),
        clipped.len()
    );

    clipped
}

/// Reads the `crs` foreign member from a `GeoJSON` document, if present.
fn declared_crs(geojson: &GeoJson) -> Result<Option<Crs>, SpatialError> {
    let foreign = match geojson {
        GeoJson::FeatureCollection(fc) => fc.foreign_members.as_ref(),
        GeoJson::Feature(f) => f.foreign_members.as_ref(),
        GeoJson::Geometry(g) => g.foreign_members.as_ref(),
    };

    let Some(tag) = foreign
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(|name| name.as_str())
    else {
        return Ok(None);
    };

    Crs::parse(tag).map(Some)
}

/// Collects every polygon in the document into R-tree entries.
/// Non-polygon geometries are skipped with a warning.
fn collect_polygons(geojson: &GeoJson, entries: &mut Vec<BoundaryEntry>) {
    let geometries: Vec<&geojson::Geometry> = match geojson {
        GeoJson::FeatureCollection(fc) => fc
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .collect(),
        GeoJson::Feature(f) => f.geometry.iter().collect(),
        GeoJson::Geometry(g) => vec![g],
    };

    for geometry in geometries {
        let Ok(geo_geom) = geo::Geometry::<f64>::try_from(geometry.clone()) else {
            log::warn!("Skipping unparseable boundary geometry");
            continue;
        };
        let multi_polygon = match geo_geom {
            geo::Geometry::MultiPolygon(mp) => mp,
            geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
            other => {
                log::warn!("Skipping non-polygon boundary geometry: {other:?}");
                continue;
            }
        };
        if let Some(envelope) = compute_envelope(&multi_polygon) {
            entries.push(BoundaryEntry {
                envelope,
                polygon: multi_polygon,
            });
        }
    }
}

/// Computes the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    fn square_boundary() -> ReferenceBoundary {
        // Degree square roughly covering central Berlin.
        let square = polygon![
            (x: 13.2, y: 52.4),
            (x: 13.6, y: 52.4),
            (x: 13.6, y: 52.6),
            (x: 13.2, y: 52.6),
            (x: 13.2, y: 52.4),
        ];
        ReferenceBoundary::from_polygons(vec![MultiPolygon(vec![square])])
    }

    #[test]
    fn keeps_inside_points_drops_outside_points() {
        let boundary = square_boundary();
        let points = vec![
            PointRecord::at(52.52, 13.40),
            PointRecord::at(48.85, 2.35), // Paris
        ];
        let clipped = clip(&points, &boundary);
        assert_eq!(clipped.len(), 1);
        assert!((clipped[0].latitude - 52.52).abs() < f64::EPSILON);
    }

    #[test]
    fn boundary_edge_points_are_kept() {
        let boundary = square_boundary();
        assert!(boundary.contains(52.4, 13.4));
    }

    #[test]
    fn empty_clip_result_is_valid() {
        let boundary = square_boundary();
        let points = vec![PointRecord::at(0.0, 0.0)];
        assert!(clip(&points, &boundary).is_empty());
    }

    #[test]
    fn clip_does_not_mutate_inputs() {
        let boundary = square_boundary();
        let points = vec![PointRecord::at(52.52, 13.40)];
        let _ = clip(&points, &boundary);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn parses_wgs84_tags() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::Wgs84);
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
            Crs::Wgs84
        );
    }

    #[test]
    fn rejects_unknown_crs() {
        assert!(matches!(
            Crs::parse("EPSG:25833"),
            Err(SpatialError::CrsMismatch { .. })
        ));
    }

    #[test]
    fn wgs84_projection_is_identity() {
        let (x, y) = Crs::Wgs84.project(52.52, 13.405);
        assert!((x - 13.405).abs() < f64::EPSILON);
        assert!((y - 52.52).abs() < f64::EPSILON);
    }

    #[test]
    fn mercator_projection_matches_reference_values() {
        // Known EPSG:3857 coordinates for (0, 45°E).
        let (x, y) = Crs::WebMercator.project(0.0, 45.0);
        assert!((x - 5_009_377.085_697_311).abs() < 1.0);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn mercator_boundary_clips_wgs84_points() {
        // The same Berlin square, expressed in Web Mercator meters.
        let corners: Vec<(f64, f64)> = [
            (52.4, 13.2),
            (52.4, 13.6),
            (52.6, 13.6),
            (52.6, 13.2),
            (52.4, 13.2),
        ]
        .iter()
        .map(|&(lat, lng)| Crs::WebMercator.project(lat, lng))
        .collect();
        let square = geo::Polygon::new(geo::LineString::from(corners), vec![]);
        let boundary = ReferenceBoundary {
            crs: Crs::WebMercator,
            tree: RTree::bulk_load(vec![BoundaryEntry {
                envelope: compute_envelope(&MultiPolygon(vec![square.clone()])).unwrap(),
                polygon: MultiPolygon(vec![square]),
            }]),
        };

        assert!(boundary.contains(52.52, 13.40));
        assert!(!boundary.contains(48.85, 2.35));
    }

    #[test]
    fn geojson_crs_member_is_honored() {
        let doc = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:25833"}},
            "features": []
        }"#;
        let geojson: GeoJson = doc.parse().unwrap();
        assert!(matches!(
            declared_crs(&geojson),
            Err(SpatialError::CrsMismatch { .. })
        ));
    }
}
