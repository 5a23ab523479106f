#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive map rendering.
//!
//! Consumes the aggregated hex CSV and produces a single self-contained
//! HTML document: a Leaflet base map with one toggleable
//! choropleth-plus-bubbles layer per surveyed variable, registered under
//! one exclusive layer control.

pub mod compose;
pub mod scale;

use std::path::Path;

use emotion_map_aggregate::AggregateError;
use emotion_map_hex::HexError;

pub use compose::{CellFeature, Layer, ToggleGroup, build_layers, compose_html};
pub use scale::{BASE_RADIUS_M, COLOR_BUCKETS, ColorScale, MAX_ADDITIONAL_RADIUS_M, radius_for};

/// Default map center (Berlin).
pub const DEFAULT_CENTER: (f64, f64) = (52.5200, 13.4050);

/// Default initial zoom level.
pub const DEFAULT_ZOOM: u8 = 11;

/// Default base tile style name.
pub const DEFAULT_TILES: &str = "cartodbdarkmatter";

/// Errors from the rendering stage.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// I/O error writing the output document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading the aggregated CSV failed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Cell identifier error.
    #[error(transparent)]
    Hex(#[from] HexError),

    /// Serializing embedded layer data failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rendering configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    /// Map center as `(latitude, longitude)`.
    pub center: (f64, f64),
    /// Initial zoom level.
    pub zoom: u8,
    /// Base tile style name (e.g. "cartodbdarkmatter", "openstreetmap").
    pub tiles: String,
    /// Whether the map shows zoom controls.
    pub zoom_control: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            tiles: DEFAULT_TILES.to_string(),
            zoom_control: false,
        }
    }
}

impl MapOptions {
    /// Resolves the tile style name to a tile URL and attribution.
    ///
    /// Unknown names fall back to the default style with a warning so a
    /// typo degrades the basemap rather than aborting the run.
    #[must_use]
    pub fn tile_source(&self) -> (&'static str, &'static str) {
        const CARTO_ATTRIBUTION: &str =
            "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";
        const OSM_ATTRIBUTION: &str =
            "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

        match self.tiles.as_str() {
            "cartodbdarkmatter" => (
                "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
                CARTO_ATTRIBUTION,
            ),
            "cartodbpositron" => (
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
                CARTO_ATTRIBUTION,
            ),
            "openstreetmap" => (
                "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
                OSM_ATTRIBUTION,
            ),
            other => {
                log::warn!("Unknown tile style '{other}', falling back to {DEFAULT_TILES}");
                (
                    "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
                    CARTO_ATTRIBUTION,
                )
            }
        }
    }
}

/// Renders the aggregated CSV at `input` into a self-contained HTML map
/// at `output`.
///
/// An input with zero rows (or zero variables with data) produces a
/// valid base-only map.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the output cannot be
/// written.
pub fn render_file(input: &Path, output: &Path, options: &MapOptions) -> Result<(), RenderError> {
    let cells = emotion_map_aggregate::read_csv(input)?;
    let layers = build_layers(&cells)?;
    let html = compose_html(&layers, options)?;
    std::fs::write(output, html)?;

    log::info!(
        "Map with {} layer(s) saved to {}",
        layers.len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tile_styles_resolve() {
        for name in ["cartodbdarkmatter", "cartodbpositron", "openstreetmap"] {
            let options = MapOptions {
                tiles: name.to_string(),
                ..MapOptions::default()
            };
            let (url, attribution) = options.tile_source();
            assert!(url.starts_with("https://"));
            assert!(!attribution.is_empty());
        }
    }

    #[test]
    fn unknown_tile_style_falls_back() {
        let options = MapOptions {
            tiles: "no-such-style".to_string(),
            ..MapOptions::default()
        };
        let (url, _) = options.tile_source();
        assert!(url.contains("dark_all"));
    }

    #[test]
    fn empty_aggregate_renders_base_only_map() {
        let dir = std::env::temp_dir().join("emotion_map_render_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("agg.csv");
        let output = dir.join("map.html");
        std::fs::write(&input, "hex_id,Stress,DataPointCount\n").unwrap();

        render_file(&input, &output, &MapOptions::default()).unwrap();

        let html = std::fs::read_to_string(&output).unwrap();
        assert!(html.contains("const LAYERS = []"));

        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();
    }
}
