//! Map layer assembly and HTML serialization.
//!
//! Builds one toggleable [`Layer`] per variable with data (filled hex
//! polygons plus sample-count bubbles) and embeds all layers, the base
//! tiles, and an exclusive layer control into a single interactive HTML
//! document. Exclusivity is modeled as metadata on each layer; the
//! emitted control just honors it.

use emotion_map_models::{AggregatedCell, Variable};
use serde::Serialize;

use crate::scale::{ColorScale, radius_for};
use crate::{MapOptions, RenderError};

/// Name of the shared toggle group all variable layers belong to.
pub const TOGGLE_GROUP_NAME: &str = "Variables";

/// Toggle-group metadata attached to each layer.
///
/// `exclusive` means activating this layer deactivates its siblings in
/// the same group (single-selection, not independent checkboxes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleGroup {
    pub name: String,
    pub exclusive: bool,
}

/// One renderable feature pair for a hex cell within a layer.
#[derive(Debug, Clone, Serialize)]
pub struct CellFeature {
    /// H3 cell identifier.
    pub hex_id: String,
    /// The layer variable's mean in this cell, if anyone answered it.
    pub value: Option<f64>,
    /// Fill color for the hex polygon.
    pub fill_color: String,
    /// Cell boundary as a `GeoJSON` polygon.
    pub boundary: geojson::Geometry,
    /// Cell centroid as `[latitude, longitude]`.
    pub centroid: [f64; 2],
    /// Bubble radius in meters, scaled by sample count.
    pub radius_m: f64,
    /// Human-readable tooltip shared by polygon and bubble.
    pub tooltip: String,
}

/// A named, toggleable visual group for one variable.
#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub name: String,
    pub toggle_group: ToggleGroup,
    pub cells: Vec<CellFeature>,
}

/// Builds one layer per variable that has at least one aggregated value.
///
/// Variables missing across every cell are skipped entirely: no layer,
/// no color scale. Cells that lack a value for a layer's variable still
/// appear in that layer, drawn in the scale's no-data color, so the
/// hexagon footprint stays consistent across layers.
///
/// # Errors
///
/// Returns [`RenderError`] if a cell identifier cannot be parsed back
/// into an H3 index.
pub fn build_layers(cells: &[AggregatedCell]) -> Result<Vec<Layer>, RenderError> {
    let min_count = cells.iter().map(|c| c.sample_count).min().unwrap_or(0);
    let max_count = cells.iter().map(|c| c.sample_count).max().unwrap_or(0);

    let mut layers = Vec::new();
    for &variable in Variable::ALL {
        if !cells.iter().any(|cell| cell.mean(variable).is_some()) {
            log::info!(
                "Skipping layer for {}: no data in any cell",
                variable.column_name()
            );
            continue;
        }

        let scale = ColorScale::for_variable(variable);
        let mut features = Vec::with_capacity(cells.len());
        for cell in cells {
            features.push(cell_feature(cell, variable, scale, min_count, max_count)?);
        }

        layers.push(Layer {
            name: variable.label().to_string(),
            toggle_group: ToggleGroup {
                name: TOGGLE_GROUP_NAME.to_string(),
                exclusive: true,
            },
            cells: features,
        });
    }

    log::info!("Built {} map layers from {} cells", layers.len(), cells.len());
    Ok(layers)
}

/// Builds the polygon + bubble feature pair for one cell.
///
/// Takes the variable and value explicitly so styling never depends on
/// surrounding loop state.
fn cell_feature(
    cell: &AggregatedCell,
    variable: Variable,
    scale: ColorScale,
    min_count: u64,
    max_count: u64,
) -> Result<CellFeature, RenderError> {
    let index = emotion_map_hex::parse_cell(&cell.hex_id)?;
    let boundary = emotion_map_hex::cell_boundary(index);
    let (lat, lng) = emotion_map_hex::cell_centroid(index);

    let value = cell.mean(variable);
    let fill_color = value.map_or_else(|| scale.no_data_color(), |v| scale.color_for(v));

    Ok(CellFeature {
        hex_id: cell.hex_id.clone(),
        value,
        fill_color: fill_color.to_string(),
        boundary: geojson::Geometry::new(geojson::Value::from(&boundary)),
        centroid: [lat, lng],
        radius_m: radius_for(cell.sample_count, min_count, max_count),
        tooltip: format!("Participants: {}", cell.sample_count),
    })
}

/// Map document template. Tokens are substituted by [`compose_html`].
const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Emotion Map</title>
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css"
    crossorigin="anonymous" referrerpolicy="no-referrer" />
  <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js"
    crossorigin="anonymous" referrerpolicy="no-referrer"></script>
  <style>
    html, body { margin: 0; height: 100%; }
    #map { height: 100%; }
  </style>
</head>
<body>
  <div id="map"></div>
  <script>
    const OPTIONS = __OPTIONS__;
    const LAYERS = __LAYERS__;

    const map = L.map('map', { zoomControl: OPTIONS.zoom_control })
      .setView(OPTIONS.center, OPTIONS.zoom);
    L.tileLayer(OPTIONS.tile_url, {
      attribution: OPTIONS.tile_attribution,
      maxZoom: 19,
    }).addTo(map);

    const groups = {};
    for (const layer of LAYERS) {
      const group = L.layerGroup();
      for (const cell of layer.cells) {
        L.geoJSON(cell.boundary, {
          style: { stroke: false, fillColor: cell.fill_color, fillOpacity: 0.6 },
        }).bindTooltip(cell.tooltip).addTo(group);
        L.circle(cell.centroid, {
          radius: cell.radius_m,
          stroke: false,
          fillColor: 'white',
          fillOpacity: 0.6,
        }).bindTooltip(cell.tooltip).addTo(group);
      }
      groups[layer.name] = group;
    }

    if (LAYERS.length > 0) {
      const exclusive = LAYERS.every((layer) => layer.toggle_group.exclusive);
      if (exclusive) {
        // Registering the groups as base layers gives radio-button
        // (single-selection) semantics; tiles stay on the map directly.
        L.control.layers(groups, null, { collapsed: false, position: 'topright' }).addTo(map);
        groups[LAYERS[0].name].addTo(map);
      } else {
        L.control.layers(null, groups, { collapsed: false, position: 'topright' }).addTo(map);
        for (const layer of LAYERS) groups[layer.name].addTo(map);
      }
    }
  </script>
</body>
</html>
"#;

/// Per-document options serialized into the template.
#[derive(Serialize)]
struct DocumentOptions<'a> {
    center: [f64; 2],
    zoom: u8,
    zoom_control: bool,
    tile_url: &'a str,
    tile_attribution: &'a str,
}

/// Serializes layers and options into the self-contained HTML document.
///
/// Zero layers is valid and produces a base-only map.
///
/// # Errors
///
/// Returns an error if the embedded JSON cannot be serialized.
pub fn compose_html(layers: &[Layer], options: &MapOptions) -> Result<String, RenderError> {
    let (tile_url, tile_attribution) = options.tile_source();

    let document_options = DocumentOptions {
        center: [options.center.0, options.center.1],
        zoom: options.zoom,
        zoom_control: options.zoom_control,
        tile_url,
        tile_attribution,
    };

    Ok(TEMPLATE
        .replace("__OPTIONS__", &serde_json::to_string(&document_options)?)
        .replace("__LAYERS__", &serde_json::to_string(layers)?))
}
