#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the emotion map pipeline.
//!
//! Three stages, runnable individually or end to end: `prepare` cleans
//! the raw survey export, `aggregate` clips points to the city boundary
//! and bins them into H3 hexagons, and `render` turns the aggregated CSV
//! into a self-contained interactive map.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use emotion_map_ingest::{CleanOptions, CoordinateCorrection};
use emotion_map_render::MapOptions;
use emotion_map_spatial::ReferenceBoundary;

#[derive(Parser)]
#[command(name = "emotion_map", about = "Emotion survey hex map pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw survey CSV into the point file
    Prepare {
        /// Raw survey CSV export
        #[arg(long)]
        input: PathBuf,
        /// Cleaned point CSV to write
        #[arg(long)]
        output: PathBuf,
        /// Disable the microdegree coordinate correction
        #[arg(long)]
        no_microdegree_fix: bool,
    },
    /// Clip points to the city boundary and aggregate by hex cell
    Aggregate {
        /// Cleaned point CSV
        #[arg(long)]
        input: PathBuf,
        /// City boundary GeoJSON
        #[arg(long)]
        boundary: PathBuf,
        /// Aggregated hex CSV to write
        #[arg(long)]
        output: PathBuf,
        /// H3 resolution (0-15)
        #[arg(long, default_value_t = 9)]
        resolution: u8,
    },
    /// Render the aggregated hex CSV as an interactive map
    Render {
        /// Aggregated hex CSV
        #[arg(long)]
        input: PathBuf,
        /// Output HTML document
        #[arg(long)]
        output: PathBuf,
        /// Map center as "lat,lon"
        #[arg(long)]
        center: Option<String>,
        /// Initial zoom level
        #[arg(long)]
        zoom: Option<u8>,
        /// Base tile style name
        #[arg(long)]
        tiles: Option<String>,
        /// Show zoom controls
        #[arg(long)]
        zoom_control: bool,
    },
    /// Run the full pipeline: prepare, aggregate, render
    Run {
        /// Raw survey CSV export
        #[arg(long)]
        input: PathBuf,
        /// City boundary GeoJSON
        #[arg(long)]
        boundary: PathBuf,
        /// Directory for intermediate and final artifacts
        #[arg(long, default_value = "data/generated")]
        out_dir: PathBuf,
        /// H3 resolution (0-15)
        #[arg(long, default_value_t = 9)]
        resolution: u8,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare {
            input,
            output,
            no_microdegree_fix,
        } => prepare(&input, &output, no_microdegree_fix)?,
        Commands::Aggregate {
            input,
            boundary,
            output,
            resolution,
        } => aggregate(&input, &boundary, &output, resolution)?,
        Commands::Render {
            input,
            output,
            center,
            zoom,
            tiles,
            zoom_control,
        } => {
            let options = map_options(center.as_deref(), zoom, tiles, zoom_control)?;
            emotion_map_render::render_file(&input, &output, &options)?;
        }
        Commands::Run {
            input,
            boundary,
            out_dir,
            resolution,
        } => {
            std::fs::create_dir_all(&out_dir)?;
            let cleaned = out_dir.join("cleaned_points.csv");
            let aggregated = out_dir.join("emotions_by_hex_id.csv");
            let map = out_dir.join("hex_circle_map.html");

            prepare(&input, &cleaned, false)?;
            aggregate(&cleaned, &boundary, &aggregated, resolution)?;
            emotion_map_render::render_file(&aggregated, &map, &MapOptions::default())?;
        }
    }

    Ok(())
}

/// Runs the cleaning stage.
fn prepare(
    input: &Path,
    output: &Path,
    no_microdegree_fix: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = CleanOptions {
        correction: if no_microdegree_fix {
            None
        } else {
            Some(CoordinateCorrection::default())
        },
    };
    let stats = emotion_map_ingest::clean_file(input, output, &options)?;
    log::info!(
        "Dropped {} rows without participant, {} with bad coordinates, {} with invalid stress; corrected {} coordinates",
        stats.dropped_missing_participant,
        stats.dropped_bad_coordinates,
        stats.dropped_invalid_stress,
        stats.corrected_coordinates
    );
    Ok(())
}

/// Runs the clip + hex aggregation stage.
fn aggregate(
    input: &Path,
    boundary_path: &Path,
    output: &Path,
    resolution: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolution = emotion_map_hex::resolution_from(resolution)?;
    let points = emotion_map_ingest::read_points_csv(input)?;
    let boundary = ReferenceBoundary::from_geojson_file(boundary_path)?;
    let clipped = emotion_map_spatial::clip(&points, &boundary);
    let cells = emotion_map_aggregate::aggregate(&clipped, resolution)?;
    emotion_map_aggregate::write_csv(output, &cells)?;
    Ok(())
}

/// Builds [`MapOptions`] from the render flags.
fn map_options(
    center: Option<&str>,
    zoom: Option<u8>,
    tiles: Option<String>,
    zoom_control: bool,
) -> Result<MapOptions, Box<dyn std::error::Error>> {
    let mut options = MapOptions {
        zoom_control,
        ..MapOptions::default()
    };
    if let Some(raw) = center {
        options.center = parse_center(raw)?;
    }
    if let Some(zoom) = zoom {
        options.zoom = zoom;
    }
    if let Some(tiles) = tiles {
        options.tiles = tiles;
    }
    Ok(options)
}

/// Parses a "lat,lon" center argument.
fn parse_center(raw: &str) -> Result<(f64, f64), Box<dyn std::error::Error>> {
    let Some((lat, lon)) = raw.split_once(',') else {
        return Err(format!("Invalid --center '{raw}': expected \"lat,lon\"").into());
    };
    let latitude: f64 = lat.trim().parse()?;
    let longitude: f64 = lon.trim().parse()?;
    Ok((latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_center_argument() {
        let (lat, lon) = parse_center("52.52, 13.405").unwrap();
        assert!((lat - 52.52).abs() < f64::EPSILON);
        assert!((lon - 13.405).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_malformed_center() {
        assert!(parse_center("52.52").is_err());
        assert!(parse_center("north,south").is_err());
    }

    #[test]
    fn render_flags_override_defaults() {
        let options = map_options(Some("40.0,-74.0"), Some(9), Some("openstreetmap".into()), true)
            .unwrap();
        assert!((options.center.0 - 40.0).abs() < f64::EPSILON);
        assert_eq!(options.zoom, 9);
        assert_eq!(options.tiles, "openstreetmap");
        assert!(options.zoom_control);
    }
}
