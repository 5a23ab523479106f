#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw survey CSV cleaning.
//!
//! Turns the raw export of the emotion survey into the cleaned point file
//! the aggregation step consumes: coalesces start/end coordinate columns,
//! maps the legacy `Scared` column to `Anxiety`, drops rows without a
//! participant or usable coordinates, and applies the configurable
//! microdegree correction to coordinates recorded in thousandths of a
//! degree.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use emotion_map_models::{PointRecord, Variable};

/// Errors from reading or writing survey CSV files.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is missing from the header row.
    #[error("Missing required column '{name}'")]
    MissingColumn {
        /// Name of the missing column.
        name: String,
    },
}

/// Correction rule for coordinates recorded in the wrong unit.
///
/// Some devices reported coordinates in thousandths of a degree (e.g.
/// latitude 52520 instead of 52.52). Any coordinate whose absolute value
/// exceeds `threshold` is divided by `divisor`. This is a heuristic from
/// the source dataset and is configurable rather than assumed to
/// generalize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateCorrection {
    /// Absolute value above which a coordinate is considered mis-scaled.
    pub threshold: f64,
    /// Divisor applied to mis-scaled coordinates.
    pub divisor: f64,
}

impl Default for CoordinateCorrection {
    fn default() -> Self {
        Self {
            threshold: 1000.0,
            divisor: 1000.0,
        }
    }
}

impl CoordinateCorrection {
    /// Applies the correction to a single coordinate value.
    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        if value.abs() > self.threshold {
            value / self.divisor
        } else {
            value
        }
    }
}

/// Options for the cleaning step.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanOptions {
    /// Microdegree correction rule, or `None` to disable it.
    pub correction: Option<CoordinateCorrection>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            correction: Some(CoordinateCorrection::default()),
        }
    }
}

/// Counters describing what the cleaning step did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    /// Data rows read from the raw file.
    pub rows_read: u64,
    /// Cleaned rows produced.
    pub rows_written: u64,
    /// Rows dropped for a missing participant id.
    pub dropped_missing_participant: u64,
    /// Rows dropped for missing, zero, or out-of-range coordinates.
    pub dropped_bad_coordinates: u64,
    /// Rows dropped for a missing or non-positive stress score.
    pub dropped_invalid_stress: u64,
    /// Coordinates rescaled by the microdegree correction.
    pub corrected_coordinates: u64,
}

/// Cleans the raw survey CSV at `input` and writes the point file to
/// `output`.
///
/// # Errors
///
/// Returns an error if either file cannot be read/written, the input is
/// not parseable CSV, or a required column is absent.
pub fn clean_file(
    input: &Path,
    output: &Path,
    options: &CleanOptions,
) -> Result<CleanStats, IngestError> {
    let file = std::fs::File::open(input)?;
    let (points, stats) = clean_reader(file, options)?;
    write_points_csv(output, &points)?;

    log::info!(
        "Cleaned {} -> {}: {} of {} rows kept",
        input.display(),
        output.display(),
        stats.rows_written,
        stats.rows_read
    );

    Ok(stats)
}

/// Cleans raw survey CSV rows from any reader.
///
/// # Errors
///
/// Returns an error if the CSV cannot be parsed or a required column is
/// absent.
pub fn clean_reader<R: Read>(
    reader: R,
    options: &CleanOptions,
) -> Result<(Vec<PointRecord>, CleanStats), IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let columns: BTreeMap<String, usize> = csv_reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_owned(), i))
        .collect();

    let participant_idx = require_column(&columns, "ParticipantId")?;
    let lat_columns = coordinate_columns(&columns, "Latitude")?;
    let lng_columns = coordinate_columns(&columns, "Longitude")?;

    let mut stats = CleanStats::default();
    let mut points = Vec::new();

    for result in csv_reader.records() {
        let record = result?;
        stats.rows_read += 1;

        if field(&record, Some(participant_idx)).is_none() {
            stats.dropped_missing_participant += 1;
            continue;
        }

        let latitude = coalesce_coordinate(&record, &lat_columns);
        let longitude = coalesce_coordinate(&record, &lng_columns);
        let (Some(mut latitude), Some(mut longitude)) = (latitude, longitude) else {
            stats.dropped_bad_coordinates += 1;
            continue;
        };

        if let Some(correction) = &options.correction {
            let corrected_lat = correction.apply(latitude);
            let corrected_lng = correction.apply(longitude);
            if (corrected_lat, corrected_lng) != (latitude, longitude) {
                stats.corrected_coordinates += 1;
            }
            latitude = corrected_lat;
            longitude = corrected_lng;
        }

        if !coordinate_in_range(latitude, longitude) {
            stats.dropped_bad_coordinates += 1;
            continue;
        }

        let mut point = PointRecord::at(latitude, longitude);
        for &variable in Variable::ALL {
            point.set_value(variable, variable_value(&record, &columns, variable));
        }

        // Stress 0 or below marks an invalid response in the source data.
        if !point.stress.is_some_and(|s| s > 0.0) {
            stats.dropped_invalid_stress += 1;
            continue;
        }

        points.push(point);
        stats.rows_written += 1;
    }

    Ok((points, stats))
}

/// Writes cleaned points as the CSV artifact the aggregator consumes.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_points_csv(path: &Path, points: &[PointRecord]) -> Result<(), IngestError> {
    let mut writer = csv::Writer::from_path(path)?;
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a cleaned point CSV back into memory.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a row does not parse.
pub fn read_points_csv(path: &Path) -> Result<Vec<PointRecord>, IngestError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut points = Vec::new();
    for result in reader.deserialize::<PointRecord>() {
        points.push(result?);
    }
    Ok(points)
}

fn require_column(columns: &BTreeMap<String, usize>, name: &str) -> Result<usize, IngestError> {
    columns
        .get(name)
        .copied()
        .ok_or_else(|| IngestError::MissingColumn {
            name: name.to_string(),
        })
}

/// Resolves the column indices a coordinate can come from, in priority
/// order: a plain `Latitude`/`Longitude` column, else the `Start`/`End`
/// pair from the raw export.
fn coordinate_columns(
    columns: &BTreeMap<String, usize>,
    axis: &str,
) -> Result<Vec<usize>, IngestError> {
    if let Some(&idx) = columns.get(axis) {
        return Ok(vec![idx]);
    }
    let start = columns.get(&format!("Start{axis}"));
    let end = columns.get(&format!("End{axis}"));
    let indices: Vec<usize> = [start, end].into_iter().flatten().copied().collect();
    if indices.is_empty() {
        return Err(IngestError::MissingColumn {
            name: axis.to_string(),
        });
    }
    Ok(indices)
}

/// First parseable, non-zero coordinate among the candidate columns.
fn coalesce_coordinate(record: &csv::StringRecord, indices: &[usize]) -> Option<f64> {
    indices
        .iter()
        .filter_map(|&idx| field(record, Some(idx)))
        .filter_map(|raw| raw.parse::<f64>().ok())
        .find(|&v| v != 0.0)
}

fn variable_value(
    record: &csv::StringRecord,
    columns: &BTreeMap<String, usize>,
    variable: Variable,
) -> Option<f64> {
    // The raw export calls the anxiety column "Scared"; fall back to
    // "Anxiety" for already-renamed files.
    let idx = if variable == Variable::Anxiety {
        columns
            .get("Scared")
            .or_else(|| columns.get("Anxiety"))
            .copied()
    } else {
        columns.get(variable.column_name()).copied()
    };
    field(record, idx).and_then(|raw| raw.parse::<f64>().ok())
}

fn field<'a>(record: &'a csv::StringRecord, idx: Option<usize>) -> Option<&'a str> {
    let raw = record.get(idx?)?.trim();
    if raw.is_empty() { None } else { Some(raw) }
}

fn coordinate_in_range(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && latitude.abs() <= 90.0
        && longitude.abs() <= 180.0
}
