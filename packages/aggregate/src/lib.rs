#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hex aggregation.
//!
//! Groups clipped survey points by their H3 cell and computes one
//! [`AggregatedCell`] per occupied cell: the mean of each answered
//! variable (rounded to one decimal place) and the member point count.
//! Grouping is keyed by cell index in a `BTreeMap`, so the output is
//! independent of input row order.
//!
//! The aggregated CSV written here (`hex_id`, one column per variable,
//! `DataPointCount`) is the persisted contract between the aggregation
//! and rendering halves of the pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use emotion_map_hex::HexError;
use emotion_map_models::{AggregatedCell, PointRecord, Variable};
use h3o::{CellIndex, Resolution};

/// Column name for the cell identifier in the aggregated CSV.
const HEX_ID_COLUMN: &str = "hex_id";

/// Column name for the per-cell sample count in the aggregated CSV.
const COUNT_COLUMN: &str = "DataPointCount";

/// Errors from aggregation and the aggregated CSV artifact.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Coordinate or cell identifier error.
    #[error(transparent)]
    Hex(#[from] HexError),

    /// A required column is missing from the aggregated CSV header.
    #[error("Missing required column '{name}'")]
    MissingColumn {
        /// Name of the missing column.
        name: String,
    },

    /// A row field that should be numeric did not parse.
    #[error("Row {row}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        /// 1-based data row number.
        row: usize,
        /// Column name.
        column: String,
        /// The offending field content.
        value: String,
    },
}

/// Per-cell running sums while grouping.
#[derive(Default)]
struct CellAccumulator {
    count: u64,
    /// Per-variable `(sum, answered_count)` over member points.
    sums: BTreeMap<Variable, (f64, u64)>,
}

/// Groups points by hex cell and computes per-cell statistics.
///
/// Every point contributes to its cell's `sample_count`; a variable's mean
/// covers only the points that answered it, and a cell where nobody
/// answered a variable omits it entirely. An empty input yields an empty
/// output.
///
/// # Errors
///
/// Returns an error if a point's coordinates cannot be resolved to a
/// cell. Clipped, validated points never trigger this.
pub fn aggregate(
    points: &[PointRecord],
    resolution: Resolution,
) -> Result<Vec<AggregatedCell>, AggregateError> {
    let mut cells: BTreeMap<CellIndex, CellAccumulator> = BTreeMap::new();

    for point in points {
        let cell = emotion_map_hex::cell_for(point.latitude, point.longitude, resolution)?;
        let accumulator = cells.entry(cell).or_default();
        accumulator.count += 1;

        for &variable in Variable::ALL {
            if let Some(value) = point.value(variable) {
                let (sum, n) = accumulator.sums.entry(variable).or_insert((0.0, 0));
                *sum += value;
                *n += 1;
            }
        }
    }

    let aggregated: Vec<AggregatedCell> = cells
        .into_iter()
        .map(|(cell, accumulator)| AggregatedCell {
            hex_id: cell.to_string(),
            means: accumulator
                .sums
                .into_iter()
                .map(|(variable, (sum, n))| {
                    #[allow(clippy::cast_precision_loss)]
                    (variable, round_one_decimal(sum / n as f64))
                })
                .collect(),
            sample_count: accumulator.count,
        })
        .collect();

    log::info!(
        "Aggregated {} points into {} hex cells at resolution {resolution}",
        points.len(),
        aggregated.len()
    );

    Ok(aggregated)
}

/// Rounds to one decimal place for stable, reproducible output.
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Writes aggregated cells as the pipeline's CSV artifact.
///
/// Column order is fixed: `hex_id`, the tracked variables in
/// [`Variable::ALL`] order, then `DataPointCount`. A variable nobody in
/// the cell answered is an empty field, never `0`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_csv(path: &Path, cells: &[AggregatedCell]) -> Result<(), AggregateError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![HEX_ID_COLUMN.to_string()];
    header.extend(Variable::ALL.iter().map(|v| v.column_name().to_string()));
    header.push(COUNT_COLUMN.to_string());
    writer.write_record(&header)?;

    for cell in cells {
        let mut row = vec![cell.hex_id.clone()];
        for &variable in Variable::ALL {
            row.push(
                cell.mean(variable)
                    .map(|mean| format!("{mean:.1}"))
                    .unwrap_or_default(),
            );
        }
        row.push(cell.sample_count.to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    log::info!("Wrote {} aggregated cells to {}", cells.len(), path.display());
    Ok(())
}

/// Reads the aggregated CSV artifact back into memory.
///
/// Cell identifiers are validated as H3 indices; a malformed id fails
/// with [`HexError::InvalidCellId`]. Variable columns absent from the
/// header are treated as absent from every cell.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the header lacks
/// `hex_id` or `DataPointCount`, a cell id is malformed, or a numeric
/// field does not parse.
pub fn read_csv(path: &Path) -> Result<Vec<AggregatedCell>, AggregateError> {
    let mut reader = csv::Reader::from_path(path)?;

    let columns: BTreeMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_owned(), i))
        .collect();

    let hex_idx = require_column(&columns, HEX_ID_COLUMN)?;
    let count_idx = require_column(&columns, COUNT_COLUMN)?;
    let variable_columns: Vec<(Variable, usize)> = Variable::ALL
        .iter()
        .filter_map(|&v| columns.get(v.column_name()).map(|&idx| (v, idx)))
        .collect();

    let mut cells = Vec::new();
    for (row_number, result) in reader.records().enumerate() {
        let record = result?;
        let row = row_number + 1;

        let raw_id = record.get(hex_idx).unwrap_or("").trim();
        let cell = emotion_map_hex::parse_cell(raw_id)?;

        let raw_count = record.get(count_idx).unwrap_or("").trim();
        let sample_count =
            raw_count
                .parse::<u64>()
                .map_err(|_| AggregateError::InvalidValue {
                    row,
                    column: COUNT_COLUMN.to_string(),
                    value: raw_count.to_string(),
                })?;

        let mut means = BTreeMap::new();
        for &(variable, idx) in &variable_columns {
            let raw = record.get(idx).unwrap_or("").trim();
            if raw.is_empty() {
                continue;
            }
            let value = raw
                .parse::<f64>()
                .map_err(|_| AggregateError::InvalidValue {
                    row,
                    column: variable.column_name().to_string(),
                    value: raw.to_string(),
                })?;
            means.insert(variable, value);
        }

        cells.push(AggregatedCell {
            hex_id: cell.to_string(),
            means,
            sample_count,
        });
    }

    Ok(cells)
}

fn require_column(columns: &BTreeMap<String, usize>, name: &str) -> Result<usize, AggregateError> {
    columns
        .get(name)
        .copied()
        .ok_or_else(|| AggregateError::MissingColumn {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESOLUTION: Resolution = emotion_map_hex::DEFAULT_RESOLUTION;

    fn point(latitude: f64, longitude: f64, stress: Option<f64>) -> PointRecord {
        let mut p = PointRecord::at(latitude, longitude);
        p.stress = stress;
        p
    }

    #[test]
    fn mean_skips_missing_values_count_does_not() {
        // Three points in the same hexagon, one without a stress answer.
        let points = vec![
            point(52.5200, 13.4050, Some(2.0)),
            point(52.5200, 13.4050, Some(4.0)),
            point(52.5200, 13.4050, None),
        ];
        let cells = aggregate(&points, RESOLUTION).unwrap();
        assert_eq!(cells.len(), 1);
        assert!((cells[0].mean(Variable::Stress).unwrap() - 3.0).abs() < f64::EPSILON);
        assert_eq!(cells[0].sample_count, 3);
    }

    #[test]
    fn all_missing_variable_is_omitted() {
        let points = vec![
            point(52.5200, 13.4050, Some(2.0)),
            point(52.5200, 13.4050, Some(4.0)),
        ];
        let cells = aggregate(&points, RESOLUTION).unwrap();
        assert_eq!(cells[0].mean(Variable::Happy), None);
    }

    #[test]
    fn output_is_order_independent() {
        let mut points = vec![
            point(52.5200, 13.4050, Some(1.0)),
            point(52.5300, 13.4200, Some(5.0)),
            point(52.5200, 13.4051, Some(3.0)),
        ];
        let forward = aggregate(&points, RESOLUTION).unwrap();
        points.reverse();
        let backward = aggregate(&points, RESOLUTION).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn aggregation_is_a_bag_union() {
        let set_a = vec![
            point(52.5200, 13.4050, Some(2.0)),
            point(52.5200, 13.4050, Some(4.0)),
        ];
        let set_b = vec![point(52.5200, 13.4050, Some(5.0))];

        let combined: Vec<PointRecord> =
            set_a.iter().chain(set_b.iter()).cloned().collect();
        let combined_cells = aggregate(&combined, RESOLUTION).unwrap();

        let cells_a = aggregate(&set_a, RESOLUTION).unwrap();
        let cells_b = aggregate(&set_b, RESOLUTION).unwrap();
        let mean_a = cells_a[0].mean(Variable::Stress).unwrap();
        let mean_b = cells_b[0].mean(Variable::Stress).unwrap();
        #[allow(clippy::cast_precision_loss)]
        let weighted = mean_a.mul_add(cells_a[0].sample_count as f64, mean_b * cells_b[0].sample_count as f64)
            / (cells_a[0].sample_count + cells_b[0].sample_count) as f64;

        let combined_mean = combined_cells[0].mean(Variable::Stress).unwrap();
        assert!((combined_mean - weighted).abs() < 0.05 + f64::EPSILON);
        assert_eq!(
            combined_cells[0].sample_count,
            cells_a[0].sample_count + cells_b[0].sample_count
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let cells = aggregate(&[], RESOLUTION).unwrap();
        assert!(cells.is_empty());
    }

    #[test]
    fn means_are_rounded_to_one_decimal() {
        let points = vec![
            point(52.5200, 13.4050, Some(1.0)),
            point(52.5200, 13.4050, Some(2.0)),
            point(52.5200, 13.4050, Some(2.0)),
        ];
        let cells = aggregate(&points, RESOLUTION).unwrap();
        // 5/3 = 1.666... -> 1.7
        assert!((cells[0].mean(Variable::Stress).unwrap() - 1.7).abs() < f64::EPSILON);
    }

    #[test]
    fn csv_artifact_round_trips() {
        let dir = std::env::temp_dir().join("emotion_map_aggregate_roundtrip");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("agg.csv");

        let points = vec![
            point(52.5200, 13.4050, Some(2.0)),
            point(52.5200, 13.4050, None),
            point(52.5300, 13.4200, Some(4.0)),
        ];
        let cells = aggregate(&points, RESOLUTION).unwrap();
        write_csv(&path, &cells).unwrap();
        let restored = read_csv(&path).unwrap();
        assert_eq!(cells, restored);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn read_rejects_malformed_cell_id() {
        let dir = std::env::temp_dir().join("emotion_map_aggregate_badid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("agg.csv");
        std::fs::write(&path, "hex_id,Stress,DataPointCount\nnot-a-cell,3.0,2\n").unwrap();

        assert!(matches!(
            read_csv(&path),
            Err(AggregateError::Hex(HexError::InvalidCellId(_)))
        ));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn read_rejects_missing_count_column() {
        let dir = std::env::temp_dir().join("emotion_map_aggregate_nocount");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("agg.csv");
        std::fs::write(&path, "hex_id,Stress\n891f1d48863ffff,3.0\n").unwrap();

        assert!(matches!(
            read_csv(&path),
            Err(AggregateError::MissingColumn { .. })
        ));

        std::fs::remove_file(&path).ok();
    }
}
