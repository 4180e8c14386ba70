//! Certified dip chart import.
//!
//! Charts arrive as CSV exports from the calibration agency:
//!
//! ```text
//! dip_mm,volume_liters
//! 0,0
//! 100,412
//! 200,1160
//! ...
//! ```
//!
//! Extra columns are ignored and thousands separators are accepted. The
//! parsed chart goes through the same validation as any tank record before
//! it can replace the stored one.

use std::io::Read;
use std::path::Path;

use thiserror::Error;

use fuelbook_core::validation::validate_calibration_table;
use fuelbook_core::{CalibrationPoint, CoreError};

const DIP_COLUMN: &str = "dip_mm";
const VOLUME_COLUMN: &str = "volume_liters";

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid number format in row {row}, column {column}: {value}")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Chart has no rows")]
    Empty,

    #[error(transparent)]
    Invalid(#[from] CoreError),
}

/// Loads and validates a chart file for `tank_name`.
pub fn load_chart<P: AsRef<Path>>(
    path: P,
    tank_name: &str,
) -> Result<Vec<CalibrationPoint>, ChartError> {
    let file = std::fs::File::open(path)?;
    parse_chart(file, tank_name)
}

/// Parses and validates a chart from any reader.
pub fn parse_chart<R: Read>(input: R, tank_name: &str) -> Result<Vec<CalibrationPoint>, ChartError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let dip_idx = column_index(&headers, DIP_COLUMN)?;
    let volume_idx = column_index(&headers, VOLUME_COLUMN)?;

    let mut points = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let row_num = row_idx + 2; // header is row 1

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let dip_mm = parse_f64(record.get(dip_idx).unwrap_or(""), row_num, DIP_COLUMN)?;
        let volume_liters =
            parse_f64(record.get(volume_idx).unwrap_or(""), row_num, VOLUME_COLUMN)?;
        points.push(CalibrationPoint::new(dip_mm, volume_liters));
    }

    if points.is_empty() {
        return Err(ChartError::Empty);
    }

    validate_calibration_table(tank_name, &points)?;
    Ok(points)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, ChartError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| ChartError::MissingColumn(name.to_string()))
}

fn parse_f64(s: &str, row: usize, column: &str) -> Result<f64, ChartError> {
    let cleaned = s.trim().replace(',', "");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ChartError::InvalidNumber {
            row,
            column: column.to_string(),
            value: s.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_chart() {
        let csv = "dip_mm,volume_liters,remarks\n0,0,\n100,412,\n200,\"1,160\",certified\n";
        let points = parse_chart(csv.as_bytes(), "HSD Tank 1").unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[1], CalibrationPoint::new(100.0, 412.0));
        assert_eq!(points[2].volume_liters, 1160.0);
    }

    #[test]
    fn test_column_order_and_blank_lines() {
        let csv = "Volume_Liters , DIP_MM\n0,0\n\n500,50\n";
        let points = parse_chart(csv.as_bytes(), "MS Tank 1").unwrap();
        assert_eq!(points, vec![CalibrationPoint::new(0.0, 0.0), CalibrationPoint::new(50.0, 500.0)]);
    }

    #[test]
    fn test_missing_column() {
        let csv = "dip,volume\n0,0\n";
        let err = parse_chart(csv.as_bytes(), "T").unwrap_err();
        assert!(matches!(err, ChartError::MissingColumn(ref c) if c == "dip_mm"));
    }

    #[test]
    fn test_invalid_number_reports_row() {
        let csv = "dip_mm,volume_liters\n0,0\n100,abc\n";
        let err = parse_chart(csv.as_bytes(), "T").unwrap_err();
        match err {
            ChartError::InvalidNumber { row, column, value } => {
                assert_eq!(row, 3);
                assert_eq!(column, "volume_liters");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_order_chart_rejected() {
        let csv = "dip_mm,volume_liters\n0,0\n200,1160\n100,412\n";
        let err = parse_chart(csv.as_bytes(), "HSD Tank 1").unwrap_err();
        assert!(matches!(err, ChartError::Invalid(_)));
        assert!(err.to_string().contains("HSD Tank 1"));
    }

    #[test]
    fn test_empty_chart_rejected() {
        let csv = "dip_mm,volume_liters\n";
        assert!(matches!(parse_chart(csv.as_bytes(), "T"), Err(ChartError::Empty)));
    }

    #[test]
    fn test_load_chart_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dip_mm,volume_liters").unwrap();
        writeln!(file, "0,0").unwrap();
        writeln!(file, "1000,9800").unwrap();

        let points = load_chart(file.path(), "T").unwrap();
        assert_eq!(points.len(), 2);
    }
}
