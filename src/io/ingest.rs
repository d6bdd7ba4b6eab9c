//! CSV ingest of flux measurements.
//!
//! Format: one `frequency,flux,error` row per line, no header, lines starting
//! with `#` are comments. Frequencies are in Hz; flux and error share a unit.
//!
//! Rows that fail to parse are skipped and reported (line number + reason);
//! the surviving rows must still form a valid `ObservationSet`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::ObservationSet;
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the validated observations plus row bookkeeping.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: ObservationSet,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load observations from a CSV file on disk.
pub fn load_observations(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open data file '{}': {e}", path.display())))?;
    let data = read_observations(file)?;
    tracing::info!(
        path = %path.display(),
        rows_read = data.rows_read,
        rows_used = data.rows_used,
        skipped = data.row_errors.len(),
        "observations loaded"
    );
    Ok(data)
}

/// Parse observations from any reader (used by `load_observations` and tests).
pub fn read_observations<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut frequency = Vec::new();
    let mut flux = Vec::new();
    let mut error = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for result in reader.records() {
        rows_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line: e.position().map_or(0, |p| p.line() as usize),
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line() as usize);

        match parse_row(&record) {
            Ok((v, f, s)) => {
                frequency.push(v);
                flux.push(f);
                error.push(s);
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for err in &row_errors {
        tracing::warn!(line = err.line, reason = %err.message, "skipping row");
    }

    let rows_used = frequency.len();
    let observations = ObservationSet::from_columns(frequency, flux, error)
        .map_err(|e| AppError::new(2, format!("Invalid observations: {e}")))?;

    Ok(IngestedData {
        observations,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn parse_row(record: &StringRecord) -> Result<(f64, f64, f64), String> {
    if record.len() < 3 {
        return Err(format!("expected 3 columns (frequency,flux,error), found {}", record.len()));
    }
    let field = |i: usize, name: &str| -> Result<f64, String> {
        let raw = record.get(i).unwrap_or("");
        raw.parse::<f64>()
            .map_err(|_| format!("{name} '{raw}' is not a number"))
    };
    Ok((field(0, "frequency")?, field(1, "flux")?, field(2, "error")?))
}

/// Render observations in the ingest format (inverse of `read_observations`).
pub fn format_observations(observations: &ObservationSet, header_comment: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(comment) = header_comment {
        for line in comment.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
    for obs in observations.iter() {
        out.push_str(&format!("{:e},{},{}\n", obs.frequency, obs.flux, obs.error));
    }
    out
}
