//! Run exports.
//!
//! - summary JSON: configuration, physical constants, posterior summary,
//!   diagnostics, run status and a fitted spectrum grid for quick plotting
//! - samples CSV: the burned-in cold-chain samples, one row per draw

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{FitConfig, param};
use crate::error::AppError;
use crate::math::log_space;
use crate::models::{PhysicalParameters, SpectrumModel};
use crate::sampler::likelihood::ModelEvaluator;
use crate::sampler::{PosteriorSummary, RunDiagnostics, RunStatus};

/// Points in the exported spectrum grid.
const GRID_POINTS: usize = 101;

/// Model flux evaluated on a log-spaced frequency grid.
#[derive(Debug, Clone, Serialize)]
pub struct SpectrumGrid {
    pub frequency: Vec<f64>,
    pub flux: Vec<f64>,
}

impl SpectrumGrid {
    pub fn evaluate(evaluator: &ModelEvaluator, theta: &[f64], freq_min: f64, freq_max: f64, n: usize) -> Self {
        let frequency = log_space(freq_min, freq_max, n);
        let flux = frequency.iter().map(|&v| evaluator.flux_at(v, theta)).collect();
        Self { frequency, flux }
    }
}

/// Schema of the summary JSON.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryFile<'a> {
    pub tool: &'static str,
    pub created_at: DateTime<Utc>,
    pub config: &'a FitConfig,
    pub model: SpectrumModel,
    pub physical: PhysicalParameters,
    pub parameter_names: [&'static str; 4],
    pub status: RunStatus,
    /// Absent for a run cancelled inside the burn-in.
    pub summary: Option<&'a PosteriorSummary>,
    pub diagnostics: &'a RunDiagnostics,
    pub spectrum: Option<SpectrumGrid>,
}

pub fn write_summary_json(
    path: &Path,
    config: &FitConfig,
    evaluator: &ModelEvaluator,
    status: RunStatus,
    summary: Option<&PosteriorSummary>,
    diagnostics: &RunDiagnostics,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;

    let (lo, hi) = evaluator.observations().frequency_range().unwrap_or((1e9, 350e9));
    let doc = SummaryFile {
        tool: "syncfit",
        created_at: Utc::now(),
        config,
        model: evaluator.model(),
        physical: *evaluator.physical(),
        parameter_names: param::NAMES,
        status,
        summary,
        diagnostics,
        spectrum: summary.map(|s| SpectrumGrid::evaluate(evaluator, &s.mean_vector(), lo, hi, GRID_POINTS)),
    };

    serde_json::to_writer_pretty(BufWriter::new(file), &doc)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

/// Write burned-in samples as CSV with a `F_v,v_a,v_m,lnf` header.
pub fn write_samples_csv(path: &Path, samples: &[Vec<f64>]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create samples CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_samples(&mut out, samples).map_err(|e| AppError::new(2, format!("Failed to write samples CSV: {e}")))?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write samples CSV: {e}")))
}

fn write_samples<W: Write>(out: &mut W, samples: &[Vec<f64>]) -> std::io::Result<()> {
    writeln!(out, "{}", param::NAMES.join(","))?;
    for s in samples {
        let row: Vec<String> = s.iter().map(|v| format!("{v:.10e}")).collect();
        writeln!(out, "{}", row.join(","))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObservationSet;

    #[test]
    fn samples_csv_has_header_and_rows() {
        let mut buf = Vec::new();
        write_samples(&mut buf, &[vec![1.0, 2e10, 3e11, -0.5], vec![1.5, 2e10, 3e11, -0.6]]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "F_v,v_a,v_m,lnf");
        let first: Vec<f64> = lines[1].split(',').map(|v| v.parse().unwrap()).collect();
        assert_eq!(first, vec![1.0, 2e10, 3e11, -0.5]);
    }

    #[test]
    fn spectrum_grid_spans_the_band() {
        let obs = ObservationSet::from_columns(
            vec![1e9, 5e9, 2e10, 1e11],
            vec![1.0, 2.0, 3.0, 1.0],
            vec![0.1; 4],
        )
        .unwrap();
        let evaluator = ModelEvaluator::new(obs, SpectrumModel::PlainBreak, PhysicalParameters::default()).unwrap();
        let grid = SpectrumGrid::evaluate(&evaluator, &[5.0, 1e10, 1e11, -1.0], 1e9, 1e11, 11);
        assert_eq!(grid.frequency.len(), 11);
        assert_eq!(grid.frequency[0], 1e9);
        assert_eq!(grid.frequency[10], 1e11);
        assert!(grid.flux.iter().all(|f| f.is_finite() && *f > 0.0));
    }
}
