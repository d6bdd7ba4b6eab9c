//! Reporting utilities: residuals at the posterior mean and terminal output.

pub mod format;

pub use format::*;

use crate::error::AppError;
use crate::sampler::likelihood::ModelEvaluator;

/// One observation compared against the fitted spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    pub frequency: f64,
    pub flux: f64,
    pub error: f64,
    pub model: f64,
    pub residual: f64,
    /// `residual / error`; `None` when the error bar is zero.
    pub pull: Option<f64>,
}

/// Model flux and residuals for every observation at `theta`.
pub fn compute_residuals(evaluator: &ModelEvaluator, theta: &[f64]) -> Result<Vec<Residual>, AppError> {
    let mut out = Vec::with_capacity(evaluator.observations().len());
    for obs in evaluator.observations().iter() {
        let model = evaluator.flux_at(obs.frequency, theta);
        if !model.is_finite() {
            return Err(AppError::new(4, "Non-finite model flux at the posterior mean."));
        }
        let residual = obs.flux - model;
        out.push(Residual {
            frequency: obs.frequency,
            flux: obs.flux,
            error: obs.error,
            model,
            residual,
            pull: (obs.error > 0.0).then(|| residual / obs.error),
        });
    }
    Ok(out)
}
