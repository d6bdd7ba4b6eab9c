//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - used in-memory during sampling
//! - exported to JSON alongside the posterior summary
//! - rebuilt from CLI flags without touching the sampler

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of free parameters in the spectral fit: `[F_v, v_a, v_m, lnf]`.
pub const SPECTRAL_DIM: usize = 4;

/// Index of each component in a spectral parameter vector.
pub mod param {
    /// Flux normalization `F_v` (flux at `v = v_a`).
    pub const FLUX: usize = 0;
    /// Self-absorption frequency `v_a`.
    pub const NU_A: usize = 1;
    /// Peak frequency `v_m`.
    pub const NU_M: usize = 2;
    /// Log of the fractional variance inflation.
    pub const LN_F: usize = 3;

    pub const NAMES: [&str; super::SPECTRAL_DIM] = ["F_v", "v_a", "v_m", "lnf"];
}

/// A single flux measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub frequency: f64,
    pub flux: f64,
    pub error: f64,
}

/// Validated frequency/flux/error columns, paired by index.
///
/// Invariants: all columns share one length, every frequency is finite and
/// strictly positive, every flux is finite, every error is finite and `>= 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationSet {
    frequency: Vec<f64>,
    flux: Vec<f64>,
    error: Vec<f64>,
}

impl ObservationSet {
    pub fn from_columns(
        frequency: Vec<f64>,
        flux: Vec<f64>,
        error: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        if frequency.len() != flux.len() || flux.len() != error.len() {
            return Err(ConfigError::ObservationLengthMismatch {
                freq: frequency.len(),
                flux: flux.len(),
                error: error.len(),
            });
        }
        for (index, &value) in frequency.iter().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidFrequency { index, value });
            }
        }
        for (index, &value) in flux.iter().enumerate() {
            if !value.is_finite() {
                return Err(ConfigError::InvalidFlux { index, value });
            }
        }
        for (index, &value) in error.iter().enumerate() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidFluxError { index, value });
            }
        }
        Ok(Self {
            frequency,
            flux,
            error,
        })
    }

    pub fn from_observations(rows: &[Observation]) -> Result<Self, ConfigError> {
        Self::from_columns(
            rows.iter().map(|r| r.frequency).collect(),
            rows.iter().map(|r| r.flux).collect(),
            rows.iter().map(|r| r.error).collect(),
        )
    }

    /// Fail unless there are at least as many observations as free parameters.
    pub fn require_at_least(&self, dim: usize) -> Result<(), ConfigError> {
        if self.len() < dim {
            return Err(ConfigError::TooFewObservations { n: self.len(), dim });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    pub fn frequency(&self) -> &[f64] {
        &self.frequency
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn error(&self) -> &[f64] {
        &self.error
    }

    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        (0..self.len()).map(move |i| Observation {
            frequency: self.frequency[i],
            flux: self.flux[i],
            error: self.error[i],
        })
    }

    /// Frequency range `(min, max)`.
    pub fn frequency_range(&self) -> Option<(f64, f64)> {
        let min = self.frequency.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.frequency.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min.is_finite() && max.is_finite() {
            Some((min, max))
        } else {
            None
        }
    }
}

/// Which spectral shape to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSpec {
    /// Self-absorbed broken power law (smoothly joined breaks at `v_a` and `v_m`).
    Plain,
    /// Self-absorbed power law with an exponential cutoff above `v_m`.
    Cutoff,
    /// Flux-weighted combination of `plain` and `cutoff`.
    Weighted,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone, Serialize)]
pub struct FitConfig {
    /// CSV input; `None` fits a synthetic spectrum instead.
    pub data_path: Option<PathBuf>,
    pub synthetic_points: usize,
    pub synthetic_seed: u64,
    pub model_spec: ModelSpec,
    /// Power-law index of the electron Lorentz-factor distribution.
    pub p: f64,
    /// Weights for `ModelSpec::Weighted`.
    pub weight_plain: f64,
    pub weight_cutoff: f64,

    pub walkers: usize,
    pub temperatures: usize,
    /// Hottest temperature of the geometric ladder; `None` derives it from the dimension.
    pub t_max: Option<f64>,
    pub iterations: usize,
    pub burn_in: usize,
    pub stretch_scale: f64,
    pub swap_interval: usize,
    pub seed: u64,
    pub record_all_temperatures: bool,
    pub max_seconds: Option<f64>,

    /// Prior bounds `(lower, upper)` for `[F_v, v_a, v_m, lnf]`.
    pub bounds: [(f64, f64); SPECTRAL_DIM],
    /// Point estimate the walkers are jittered around.
    pub initial: [f64; SPECTRAL_DIM],
    /// Relative jitter applied per component (`lnf` uses it as an absolute scale).
    pub jitter: f64,

    pub plot: bool,
    pub trace: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export_summary: Option<PathBuf>,
    pub export_samples: Option<PathBuf>,
}
