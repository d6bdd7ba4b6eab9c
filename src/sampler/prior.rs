//! Rectangular (uniform) prior support.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-parameter open intervals `(lower, upper)`.
///
/// The log-prior is `0` strictly inside every interval and `-inf` otherwise.
/// The density is left unnormalized: only differences of log-prior matter to
/// the sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorBounds {
    bounds: Vec<(f64, f64)>,
}

impl PriorBounds {
    pub fn new(bounds: Vec<(f64, f64)>) -> Result<Self, ConfigError> {
        for (index, &(lower, upper)) in bounds.iter().enumerate() {
            if lower.is_nan() || upper.is_nan() || lower >= upper {
                return Err(ConfigError::InvalidBounds { index, lower, upper });
            }
        }
        Ok(Self { bounds })
    }

    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// `true` when every component lies strictly inside its bound.
    pub fn contains(&self, theta: &[f64]) -> bool {
        theta.len() == self.bounds.len()
            && theta
                .iter()
                .zip(&self.bounds)
                .all(|(&x, &(lo, hi))| lo < x && x < hi)
    }

    pub fn log_prior(&self, theta: &[f64]) -> f64 {
        if self.contains(theta) { 0.0 } else { f64::NEG_INFINITY }
    }

    pub fn check_dim(&self, dim: usize) -> Result<(), ConfigError> {
        if self.bounds.len() != dim {
            return Err(ConfigError::PriorDimensionMismatch {
                bounds: self.bounds.len(),
                dim,
            });
        }
        Ok(())
    }
}
