//! Inverse-temperature ladder for parallel tempering.
//!
//! `betas[0] == 1` is the cold chain (the true posterior); hotter chains
//! flatten the likelihood as `L^beta` and follow in strictly decreasing order.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math::log_space;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureLadder {
    betas: Vec<f64>,
}

impl TemperatureLadder {
    pub fn from_betas(betas: Vec<f64>) -> Result<Self, ConfigError> {
        let Some(&first) = betas.first() else {
            return Err(ConfigError::EmptyLadder);
        };
        for (index, &beta) in betas.iter().enumerate() {
            if !(beta.is_finite() && beta > 0.0) {
                return Err(ConfigError::InvalidBeta { index, beta });
            }
        }
        if first != 1.0 {
            return Err(ConfigError::LadderMissingColdChain(first));
        }
        for (index, w) in betas.windows(2).enumerate() {
            if w[1] >= w[0] {
                return Err(ConfigError::LadderNotDecreasing {
                    index: index + 1,
                    beta: w[1],
                });
            }
        }
        Ok(Self { betas })
    }

    /// `n` temperatures log-spaced over `[1, t_max]`, stored as `beta = 1/T`.
    pub fn geometric(n: usize, t_max: f64) -> Result<Self, ConfigError> {
        if n == 0 {
            return Err(ConfigError::EmptyLadder);
        }
        if n == 1 {
            return Self::from_betas(vec![1.0]);
        }
        if !(t_max.is_finite() && t_max > 1.0) {
            return Err(ConfigError::InvalidMaxTemperature(t_max));
        }
        let betas = log_space(1.0, t_max, n).into_iter().map(|t| 1.0 / t).collect();
        Self::from_betas(betas)
    }

    /// Geometric ladder whose temperature step suits a `dim`-dimensional
    /// Gaussian-like posterior: `step = 1 + 2 * sqrt(ln 4 / dim)`.
    pub fn for_dimension(n: usize, dim: usize) -> Result<Self, ConfigError> {
        let step = default_step(dim);
        let t_max = step.powi(n.saturating_sub(1) as i32);
        Self::geometric(n, t_max)
    }

    pub fn len(&self) -> usize {
        self.betas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.betas.is_empty()
    }

    pub fn betas(&self) -> &[f64] {
        &self.betas
    }

    pub fn beta(&self, t: usize) -> f64 {
        self.betas[t]
    }
}

fn default_step(dim: usize) -> f64 {
    let dim = dim.max(1) as f64;
    1.0 + 2.0 * (4f64.ln() / dim).sqrt()
}
