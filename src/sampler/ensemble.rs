//! Walkers and the per-temperature ensembles that own them.
//!
//! Layout: `ensembles[t].walkers[k]` is "the walker stored at temperature `t`,
//! slot `k`". Stretch moves and swaps overwrite a slot's position and cached
//! log-probabilities in place; slots never change temperature.

use nalgebra::DVector;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::ConfigError;
use crate::sampler::ladder::TemperatureLadder;
use crate::sampler::posterior::{LogPosterior, LogProb, evaluate};
use crate::sampler::prior::PriorBounds;

/// Redraws allowed per walker before giving up on a Gaussian ball.
const MAX_BALL_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Walker {
    pub theta: DVector<f64>,
    pub log_prob: LogProb,
}

impl Walker {
    pub fn new<P: LogPosterior + ?Sized>(posterior: &P, theta: DVector<f64>) -> Self {
        let log_prob = evaluate(posterior, theta.as_slice());
        Self { theta, log_prob }
    }

    pub fn tempered(&self, beta: f64) -> f64 {
        self.log_prob.tempered(beta)
    }
}

/// All walkers at one inverse temperature.
#[derive(Debug, Clone)]
pub struct Ensemble {
    pub beta: f64,
    pub walkers: Vec<Walker>,
}

impl Ensemble {
    pub fn mean_log_likelihood(&self) -> f64 {
        let n = self.walkers.len() as f64;
        self.walkers.iter().map(|w| w.log_prob.log_likelihood).sum::<f64>() / n
    }
}

#[derive(Debug, Clone)]
pub struct WalkerEnsemble {
    dim: usize,
    ensembles: Vec<Ensemble>,
}

impl WalkerEnsemble {
    /// Build from explicit positions: `positions[t][k]` for every temperature.
    ///
    /// Every position must lie inside the prior support; log-probabilities
    /// are computed here once.
    pub fn from_positions<P: LogPosterior + ?Sized>(
        posterior: &P,
        ladder: &TemperatureLadder,
        positions: Vec<Vec<Vec<f64>>>,
    ) -> Result<Self, ConfigError> {
        let dim = posterior.dim();
        if positions.len() != ladder.len() {
            return Err(ConfigError::InitialPositionCount {
                expected: ladder.len(),
                got: positions.len(),
            });
        }
        let n_walkers = positions[0].len();
        check_ensemble_size(n_walkers, dim)?;

        let mut ensembles = Vec::with_capacity(ladder.len());
        for (t, rows) in positions.into_iter().enumerate() {
            if rows.len() != n_walkers {
                return Err(ConfigError::InitialPositionCount {
                    expected: n_walkers,
                    got: rows.len(),
                });
            }
            let mut walkers = Vec::with_capacity(n_walkers);
            for (k, row) in rows.into_iter().enumerate() {
                if row.len() != dim {
                    return Err(ConfigError::InitialPositionDimension {
                        walker: k,
                        got: row.len(),
                        dim,
                    });
                }
                let walker = Walker::new(posterior, DVector::from_vec(row));
                if !walker.log_prob.log_prior.is_finite() {
                    return Err(ConfigError::InitialPositionOutsidePrior {
                        temperature: t,
                        walker: k,
                    });
                }
                walkers.push(walker);
            }
            ensembles.push(Ensemble {
                beta: ladder.beta(t),
                walkers,
            });
        }

        Ok(Self { dim, ensembles })
    }

    /// Use the same per-walker positions at every temperature.
    pub fn replicated<P: LogPosterior + ?Sized>(
        posterior: &P,
        ladder: &TemperatureLadder,
        positions: &[Vec<f64>],
    ) -> Result<Self, ConfigError> {
        let all = (0..ladder.len()).map(|_| positions.to_vec()).collect();
        Self::from_positions(posterior, ladder, all)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn n_temps(&self) -> usize {
        self.ensembles.len()
    }

    pub fn n_walkers(&self) -> usize {
        self.ensembles[0].walkers.len()
    }

    pub fn ensembles(&self) -> &[Ensemble] {
        &self.ensembles
    }

    pub(crate) fn ensembles_mut(&mut self) -> &mut [Ensemble] {
        &mut self.ensembles
    }

    pub fn walker(&self, t: usize, k: usize) -> &Walker {
        &self.ensembles[t].walkers[k]
    }

    /// Number of walkers whose cached likelihood is degenerate.
    pub fn degenerate_count(&self) -> usize {
        self.ensembles
            .iter()
            .flat_map(|e| &e.walkers)
            .filter(|w| w.log_prob.degenerate)
            .count()
    }
}

/// `W` must be even and at least `2 * D`, so each half has a nonempty complement.
pub fn check_ensemble_size(n_walkers: usize, dim: usize) -> Result<(), ConfigError> {
    if n_walkers < 2 * dim || n_walkers < 2 {
        return Err(ConfigError::EnsembleTooSmall {
            walkers: n_walkers,
            dim,
        });
    }
    if n_walkers % 2 != 0 {
        return Err(ConfigError::OddEnsemble(n_walkers));
    }
    Ok(())
}

/// Draw `n` distinct starting points `center + scales * N(0, 1)`, redrawing
/// any that fall outside `prior`.
pub fn gaussian_ball<R: Rng + ?Sized>(
    center: &[f64],
    scales: &[f64],
    n: usize,
    prior: &PriorBounds,
    rng: &mut R,
) -> Result<Vec<Vec<f64>>, ConfigError> {
    if scales.len() != center.len() {
        return Err(ConfigError::JitterDimension {
            got: scales.len(),
            dim: center.len(),
        });
    }
    prior.check_dim(center.len())?;

    let mut out = Vec::with_capacity(n);
    for walker in 0..n {
        let mut attempts = 0;
        let point = loop {
            let candidate: Vec<f64> = center
                .iter()
                .zip(scales)
                .map(|(&c, &s)| {
                    let z: f64 = StandardNormal.sample(rng);
                    c + s * z
                })
                .collect();
            if prior.contains(&candidate) {
                break candidate;
            }
            attempts += 1;
            if attempts >= MAX_BALL_ATTEMPTS {
                return Err(ConfigError::InitialPositionOutsidePrior {
                    temperature: 0,
                    walker,
                });
            }
        };
        out.push(point);
    }
    Ok(out)
}
