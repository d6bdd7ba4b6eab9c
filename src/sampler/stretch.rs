//! Affine-invariant stretch move (Goodman & Weare).
//!
//! For one temperature the ensemble is split into two halves. Each walker `k`
//! of the active half picks a partner `j` from the frozen half and proposes
//!
//! ```text
//! θ' = θ_j + z (θ_k - θ_j),   g(z) ∝ 1/sqrt(z) on [1/a, a]
//! ```
//!
//! accepted with probability `min(1, z^(D-1) exp(Δ tempered log-prob))`.
//! The halves then swap roles. Within a half, updates only read the frozen
//! half and write their own slot, so they run in parallel. Each walker draws
//! from its own RNG seeded in slot order, which keeps runs reproducible for
//! any thread count.

use std::ops::{Add, AddAssign};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::ConfigError;
use crate::sampler::ensemble::{Ensemble, Walker};
use crate::sampler::posterior::{LogPosterior, LogProb, evaluate};

/// Proposal/acceptance counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MoveStats {
    pub proposed: usize,
    pub accepted: usize,
    /// Proposals inside the prior whose likelihood was not finite.
    pub degenerate: usize,
}

impl MoveStats {
    pub fn acceptance_fraction(&self) -> f64 {
        if self.proposed == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.proposed as f64
    }
}

impl Add for MoveStats {
    type Output = MoveStats;

    fn add(self, rhs: MoveStats) -> MoveStats {
        MoveStats {
            proposed: self.proposed + rhs.proposed,
            accepted: self.accepted + rhs.accepted,
            degenerate: self.degenerate + rhs.degenerate,
        }
    }
}

impl AddAssign for MoveStats {
    fn add_assign(&mut self, rhs: MoveStats) {
        *self = *self + rhs;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchMover {
    a: f64,
}

impl StretchMover {
    pub fn new(a: f64) -> Result<Self, ConfigError> {
        if !(a.is_finite() && a > 1.0) {
            return Err(ConfigError::InvalidStretchScale(a));
        }
        Ok(Self { a })
    }

    pub fn scale(&self) -> f64 {
        self.a
    }

    /// Draw `z` from `g(z) ∝ 1/sqrt(z)` on `[1/a, a]` by inversion.
    pub fn sample_z<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.r#gen();
        let root = (self.a - 1.0) * u + 1.0;
        root * root / self.a
    }

    /// Update every walker of one temperature: first half against the second,
    /// then second against the (updated) first.
    pub fn sweep<P, R>(&self, posterior: &P, ensemble: &mut Ensemble, rng: &mut R) -> MoveStats
    where
        P: LogPosterior + ?Sized,
        R: Rng + ?Sized,
    {
        let beta = ensemble.beta;
        let half = ensemble.walkers.len() / 2;
        let mut stats = MoveStats::default();

        for pass in 0..2 {
            let (first, second) = ensemble.walkers.split_at_mut(half);
            let (active, frozen): (&mut [Walker], &[Walker]) = if pass == 0 {
                (first, second)
            } else {
                (second, first)
            };

            let seeds: Vec<u64> = (0..active.len()).map(|_| rng.r#gen()).collect();
            stats += active
                .par_iter_mut()
                .zip(seeds.par_iter())
                .map(|(walker, &seed)| {
                    let mut walker_rng = StdRng::seed_from_u64(seed);
                    self.update(posterior, beta, walker, frozen, &mut walker_rng)
                })
                .reduce(MoveStats::default, |a, b| a + b);
        }

        stats
    }

    fn update<P, R>(
        &self,
        posterior: &P,
        beta: f64,
        walker: &mut Walker,
        frozen: &[Walker],
        rng: &mut R,
    ) -> MoveStats
    where
        P: LogPosterior + ?Sized,
        R: Rng + ?Sized,
    {
        let partner = &frozen[rng.gen_range(0..frozen.len())].theta;
        let z = self.sample_z(rng);
        let proposal = partner + (&walker.theta - partner) * z;
        let log_prob = evaluate(posterior, proposal.as_slice());

        let log_alpha = stretch_log_acceptance(walker.theta.len(), z, beta, &walker.log_prob, &log_prob);
        let u: f64 = rng.r#gen();
        let accepted = log_alpha >= 0.0 || u.ln() < log_alpha;
        if accepted {
            walker.theta = proposal;
            walker.log_prob = log_prob;
        }

        MoveStats {
            proposed: 1,
            accepted: usize::from(accepted),
            degenerate: usize::from(log_prob.degenerate),
        }
    }
}

/// Log acceptance ratio of a stretch proposal:
/// `(D - 1) ln z + [beta L' + p'] - [beta L + p]`.
///
/// Exactly `-inf` when the proposal is inadmissible; `+inf` when the current
/// state is inadmissible but the proposal is not.
pub fn stretch_log_acceptance(dim: usize, z: f64, beta: f64, current: &LogProb, proposed: &LogProb) -> f64 {
    let new = proposed.tempered(beta);
    if new == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let old = current.tempered(beta);
    if old == f64::NEG_INFINITY {
        return f64::INFINITY;
    }
    (dim as f64 - 1.0) * z.ln() + new - old
}
