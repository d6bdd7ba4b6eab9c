//! Replica exchange between adjacent temperatures.
//!
//! For each adjacent pair `(t, t+1)` one walker is drawn uniformly from each
//! ensemble and their states are exchanged with probability
//!
//! ```text
//! min(1, exp((β_t - β_{t+1}) (log L_{t+1} - log L_t)))
//! ```
//!
//! Slots keep their temperature; only positions and cached log-probabilities
//! move. Pairs are processed one at a time from the hottest pair down, so
//! every test sees the states left by the previous pair and no walker slot
//! is ever touched by two exchanges at once.

use rand::Rng;
use serde::Serialize;

use crate::sampler::ensemble::Ensemble;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SwapStats {
    pub proposed: usize,
    pub accepted: usize,
}

impl SwapStats {
    pub fn acceptance_fraction(&self) -> f64 {
        if self.proposed == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.proposed as f64
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwapCoordinator;

impl SwapCoordinator {
    /// Attempt one exchange per adjacent pair; `stats[t]` tracks pair `(t, t+1)`.
    pub fn exchange<R: Rng + ?Sized>(&self, ensembles: &mut [Ensemble], stats: &mut [SwapStats], rng: &mut R) {
        for t in (0..ensembles.len().saturating_sub(1)).rev() {
            let (lower, upper) = ensembles.split_at_mut(t + 1);
            let cold = &mut lower[t];
            let hot = &mut upper[0];

            let i = rng.gen_range(0..cold.walkers.len());
            let j = rng.gen_range(0..hot.walkers.len());

            let log_alpha = swap_log_acceptance(
                cold.beta,
                hot.beta,
                cold.walkers[i].log_prob.log_likelihood,
                hot.walkers[j].log_prob.log_likelihood,
            );
            let u: f64 = rng.r#gen();
            let accepted = log_alpha >= 0.0 || u.ln() < log_alpha;

            stats[t].proposed += 1;
            if accepted {
                stats[t].accepted += 1;
                std::mem::swap(&mut cold.walkers[i], &mut hot.walkers[j]);
            }
        }
    }
}

/// `(β_a - β_b) (L_b - L_a)`, the log acceptance ratio for exchanging a state
/// with log-likelihood `L_a` at `β_a` and one with `L_b` at `β_b`.
///
/// An inadmissible state (`L = -inf`) is never moved to a colder slot than a
/// finite one; two inadmissible states are never exchanged.
pub fn swap_log_acceptance(beta_a: f64, beta_b: f64, ll_a: f64, ll_b: f64) -> f64 {
    let a_ok = ll_a.is_finite();
    let b_ok = ll_b.is_finite();
    match (a_ok, b_ok) {
        (true, true) => (beta_a - beta_b) * (ll_b - ll_a),
        (false, false) => f64::NEG_INFINITY,
        _ => {
            // Exactly one side is -inf: the sign of the ratio decides.
            let d_beta = beta_a - beta_b;
            let d_ll = if b_ok { f64::INFINITY } else { f64::NEG_INFINITY };
            if d_beta == 0.0 {
                0.0
            } else if (d_beta > 0.0) == (d_ll > 0.0) {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ensemble::Walker;
    use crate::sampler::posterior::LogProb;
    use nalgebra::DVector;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn walker(x: f64, ll: f64) -> Walker {
        Walker {
            theta: DVector::from_vec(vec![x]),
            log_prob: LogProb {
                log_prior: 0.0,
                log_likelihood: ll,
                degenerate: false,
            },
        }
    }

    #[test]
    fn swap_ratio_is_inverted_by_the_reverse_move() {
        let cases = [
            (1.0, 0.5, -10.0, -3.0),
            (1.0, 0.1, -2.5, -2.5),
            (0.5, 0.25, -100.0, -120.0),
            (1.0, 0.3, 4.0, -7.5),
        ];
        for (ba, bb, la, lb) in cases {
            let forward = swap_log_acceptance(ba, bb, la, lb);
            // After the exchange the states are (lb at ba, la at bb).
            let reverse = swap_log_acceptance(ba, bb, lb, la);
            assert!((forward + reverse).abs() < 1e-12, "{ba} {bb} {la} {lb}");
            // Labelling the pair the other way round gives the same ratio.
            let relabelled = swap_log_acceptance(bb, ba, lb, la);
            assert!((forward - relabelled).abs() < 1e-12);
            // min(1, r) * min(1, 1/r) products are consistent with detailed balance.
            let p_fwd = forward.exp().min(1.0);
            let p_rev = reverse.exp().min(1.0);
            assert!((p_fwd / p_rev - forward.exp()).abs() < 1e-9 * forward.exp().max(1.0));
        }
    }

    #[test]
    fn swap_ratio_closed_form() {
        // (1 - 0.5) * (-3 - -10) = 3.5
        assert!((swap_log_acceptance(1.0, 0.5, -10.0, -3.0) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn inadmissible_states_never_move_colder() {
        assert_eq!(swap_log_acceptance(1.0, 0.5, -1.0, f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(swap_log_acceptance(1.0, 0.5, f64::NEG_INFINITY, -1.0), f64::INFINITY);
        assert_eq!(
            swap_log_acceptance(1.0, 0.5, f64::NEG_INFINITY, f64::NEG_INFINITY),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn better_hot_state_is_always_exchanged() {
        let mut ensembles = vec![
            Ensemble { beta: 1.0, walkers: vec![walker(0.0, -50.0)] },
            Ensemble { beta: 0.5, walkers: vec![walker(1.0, -1.0)] },
        ];
        let mut stats = vec![SwapStats::default()];
        let mut rng = StdRng::seed_from_u64(0);
        SwapCoordinator.exchange(&mut ensembles, &mut stats, &mut rng);

        assert_eq!(stats[0], SwapStats { proposed: 1, accepted: 1 });
        assert_eq!(ensembles[0].walkers[0].theta[0], 1.0);
        assert_eq!(ensembles[0].beta, 1.0);
        assert_eq!(ensembles[1].walkers[0].log_prob.log_likelihood, -50.0);
    }

    #[test]
    fn single_temperature_attempts_nothing() {
        let mut ensembles = vec![Ensemble { beta: 1.0, walkers: vec![walker(0.0, -1.0)] }];
        let mut stats: Vec<SwapStats> = Vec::new();
        let mut rng = StdRng::seed_from_u64(0);
        SwapCoordinator.exchange(&mut ensembles, &mut stats, &mut rng);
        assert_eq!(ensembles[0].walkers[0].theta[0], 0.0);
    }
}
