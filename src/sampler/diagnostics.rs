//! Post-run summaries: posterior moments and quantiles, acceptance rates,
//! Gelman-Rubin R-hat and a thermodynamic-integration evidence estimate.

use nalgebra::{DMatrix, DVector};
use serde::{Serialize, Serializer};

use crate::error::SamplerError;
use crate::math::{mean, quantiles_mut, variance};
use crate::sampler::chain::{BurnIn, ChainRecorder};
use crate::sampler::posterior::LogPosterior;
use crate::sampler::ptmcmc::RunStats;

/// Credible-interval quantiles reported per parameter (median and ±1σ).
pub const SUMMARY_QUANTILES: [f64; 3] = [0.16, 0.5, 0.84];

/// R-hat above this is flagged as not converged.
pub const R_HAT_WARN: f64 = 1.1;

/// Stretch acceptance below this is flagged.
const LOW_ACCEPTANCE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSummary {
    pub index: usize,
    pub mean: f64,
    pub sd: f64,
    pub q16: f64,
    pub median: f64,
    pub q84: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosteriorSummary {
    pub n_samples: usize,
    pub params: Vec<ParamSummary>,
    #[serde(serialize_with = "serialize_matrix")]
    pub covariance: DMatrix<f64>,
    /// Log-likelihood evaluated at the posterior mean (`-inf` if inadmissible).
    pub log_likelihood_at_mean: f64,
}

impl PosteriorSummary {
    /// Moments and quantiles of a flat sample set (`samples[i][d]`).
    pub fn from_samples(samples: &[Vec<f64>]) -> Result<Self, SamplerError> {
        let Some(first) = samples.first() else {
            return Err(SamplerError::EmptyArchive);
        };
        let dim = first.len();
        let n = samples.len();

        let mut params = Vec::with_capacity(dim);
        for d in 0..dim {
            let mut column: Vec<f64> = samples.iter().map(|s| s[d]).collect();
            let mu = mean(&column).ok_or(SamplerError::EmptyArchive)?;
            let sd = variance(&column).unwrap_or(0.0).sqrt();
            let q = quantiles_mut(&mut column, &SUMMARY_QUANTILES).ok_or(SamplerError::EmptyArchive)?;
            params.push(ParamSummary {
                index: d,
                mean: mu,
                sd,
                q16: q[0],
                median: q[1],
                q84: q[2],
            });
        }

        let mu = DVector::from_iterator(dim, params.iter().map(|p| p.mean));
        let mut covariance = DMatrix::zeros(dim, dim);
        for s in samples {
            let centered = DVector::from_column_slice(s) - &mu;
            covariance += &centered * centered.transpose();
        }
        if n > 1 {
            covariance /= (n - 1) as f64;
        }

        Ok(Self {
            n_samples: n,
            params,
            covariance,
            log_likelihood_at_mean: f64::NEG_INFINITY,
        })
    }

    pub fn mean_vector(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.mean).collect()
    }
}

/// Summarize the burned-in cold chain and evaluate the likelihood at its mean.
pub fn summarize<P: LogPosterior + ?Sized>(
    recorder: &ChainRecorder,
    burn_in: BurnIn,
    posterior: &P,
) -> Result<PosteriorSummary, SamplerError> {
    let samples = recorder.burned_in_samples(burn_in)?;
    let mut summary = PosteriorSummary::from_samples(&samples)?;
    let at_mean = summary.mean_vector();
    if posterior.log_prior(&at_mean).is_finite() {
        let ll = posterior.log_likelihood(&at_mean);
        if ll.is_finite() {
            summary.log_likelihood_at_mean = ll;
        }
    }
    Ok(summary)
}

/// Gelman-Rubin potential scale reduction for one parameter, treating every
/// entry of `chains` as an independent chain of equal length.
///
/// `None` with fewer than two chains, fewer than two draws per chain, or zero
/// within-chain variance.
pub fn gelman_rubin(chains: &[Vec<f64>]) -> Option<f64> {
    let m = chains.len();
    let n = chains.first()?.len();
    if m < 2 || n < 2 || chains.iter().any(|c| c.len() != n) {
        return None;
    }

    let means: Vec<f64> = chains.iter().filter_map(|c| mean(c)).collect();
    let within: Vec<f64> = chains.iter().filter_map(|c| variance(c)).collect();
    let w = mean(&within)?;
    if w <= 0.0 {
        return None;
    }
    let b = n as f64 * variance(&means)?;

    let n = n as f64;
    let var_hat = (n - 1.0) / n * w + b / n;
    Some((var_hat / w).sqrt())
}

/// R-hat per parameter over the burned-in cold chain, walkers as chains.
pub fn r_hat(recorder: &ChainRecorder, burn_in: BurnIn) -> Result<Vec<Option<f64>>, SamplerError> {
    let archive = recorder.archive();
    let recorded = archive.len();
    let cutoff = burn_in.resolve(recorded);
    if cutoff >= recorded {
        return Err(SamplerError::BurnInExhausted {
            burn_in: cutoff,
            recorded,
        });
    }

    (0..archive.dim())
        .map(|d| {
            let chains = (0..archive.n_walkers())
                .map(|k| archive.trace(0, k, d).map(|trace| trace[cutoff..recorded].to_vec()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(gelman_rubin(&chains))
        })
        .collect()
}

/// Thermodynamic integration `ln Z = ∫₀¹ <ln L>_β dβ` by the trapezoid rule.
///
/// `betas` is the (decreasing) ladder and `mean_log_likelihood[t]` the
/// average log-likelihood at `betas[t]`. When the hottest β is above zero the
/// integrand is held at its hottest value down to β = 0. `None` with fewer
/// than two temperatures or a non-finite average.
pub fn thermodynamic_log_evidence(betas: &[f64], mean_log_likelihood: &[f64]) -> Option<f64> {
    if betas.len() < 2 || betas.len() != mean_log_likelihood.len() {
        return None;
    }
    if mean_log_likelihood.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut points: Vec<(f64, f64)> = betas.iter().copied().zip(mean_log_likelihood.iter().copied()).collect();
    if let Some(&(hottest, ll)) = points.last() {
        if hottest > 0.0 {
            points.push((0.0, ll));
        }
    }

    Some(
        points
            .windows(2)
            .map(|w| (w[0].0 - w[1].0) * 0.5 * (w[0].1 + w[1].1))
            .sum(),
    )
}

/// Everything a caller needs to judge a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunDiagnostics {
    pub sweeps: usize,
    pub elapsed_seconds: f64,
    pub betas: Vec<f64>,
    /// Stretch acceptance fraction per temperature.
    pub acceptance: Vec<f64>,
    /// Swap acceptance fraction per adjacent pair.
    pub swap_acceptance: Vec<f64>,
    pub degenerate_proposals: usize,
    pub r_hat: Vec<Option<f64>>,
    pub log_evidence: Option<f64>,
}

impl RunDiagnostics {
    pub fn collect(stats: &RunStats, recorder: &ChainRecorder, burn_in: BurnIn) -> Result<Self, SamplerError> {
        // A cancelled run may stop inside the burn-in; the move statistics
        // still describe it, the post-burn-in quantities do not exist.
        let r_hat = match r_hat(recorder, burn_in) {
            Err(SamplerError::BurnInExhausted { .. }) => vec![None; recorder.archive().dim()],
            other => other?,
        };

        let recorded = recorder.mean_log_likelihood(0).len();
        let cutoff = burn_in.resolve(recorded);
        let averages: Vec<f64> = (0..recorder.betas().len())
            .map(|t| {
                let series = recorder.mean_log_likelihood(t);
                mean(series.get(cutoff..).unwrap_or(&[])).unwrap_or(f64::NEG_INFINITY)
            })
            .collect();

        let diagnostics = Self {
            sweeps: stats.sweeps,
            elapsed_seconds: stats.elapsed_seconds,
            betas: recorder.betas().to_vec(),
            acceptance: stats.stretch.iter().map(|s| s.acceptance_fraction()).collect(),
            swap_acceptance: stats.swaps.iter().map(|s| s.acceptance_fraction()).collect(),
            degenerate_proposals: stats.degenerate_proposals(),
            r_hat,
            log_evidence: thermodynamic_log_evidence(recorder.betas(), &averages),
        };
        diagnostics.log_warnings();
        Ok(diagnostics)
    }

    /// Largest R-hat across parameters, if any is defined.
    pub fn max_r_hat(&self) -> Option<f64> {
        self.r_hat.iter().flatten().copied().reduce(f64::max)
    }

    fn log_warnings(&self) {
        if self.sweeps == 0 {
            return;
        }
        for (t, &acc) in self.acceptance.iter().enumerate() {
            if acc < LOW_ACCEPTANCE {
                tracing::warn!(temperature = t, beta = self.betas[t], acceptance = acc, "low stretch acceptance");
            }
        }
        for (d, r) in self.r_hat.iter().enumerate() {
            if let Some(r) = r.filter(|&r| r > R_HAT_WARN) {
                tracing::warn!(param = d, r_hat = r, "chain not converged; consider a longer burn-in");
            }
        }
        if self.degenerate_proposals > 0 {
            tracing::debug!(count = self.degenerate_proposals, "numerically degenerate proposals rejected");
        }
    }
}

fn serialize_matrix<S: Serializer>(m: &DMatrix<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    let rows: Vec<Vec<f64>> = m.row_iter().map(|r| r.iter().copied().collect()).collect();
    rows.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ensemble::WalkerEnsemble;
    use crate::sampler::ladder::TemperatureLadder;
    use crate::sampler::posterior::testing::Gaussian;

    #[test]
    fn summary_moments_quantiles_and_covariance() {
        let samples: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let s = PosteriorSummary::from_samples(&samples).unwrap();
        assert_eq!(s.n_samples, 5);
        assert_eq!(s.params[0].mean, 2.0);
        assert_eq!(s.params[1].median, 4.0);
        assert!((s.params[0].sd - 2.5f64.sqrt()).abs() < 1e-12);
        assert!((s.params[0].q16 - 0.64).abs() < 1e-12);
        // cov(x, 2x) = 2 var(x)
        assert!((s.covariance[(0, 1)] - 5.0).abs() < 1e-12);
        assert!((s.covariance[(1, 1)] - 10.0).abs() < 1e-12);
        assert_eq!(s.covariance[(0, 1)], s.covariance[(1, 0)]);
    }

    #[test]
    fn empty_samples_are_an_error() {
        assert_eq!(PosteriorSummary::from_samples(&[]), Err(SamplerError::EmptyArchive));
    }

    #[test]
    fn summarize_evaluates_likelihood_at_mean() {
        let target = Gaussian::new(vec![0.0, 0.0], vec![1.0, 1.0], 10.0);
        let ladder = TemperatureLadder::geometric(1, 1.0).unwrap();
        let positions: Vec<Vec<f64>> = vec![vec![1.0, 0.0], vec![1.0, 2.0], vec![1.0, -1.0], vec![1.0, 3.0]];
        let ens = WalkerEnsemble::replicated(&target, &ladder, &positions).unwrap();
        let mut rec = ChainRecorder::new(&ens, 2, false);
        rec.record(0, &ens).unwrap();
        rec.record(1, &ens).unwrap();

        let s = summarize(&rec, BurnIn::Count(0), &target).unwrap();
        assert_eq!(s.mean_vector(), vec![1.0, 1.0]);
        assert!((s.log_likelihood_at_mean + 1.0).abs() < 1e-12);
    }

    #[test]
    fn identical_chains_have_r_hat_near_one() {
        let chain: Vec<f64> = (0..100).map(|i| ((i * 37) % 17) as f64).collect();
        let r = gelman_rubin(&[chain.clone(), chain.clone(), chain]).unwrap();
        // B = 0, so R = sqrt((n-1)/n).
        assert!((r - (99.0f64 / 100.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn separated_chains_have_large_r_hat() {
        let a: Vec<f64> = (0..50).map(|i| (i % 5) as f64 * 0.1).collect();
        let b: Vec<f64> = a.iter().map(|x| x + 10.0).collect();
        assert!(gelman_rubin(&[a, b]).unwrap() > R_HAT_WARN);
        assert_eq!(gelman_rubin(&[vec![1.0, 2.0]]), None);
        assert_eq!(gelman_rubin(&[vec![1.0, 1.0], vec![1.0, 1.0]]), None);
    }

    #[test]
    fn evidence_of_constant_integrand() {
        let z = thermodynamic_log_evidence(&[1.0, 0.5, 0.1], &[-3.0, -3.0, -3.0]).unwrap();
        assert!((z + 3.0).abs() < 1e-12);
    }

    #[test]
    fn evidence_trapezoid_closed_form() {
        // [1, 0.5]: 0.5 * (-1 + -3) / 2 = -1; [0.5, 0] held at -3: -1.5.
        let z = thermodynamic_log_evidence(&[1.0, 0.5], &[-1.0, -3.0]).unwrap();
        assert!((z + 2.5).abs() < 1e-12);
        assert_eq!(thermodynamic_log_evidence(&[1.0], &[-1.0]), None);
        assert_eq!(thermodynamic_log_evidence(&[1.0, 0.5], &[-1.0, f64::NEG_INFINITY]), None);
    }
}
