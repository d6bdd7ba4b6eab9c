//! Parallel-tempered ensemble sampler.
//!
//! State machine:
//!
//! ```text
//! Initialized --run--> Running --(all sweeps | cancelled)--> Completed
//! ```
//!
//! One sweep = a stretch pass at every temperature (in parallel), then, every
//! `swap_interval` sweeps, one exchange attempt per adjacent temperature pair,
//! then one archive append. Cancellation and the time budget are only checked
//! between sweeps, so the archive always holds whole sweeps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{ConfigError, SamplerError};
use crate::sampler::chain::{BurnIn, ChainRecorder};
use crate::sampler::ensemble::WalkerEnsemble;
use crate::sampler::ladder::TemperatureLadder;
use crate::sampler::posterior::LogPosterior;
use crate::sampler::stretch::{MoveStats, StretchMover};
use crate::sampler::swap::{SwapCoordinator, SwapStats};

/// Immutable run settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplerConfig {
    pub iterations: usize,
    pub burn_in: BurnIn,
    /// Stretch scale `a` (conventionally 2).
    pub stretch_scale: f64,
    /// Attempt swaps every this many sweeps.
    pub swap_interval: usize,
    pub seed: u64,
    /// Archive every temperature instead of only the cold chain.
    pub record_all_temperatures: bool,
    /// Wall-clock budget; the run stops at the first sweep boundary past it.
    pub time_budget: Option<Duration>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            burn_in: BurnIn::Count(500),
            stretch_scale: 2.0,
            swap_interval: 1,
            seed: 0,
            record_all_temperatures: false,
            time_budget: None,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        self.burn_in.check(self.iterations)?;
        if self.swap_interval == 0 {
            return Err(ConfigError::ZeroSwapInterval);
        }
        StretchMover::new(self.stretch_scale)?;
        Ok(())
    }
}

/// Starting positions for every walker.
#[derive(Debug, Clone)]
pub enum InitialPositions {
    /// `positions[k]`, reused at every temperature.
    Replicated(Vec<Vec<f64>>),
    /// `positions[t][k]`.
    PerTemperature(Vec<Vec<Vec<f64>>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SamplerState {
    Initialized,
    Running,
    Completed,
}

impl SamplerState {
    pub fn as_str(self) -> &'static str {
        match self {
            SamplerState::Initialized => "initialized",
            SamplerState::Running => "running",
            SamplerState::Completed => "completed",
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    /// Stopped at a sweep boundary; the archive is partial.
    Cancelled { completed: usize, requested: usize },
}

/// Shared flag for stopping a run between sweeps (e.g. from another thread).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub sweeps: usize,
    /// Stretch counters per temperature.
    pub stretch: Vec<MoveStats>,
    /// Swap counters per adjacent pair `(t, t+1)`.
    pub swaps: Vec<SwapStats>,
    pub elapsed_seconds: f64,
}

impl RunStats {
    pub fn degenerate_proposals(&self) -> usize {
        self.stretch.iter().map(|s| s.degenerate).sum()
    }
}

pub struct PtSampler<'a, P: LogPosterior + ?Sized> {
    posterior: &'a P,
    config: SamplerConfig,
    ladder: TemperatureLadder,
    ensemble: WalkerEnsemble,
    mover: StretchMover,
    recorder: ChainRecorder,
    rng: StdRng,
    state: SamplerState,
    stats: RunStats,
    status: Option<RunStatus>,
}

impl<'a, P: LogPosterior + ?Sized> PtSampler<'a, P> {
    /// Validate everything and pre-compute every walker's log-probabilities.
    pub fn new(
        posterior: &'a P,
        ladder: TemperatureLadder,
        config: SamplerConfig,
        initial: InitialPositions,
    ) -> Result<Self, SamplerError> {
        config.validate()?;
        let mover = StretchMover::new(config.stretch_scale)?;

        let ensemble = match initial {
            InitialPositions::Replicated(positions) => WalkerEnsemble::replicated(posterior, &ladder, &positions)?,
            InitialPositions::PerTemperature(positions) => {
                WalkerEnsemble::from_positions(posterior, &ladder, positions)?
            }
        };

        let recorder = ChainRecorder::new(&ensemble, config.iterations, config.record_all_temperatures);
        let stats = RunStats {
            stretch: vec![MoveStats::default(); ladder.len()],
            swaps: vec![SwapStats::default(); ladder.len().saturating_sub(1)],
            ..RunStats::default()
        };

        tracing::info!(
            dim = ensemble.dim(),
            walkers = ensemble.n_walkers(),
            temperatures = ladder.len(),
            iterations = config.iterations,
            initial_degenerate = ensemble.degenerate_count(),
            "sampler initialized"
        );

        Ok(Self {
            posterior,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            ladder,
            ensemble,
            mover,
            recorder,
            state: SamplerState::Initialized,
            stats,
            status: None,
        })
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn ladder(&self) -> &TemperatureLadder {
        &self.ladder
    }

    pub fn ensemble(&self) -> &WalkerEnsemble {
        &self.ensemble
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn status(&self) -> Option<RunStatus> {
        self.status
    }

    /// Run every configured sweep.
    pub fn run(&mut self) -> Result<RunStatus, SamplerError> {
        self.run_until(&CancelToken::new())
    }

    /// Run until all sweeps are done or `cancel` fires (checked between sweeps).
    pub fn run_until(&mut self, cancel: &CancelToken) -> Result<RunStatus, SamplerError> {
        self.expect_state(SamplerState::Initialized)?;
        self.state = SamplerState::Running;

        let started = Instant::now();
        let requested = self.config.iterations;
        let progress_every = (requested / 10).max(1);
        let mut completed = 0;

        for iteration in 0..requested {
            if cancel.is_cancelled() || self.budget_exhausted(started) {
                break;
            }
            self.sweep(iteration)?;
            completed += 1;

            if completed % progress_every == 0 {
                tracing::debug!(
                    sweep = completed,
                    of = requested,
                    cold_acceptance = self.stats.stretch[0].acceptance_fraction(),
                    degenerate = self.stats.degenerate_proposals(),
                    "sampling progress"
                );
            }
        }

        self.recorder.finalize();
        self.stats.elapsed_seconds = started.elapsed().as_secs_f64();
        self.state = SamplerState::Completed;

        let status = if completed == requested {
            RunStatus::Completed
        } else {
            tracing::warn!(completed, requested, "run cancelled; chain is partial");
            RunStatus::Cancelled { completed, requested }
        };
        self.status = Some(status);

        tracing::info!(
            sweeps = completed,
            elapsed_s = self.stats.elapsed_seconds,
            cold_acceptance = self.stats.stretch[0].acceptance_fraction(),
            degenerate = self.stats.degenerate_proposals(),
            "sampler finished"
        );
        Ok(status)
    }

    /// The archive; only available once the run has finished.
    pub fn recorder(&self) -> Result<&ChainRecorder, SamplerError> {
        self.expect_state(SamplerState::Completed)?;
        Ok(&self.recorder)
    }

    fn sweep(&mut self, iteration: usize) -> Result<(), SamplerError> {
        let posterior = self.posterior;
        let mover = self.mover;
        let seeds: Vec<u64> = (0..self.ensemble.n_temps()).map(|_| self.rng.r#gen()).collect();

        let per_temp: Vec<MoveStats> = self
            .ensemble
            .ensembles_mut()
            .par_iter_mut()
            .zip(seeds.par_iter())
            .map(|(ens, &seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                mover.sweep(posterior, ens, &mut rng)
            })
            .collect();
        for (acc, s) in self.stats.stretch.iter_mut().zip(per_temp) {
            *acc += s;
        }

        if (iteration + 1) % self.config.swap_interval == 0 {
            SwapCoordinator.exchange(self.ensemble.ensembles_mut(), &mut self.stats.swaps, &mut self.rng);
        }

        self.recorder.record(iteration, &self.ensemble)?;
        self.stats.sweeps += 1;
        Ok(())
    }

    fn budget_exhausted(&self, started: Instant) -> bool {
        self.config
            .time_budget
            .is_some_and(|budget| started.elapsed() >= budget)
    }

    fn expect_state(&self, expected: SamplerState) -> Result<(), SamplerError> {
        if self.state != expected {
            return Err(SamplerError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{mean, variance};
    use crate::sampler::posterior::testing::Gaussian;

    fn start(n: usize, center: &[f64]) -> InitialPositions {
        InitialPositions::Replicated(
            (0..n)
                .map(|k| {
                    center
                        .iter()
                        .enumerate()
                        .map(|(d, c)| c + 0.01 * ((k * (d + 3)) % 7) as f64 - 0.03)
                        .collect()
                })
                .collect(),
        )
    }

    fn column(samples: &[Vec<f64>], d: usize) -> Vec<f64> {
        samples.iter().map(|s| s[d]).collect()
    }

    #[test]
    fn cold_chain_recovers_gaussian_moments() {
        let target = Gaussian::new(vec![1.0, -2.0], vec![1.0, 0.5], 30.0);
        let ladder = TemperatureLadder::geometric(1, 1.0).unwrap();
        let config = SamplerConfig {
            iterations: 2000,
            burn_in: BurnIn::Count(500),
            seed: 42,
            ..SamplerConfig::default()
        };
        let mut sampler = PtSampler::new(&target, ladder, config, start(16, &[0.0, 0.0])).unwrap();
        assert_eq!(sampler.run().unwrap(), RunStatus::Completed);

        let rec = sampler.recorder().unwrap();
        let samples = rec.burned_in_samples(BurnIn::Count(500)).unwrap();
        assert_eq!(samples.len(), 1500 * 16);

        for (d, (&m, &s)) in target.mean.iter().zip(&target.sd).enumerate() {
            let col = column(&samples, d);
            let mu = mean(&col).unwrap();
            let var = variance(&col).unwrap();
            assert!((mu - m).abs() < 0.15 * s, "dim {d}: mean {mu} vs {m}");
            assert!((var / (s * s) - 1.0).abs() < 0.2, "dim {d}: var {var} vs {}", s * s);
        }
    }

    #[test]
    fn hot_chains_sample_the_tempered_target() {
        let target = Gaussian::new(vec![0.0, 0.0], vec![1.0, 1.0], 50.0);
        let ladder = TemperatureLadder::from_betas(vec![1.0, 0.25]).unwrap();
        let config = SamplerConfig {
            iterations: 3000,
            burn_in: BurnIn::Count(500),
            seed: 9,
            record_all_temperatures: true,
            ..SamplerConfig::default()
        };
        let mut sampler = PtSampler::new(&target, ladder, config, start(16, &[0.0, 0.0])).unwrap();
        sampler.run().unwrap();
        let rec = sampler.recorder().unwrap();

        // L^beta of a unit Gaussian is a Gaussian with variance 1/beta.
        for (t, expected_var) in [(0, 1.0), (1, 4.0)] {
            let samples = rec.burned_in_samples_at(t, BurnIn::Count(500)).unwrap();
            for d in 0..2 {
                let var = variance(&column(&samples, d)).unwrap();
                assert!(
                    (var / expected_var - 1.0).abs() < 0.25,
                    "temperature {t} dim {d}: var {var} vs {expected_var}"
                );
            }
        }

        let stats = sampler.stats();
        assert_eq!(stats.swaps.len(), 1);
        assert_eq!(stats.swaps[0].proposed, 3000);
        assert!(stats.swaps[0].accepted > 0);
    }

    #[test]
    fn same_seed_same_chain() {
        let target = Gaussian::new(vec![0.0, 0.0], vec![1.0, 1.0], 10.0);
        let run = || {
            let ladder = TemperatureLadder::geometric(3, 4.0).unwrap();
            let config = SamplerConfig {
                iterations: 50,
                burn_in: BurnIn::Count(10),
                seed: 5,
                ..SamplerConfig::default()
            };
            let mut sampler = PtSampler::new(&target, ladder, config, start(8, &[0.0, 0.0])).unwrap();
            sampler.run().unwrap();
            sampler.recorder().unwrap().burned_in_samples(BurnIn::Count(10)).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn small_ensemble_fails_before_any_sweep() {
        let target = Gaussian::new(vec![0.0; 4], vec![1.0; 4], 10.0);
        let ladder = TemperatureLadder::geometric(2, 2.0).unwrap();
        let err = PtSampler::new(&target, ladder, SamplerConfig::default(), start(6, &[0.0; 4]))
            .err()
            .unwrap();
        assert_eq!(err, SamplerError::Config(ConfigError::EnsembleTooSmall { walkers: 6, dim: 4 }));
    }

    #[test]
    fn invalid_run_settings_fail_fast() {
        let bad = [
            SamplerConfig { iterations: 0, ..SamplerConfig::default() },
            SamplerConfig { burn_in: BurnIn::Count(1000), ..SamplerConfig::default() },
            SamplerConfig { swap_interval: 0, ..SamplerConfig::default() },
            SamplerConfig { stretch_scale: 0.5, ..SamplerConfig::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn state_machine_guards_accessors_and_reruns() {
        let target = Gaussian::new(vec![0.0, 0.0], vec![1.0, 1.0], 10.0);
        let ladder = TemperatureLadder::geometric(2, 2.0).unwrap();
        let config = SamplerConfig {
            iterations: 5,
            burn_in: BurnIn::Count(1),
            swap_interval: 2,
            ..SamplerConfig::default()
        };
        let mut sampler = PtSampler::new(&target, ladder, config, start(4, &[0.0, 0.0])).unwrap();
        assert_eq!(sampler.state(), SamplerState::Initialized);
        assert!(matches!(sampler.recorder(), Err(SamplerError::InvalidState { .. })));

        sampler.run().unwrap();
        assert_eq!(sampler.state(), SamplerState::Completed);
        assert_eq!(sampler.recorder().unwrap().recorded_iterations(), 5);
        assert!(sampler.recorder().unwrap().is_complete());
        // Swaps at sweeps 2 and 4 only.
        assert_eq!(sampler.stats().swaps[0].proposed, 2);
        assert_eq!(sampler.stats().stretch[1].proposed, 5 * 4);

        assert!(matches!(sampler.run(), Err(SamplerError::InvalidState { .. })));
    }

    #[test]
    fn cancelled_run_is_flagged_partial() {
        let target = Gaussian::new(vec![0.0, 0.0], vec![1.0, 1.0], 10.0);
        let ladder = TemperatureLadder::geometric(1, 1.0).unwrap();
        let config = SamplerConfig {
            iterations: 100,
            burn_in: BurnIn::Count(10),
            ..SamplerConfig::default()
        };
        let mut sampler = PtSampler::new(&target, ladder, config, start(4, &[0.0, 0.0])).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let status = sampler.run_until(&cancel).unwrap();
        assert_eq!(status, RunStatus::Cancelled { completed: 0, requested: 100 });
        let rec = sampler.recorder().unwrap();
        assert!(!rec.is_complete());
        assert!(rec.burned_in_samples(BurnIn::Count(0)).is_err());
    }

    #[test]
    fn zero_time_budget_stops_at_first_boundary() {
        let target = Gaussian::new(vec![0.0, 0.0], vec![1.0, 1.0], 10.0);
        let ladder = TemperatureLadder::geometric(1, 1.0).unwrap();
        let config = SamplerConfig {
            iterations: 10,
            burn_in: BurnIn::Count(0),
            time_budget: Some(Duration::ZERO),
            ..SamplerConfig::default()
        };
        let mut sampler = PtSampler::new(&target, ladder, config, start(4, &[0.0, 0.0])).unwrap();
        assert!(matches!(sampler.run().unwrap(), RunStatus::Cancelled { completed: 0, .. }));
    }
}
