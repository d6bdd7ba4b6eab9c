//! Shared "fit pipeline" logic used by the CLI and the integration tests.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! observations -> model + prior -> ladder + initial ball -> PT-MCMC run
//! -> posterior summary + diagnostics -> residuals
//!
//! Front-ends then only deal with presentation.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::synthetic::{self, SyntheticSpec};
use crate::domain::{FitConfig, ObservationSet, SPECTRAL_DIM, param};
use crate::error::{AppError, SamplerError};
use crate::io::ingest::load_observations;
use crate::models::{PhysicalParameters, SpectrumModel};
use crate::report::{Residual, compute_residuals};
use crate::sampler::ensemble::check_ensemble_size;
use crate::sampler::{
    BurnIn, CancelToken, InitialPositions, ModelEvaluator, PosteriorSummary, PriorBounds, PtSampler, RunDiagnostics,
    RunStatus, SamplerConfig, SpectralPosterior, TemperatureLadder, gaussian_ball, summarize,
};

/// Walkers whose traces are kept for the trace plot.
const TRACE_WALKERS: usize = 8;

/// All computed outputs of a single `syncfit fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    /// Where the observations came from (path or synthetic description).
    pub source: String,
    pub posterior: SpectralPosterior,
    pub status: RunStatus,
    /// `None` when a cancelled run stopped before the burn-in ended.
    pub summary: Option<PosteriorSummary>,
    pub diagnostics: RunDiagnostics,
    /// Empty without a summary.
    pub residuals: Vec<Residual>,
    /// Burned-in cold-chain samples (empty without a summary).
    pub samples: Vec<Vec<f64>>,
    /// `traces[param][walker]` for the first few cold-chain walkers.
    pub traces: Vec<Vec<Vec<f64>>>,
}

impl FitRun {
    pub fn evaluator(&self) -> &ModelEvaluator {
        self.posterior.evaluator()
    }

    /// Error to report when the run stopped with nothing left after burn-in;
    /// its traces and move statistics are still valid for diagnosis.
    pub fn partial_chain_error(&self) -> Option<AppError> {
        match (self.status, &self.summary) {
            (RunStatus::Cancelled { completed, requested }, None) => Some(AppError::new(
                4,
                format!("Run stopped after {completed}/{requested} sweeps; nothing left after burn-in."),
            )),
            _ => None,
        }
    }
}

/// Execute the full fitting pipeline.
pub fn run_fit(config: &FitConfig) -> Result<FitRun, AppError> {
    run_fit_with_cancel(config, &CancelToken::new())
}

/// Execute the pipeline; `cancel` stops sampling at the next sweep boundary.
pub fn run_fit_with_cancel(config: &FitConfig, cancel: &CancelToken) -> Result<FitRun, AppError> {
    // 1) Model constants and shape.
    let phys = PhysicalParameters::from_p(config.p)?;
    let model = SpectrumModel::from_spec(config.model_spec, config.weight_plain, config.weight_cutoff)?;

    // 2) Observations.
    let (observations, source) = load_or_simulate(config, model, phys)?;

    // 3) Posterior.
    let evaluator = ModelEvaluator::new(observations, model, phys)?;
    let prior = PriorBounds::new(config.bounds.to_vec())?;
    let posterior = SpectralPosterior::new(evaluator, prior)?;

    // 4) Sampler setup, validated before any sweep.
    let ladder = match config.t_max {
        Some(t_max) => TemperatureLadder::geometric(config.temperatures, t_max)?,
        None => TemperatureLadder::for_dimension(config.temperatures, SPECTRAL_DIM)?,
    };
    check_ensemble_size(config.walkers, SPECTRAL_DIM)?;
    let sampler_config = sampler_config(config)?;
    sampler_config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let scales = jitter_scales(&config.initial, config.jitter);
    let ball = gaussian_ball(&config.initial, &scales, config.walkers, posterior.prior(), &mut rng)?;

    tracing::info!(
        source = %source,
        model = model.display_name(),
        betas = ?ladder.betas(),
        "starting fit"
    );

    // 5) Run and summarize while the sampler borrows the posterior.
    let burn_in = BurnIn::Count(config.burn_in);
    let (status, summary, diagnostics, samples, traces) = {
        let mut sampler = PtSampler::new(&posterior, ladder, sampler_config, InitialPositions::Replicated(ball))?;
        let status = sampler.run_until(cancel)?;
        let recorder = sampler.recorder()?;

        let (summary, samples) = match summarize(recorder, burn_in, &posterior) {
            Ok(summary) => (Some(summary), recorder.burned_in_samples(burn_in)?),
            Err(SamplerError::BurnInExhausted { burn_in, recorded }) if !recorder.is_complete() => {
                tracing::warn!(burn_in, recorded, "run stopped inside the burn-in; no posterior summary");
                (None, Vec::new())
            }
            Err(e) => return Err(e.into()),
        };
        let diagnostics = RunDiagnostics::collect(sampler.stats(), recorder, burn_in)?;

        let n_traces = recorder.archive().n_walkers().min(TRACE_WALKERS);
        let traces = (0..SPECTRAL_DIM)
            .map(|d| (0..n_traces).map(|k| recorder.walker_trace(k, d)).collect())
            .collect::<Result<Vec<Vec<Vec<f64>>>, _>>()?;
        (status, summary, diagnostics, samples, traces)
    };

    // 6) Residuals at the posterior mean.
    let residuals = match &summary {
        Some(summary) => compute_residuals(posterior.evaluator(), &summary.mean_vector())?,
        None => Vec::new(),
    };

    Ok(FitRun {
        source,
        posterior,
        status,
        summary,
        diagnostics,
        residuals,
        samples,
        traces,
    })
}

fn load_or_simulate(
    config: &FitConfig,
    model: SpectrumModel,
    phys: PhysicalParameters,
) -> Result<(ObservationSet, String), AppError> {
    match &config.data_path {
        Some(path) => {
            let ingest = load_observations(path)?;
            let source = if ingest.row_errors.is_empty() {
                path.display().to_string()
            } else {
                format!("{} ({} rows skipped)", path.display(), ingest.row_errors.len())
            };
            Ok((ingest.observations, source))
        }
        None => {
            let spec = SyntheticSpec {
                model,
                phys,
                n_points: config.synthetic_points,
                seed: config.synthetic_seed,
                ..SyntheticSpec::default()
            };
            let obs = synthetic::generate(&spec)?;
            let source = format!("synthetic (n={}, seed={})", spec.n_points, spec.seed);
            Ok((obs, source))
        }
    }
}

fn sampler_config(config: &FitConfig) -> Result<SamplerConfig, AppError> {
    let time_budget = match config.max_seconds {
        Some(s) if s.is_finite() && s >= 0.0 => Some(Duration::from_secs_f64(s)),
        Some(s) => return Err(AppError::new(2, format!("Invalid --max-seconds {s}: must be finite and >= 0."))),
        None => None,
    };
    Ok(SamplerConfig {
        iterations: config.iterations,
        burn_in: BurnIn::Count(config.burn_in),
        stretch_scale: config.stretch_scale,
        swap_interval: config.swap_interval,
        seed: config.seed,
        record_all_temperatures: config.record_all_temperatures,
        time_budget,
    })
}

/// Relative jitter for the positive scale parameters, absolute for `lnf`.
fn jitter_scales(initial: &[f64; SPECTRAL_DIM], jitter: f64) -> [f64; SPECTRAL_DIM] {
    let mut scales = [0.0; SPECTRAL_DIM];
    for (d, s) in scales.iter_mut().enumerate() {
        *s = if d == param::LN_F {
            jitter
        } else {
            (jitter * initial[d]).abs()
        };
    }
    scales
}
