//! Chain archive and recorder.
//!
//! The archive is indexed `[temperature][walker][iteration] -> θ` and is
//! append-only: a walker's trace grows by exactly one position per sweep and
//! appends must arrive in iteration order. Burn-in trimming never mutates the
//! archive; it is a view computed on request, so trimming twice with the same
//! cutoff yields the same samples.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SamplerError};
use crate::sampler::ensemble::WalkerEnsemble;

/// How many leading iterations to discard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnIn {
    Count(usize),
    /// Fraction of the recorded iterations, in `[0, 1)`.
    Fraction(f64),
}

impl BurnIn {
    /// Validate against the configured iteration count.
    pub fn check(&self, iterations: usize) -> Result<(), ConfigError> {
        match *self {
            BurnIn::Count(n) if n >= iterations => Err(ConfigError::BurnInTooLarge {
                burn_in: n,
                iterations,
            }),
            BurnIn::Fraction(f) if !(0.0..1.0).contains(&f) => Err(ConfigError::InvalidBurnInFraction(f)),
            _ => Ok(()),
        }
    }

    /// Number of iterations to drop out of `recorded`.
    pub fn resolve(&self, recorded: usize) -> usize {
        match *self {
            BurnIn::Count(n) => n,
            BurnIn::Fraction(f) => (f.clamp(0.0, 1.0) * recorded as f64).floor() as usize,
        }
    }
}

/// Raw positions, one flat `[iteration][dim]` buffer per walker per temperature.
#[derive(Debug, Clone)]
pub struct ChainArchive {
    dim: usize,
    traces: Vec<Vec<Vec<f64>>>,
}

impl ChainArchive {
    pub fn new(n_temps: usize, n_walkers: usize, dim: usize) -> Self {
        Self {
            dim,
            traces: vec![vec![Vec::new(); n_walkers]; n_temps],
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn n_temps(&self) -> usize {
        self.traces.len()
    }

    pub fn n_walkers(&self) -> usize {
        self.traces.first().map_or(0, Vec::len)
    }

    /// Iterations recorded for one walker; 0 for a slot that is not archived.
    pub fn walker_len(&self, temperature: usize, walker: usize) -> usize {
        self.traces
            .get(temperature)
            .and_then(|walkers| walkers.get(walker))
            .map_or(0, |trace| trace.len() / self.dim)
    }

    /// Iterations recorded (identical for every walker after a full sweep).
    pub fn len(&self) -> usize {
        self.traces
            .iter()
            .flatten()
            .map(|t| t.len() / self.dim)
            .min()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn append(
        &mut self,
        temperature: usize,
        iteration: usize,
        walker: usize,
        theta: &[f64],
    ) -> Result<(), SamplerError> {
        let dim = self.dim;
        let trace = self.slot_mut(temperature, walker)?;
        let expected = trace.len() / dim;
        if iteration != expected {
            return Err(SamplerError::OutOfOrderAppend {
                walker,
                iteration,
                expected,
            });
        }
        trace.extend_from_slice(theta);
        Ok(())
    }

    /// Position of one walker at one iteration, if recorded.
    pub fn get(&self, temperature: usize, walker: usize, iteration: usize) -> Option<&[f64]> {
        let start = iteration * self.dim;
        self.traces
            .get(temperature)?
            .get(walker)?
            .get(start..start + self.dim)
    }

    /// All positions at `iteration >= from_iteration`, flattened across walkers.
    pub fn flatten(&self, temperature: usize, from_iteration: usize) -> Result<Vec<Vec<f64>>, SamplerError> {
        let mut out = Vec::new();
        for trace in self.walkers(temperature)? {
            let start = (from_iteration * self.dim).min(trace.len());
            out.extend(trace[start..].chunks_exact(self.dim).map(<[f64]>::to_vec));
        }
        Ok(out)
    }

    /// One parameter's trajectory for one walker.
    pub fn trace(&self, temperature: usize, walker: usize, param: usize) -> Result<Vec<f64>, SamplerError> {
        self.check_param(param)?;
        let walkers = self.walkers(temperature)?;
        let trace = walkers.get(walker).ok_or(SamplerError::WalkerOutOfRange {
            walker,
            walkers: walkers.len(),
        })?;
        Ok(trace.chunks_exact(self.dim).map(|row| row[param]).collect())
    }

    pub(crate) fn check_param(&self, param: usize) -> Result<(), SamplerError> {
        if param < self.dim {
            Ok(())
        } else {
            Err(SamplerError::ParameterOutOfRange { param, dim: self.dim })
        }
    }

    fn walkers(&self, temperature: usize) -> Result<&[Vec<f64>], SamplerError> {
        self.traces
            .get(temperature)
            .map(Vec::as_slice)
            .ok_or(SamplerError::TemperatureNotRecorded {
                temperature,
                recorded: self.traces.len(),
            })
    }

    fn slot_mut(&mut self, temperature: usize, walker: usize) -> Result<&mut Vec<f64>, SamplerError> {
        let recorded = self.traces.len();
        let walkers = self
            .traces
            .get_mut(temperature)
            .ok_or(SamplerError::TemperatureNotRecorded { temperature, recorded })?;
        let n_walkers = walkers.len();
        walkers.get_mut(walker).ok_or(SamplerError::WalkerOutOfRange {
            walker,
            walkers: n_walkers,
        })
    }
}

/// Accumulates sweeps and answers posterior queries after the run.
#[derive(Debug, Clone)]
pub struct ChainRecorder {
    archive: ChainArchive,
    /// `mean_log_likelihood[t][iteration]`, kept for every temperature.
    mean_log_likelihood: Vec<Vec<f64>>,
    betas: Vec<f64>,
    requested_iterations: usize,
    complete: bool,
}

impl ChainRecorder {
    /// Record the cold chain, or every temperature when `all_temperatures`.
    pub fn new(ensemble: &WalkerEnsemble, requested_iterations: usize, all_temperatures: bool) -> Self {
        let n_recorded = if all_temperatures { ensemble.n_temps() } else { 1 };
        Self {
            archive: ChainArchive::new(n_recorded, ensemble.n_walkers(), ensemble.dim()),
            mean_log_likelihood: vec![Vec::with_capacity(requested_iterations); ensemble.n_temps()],
            betas: ensemble.ensembles().iter().map(|e| e.beta).collect(),
            requested_iterations,
            complete: false,
        }
    }

    /// Append the current state of every recorded temperature as `iteration`.
    pub fn record(&mut self, iteration: usize, ensemble: &WalkerEnsemble) -> Result<(), SamplerError> {
        for (t, ens) in ensemble.ensembles().iter().enumerate() {
            if t < self.archive.n_temps() {
                for (k, walker) in ens.walkers.iter().enumerate() {
                    self.archive.append(t, iteration, k, walker.theta.as_slice())?;
                }
            }
            self.mean_log_likelihood[t].push(ens.mean_log_likelihood());
        }
        Ok(())
    }

    pub(crate) fn finalize(&mut self) {
        self.complete = self.archive.len() == self.requested_iterations;
    }

    pub fn archive(&self) -> &ChainArchive {
        &self.archive
    }

    pub fn betas(&self) -> &[f64] {
        &self.betas
    }

    pub fn recorded_iterations(&self) -> usize {
        self.archive.len()
    }

    pub fn requested_iterations(&self) -> usize {
        self.requested_iterations
    }

    /// `false` for a cancelled run (partial chain, diagnostics only).
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Per-sweep mean log-likelihood at one ladder rung (every rung is kept,
    /// archived or not); empty past the end of the ladder.
    pub fn mean_log_likelihood(&self, temperature: usize) -> &[f64] {
        self.mean_log_likelihood.get(temperature).map_or(&[], Vec::as_slice)
    }

    /// Cold-chain samples after dropping the first `burn_in` iterations.
    ///
    /// Fails (rather than returning an empty set) when the cutoff discards
    /// everything recorded.
    pub fn burned_in_samples(&self, burn_in: BurnIn) -> Result<Vec<Vec<f64>>, SamplerError> {
        self.burned_in_samples_at(0, burn_in)
    }

    /// Samples of one archived temperature; only the cold chain (index 0)
    /// is archived unless every temperature was requested.
    pub fn burned_in_samples_at(&self, temperature: usize, burn_in: BurnIn) -> Result<Vec<Vec<f64>>, SamplerError> {
        if temperature >= self.archive.n_temps() {
            return Err(SamplerError::TemperatureNotRecorded {
                temperature,
                recorded: self.archive.n_temps(),
            });
        }
        let recorded = self.archive.len();
        let cutoff = burn_in.resolve(recorded);
        if cutoff >= recorded {
            return Err(SamplerError::BurnInExhausted {
                burn_in: cutoff,
                recorded,
            });
        }
        self.archive.flatten(temperature, cutoff)
    }

    /// Posterior mean of one parameter over the burned-in cold chain.
    pub fn posterior_mean(&self, param: usize, burn_in: BurnIn) -> Result<f64, SamplerError> {
        self.archive.check_param(param)?;
        let samples = self.burned_in_samples(burn_in)?;
        let n = samples.len() as f64;
        Ok(samples.iter().map(|s| s[param]).sum::<f64>() / n)
    }

    /// Cold-chain trajectory of one parameter for one walker.
    pub fn walker_trace(&self, walker: usize, param: usize) -> Result<Vec<f64>, SamplerError> {
        self.archive.trace(0, walker, param)
    }
}
