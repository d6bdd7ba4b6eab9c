//! Synthetic flux observations drawn from a known spectrum.
//!
//! Frequencies are log-spaced over the requested band, the true flux comes
//! from the chosen `SpectrumModel`, and each point gets Gaussian noise with a
//! standard deviation proportional to its true flux. The result is the same
//! `ObservationSet` the CSV ingest produces, so a synthetic run exercises the
//! whole pipeline.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

use crate::domain::{ObservationSet, SPECTRAL_DIM, param};
use crate::error::ConfigError;
use crate::math::{check_log_range, log_space};
use crate::models::{PhysicalParameters, SpectrumModel};

/// Reference source: `F_v = 10^0.96`, `v_a = 10^10.11 Hz`, `v_m = 10^11.41 Hz`,
/// `lnf = ln 0.1`.
pub const REFERENCE_TRUTH: [f64; SPECTRAL_DIM] = [
    9.120_108_393_559_097,
    1.288_249_551_693_132e10,
    2.570_395_782_768_865e11,
    -2.302_585_092_994_045_7,
];

/// Default starting point of the walkers: the reference spectrum with an
/// overestimated `lnf`, so the sampler has to find the noise level itself.
pub const INITIAL_GUESS: [f64; SPECTRAL_DIM] = [
    REFERENCE_TRUTH[param::FLUX],
    REFERENCE_TRUTH[param::NU_A],
    REFERENCE_TRUTH[param::NU_M],
    -0.7,
];

#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    /// True `[F_v, v_a, v_m, lnf]`; `lnf` is not used for the noise.
    pub truth: [f64; SPECTRAL_DIM],
    pub model: SpectrumModel,
    pub phys: PhysicalParameters,
    pub n_points: usize,
    pub freq_min: f64,
    pub freq_max: f64,
    /// Noise standard deviation as a fraction of the true flux.
    pub relative_error: f64,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            truth: REFERENCE_TRUTH,
            model: SpectrumModel::PlainBreak,
            phys: PhysicalParameters::default(),
            n_points: 20,
            freq_min: 1e9,
            freq_max: 350e9,
            relative_error: 0.1,
            seed: 0,
        }
    }
}

pub fn generate(spec: &SyntheticSpec) -> Result<ObservationSet, ConfigError> {
    check_log_range(spec.freq_min, spec.freq_max)?;
    if spec.n_points < SPECTRAL_DIM {
        return Err(ConfigError::TooFewObservations {
            n: spec.n_points,
            dim: SPECTRAL_DIM,
        });
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);

    let frequency = log_space(spec.freq_min, spec.freq_max, spec.n_points);
    let mut flux = Vec::with_capacity(spec.n_points);
    let mut error = Vec::with_capacity(spec.n_points);

    for &v in &frequency {
        let truth = spec.model.flux(
            &spec.phys,
            v,
            spec.truth[param::FLUX],
            spec.truth[param::NU_A],
            spec.truth[param::NU_M],
        );
        let sigma = (spec.relative_error * truth).abs();
        let z: f64 = StandardNormal.sample(&mut rng);
        flux.push(truth + sigma * z);
        error.push(sigma);
    }

    ObservationSet::from_columns(frequency, flux, error)
}
