//! Synchrotron spectrum shapes.
//!
//! Every shape is a pure function of `(frequency, F_v, v_a, v_m)` plus an
//! immutable set of physical constants derived once from the electron
//! power-law index `p`. The sampler never sees which shape is in use; it only
//! calls `SpectrumModel::flux`.
//!
//! Shapes (Granot & Sari style smoothly broken power laws):
//!
//! - self-absorption factor `A(x) = (x^(-s1*b1) + x^(-s1*b2))^(-1/s1)`, `x = v/v_a`
//! - peak break `B(y) = (1 + y^(s2*(b2-b3)))^(-1/s2)`, `y = v/v_m`
//! - cutoff `C(y) = exp(-y^s3)`
//!
//! `PlainBreak = F_v * A * B`, `ExponentialCutoff = F_v * A * C`, and
//! `WeightedCombination` mixes the two with fixed positive weights.

use serde::{Deserialize, Serialize};

use crate::domain::ModelSpec;
use crate::error::ConfigError;

/// Constants derived from the electron power-law index `p`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalParameters {
    pub p: f64,
    /// Fraction of energy in electrons.
    pub epsilon_e: f64,
    /// Fraction of energy in the magnetic field.
    pub epsilon_b: f64,
    /// Spectral slope below the self-absorption break.
    pub beta_1: f64,
    /// Spectral slope between the breaks.
    pub beta_2: f64,
    /// Spectral slope above the peak.
    pub beta_3: f64,
    /// Smoothness of the self-absorption break.
    pub s_1: f64,
    /// Smoothness of the peak break.
    pub s_2: f64,
    /// Sharpness of the exponential cutoff.
    pub s_3: f64,
}

impl PhysicalParameters {
    pub fn from_p(p: f64) -> Result<Self, ConfigError> {
        if !(p.is_finite() && p > 2.0) {
            return Err(ConfigError::InvalidPowerLawIndex(p));
        }
        Ok(Self::derive(p))
    }

    fn derive(p: f64) -> Self {
        Self {
            p,
            epsilon_e: 0.1 * (p - 2.0) / (p - 1.0),
            epsilon_b: 0.1,
            beta_1: 2.0,
            beta_2: 1.0 / 3.0,
            beta_3: (1.0 - p) / 2.0,
            s_1: 1.5,
            s_2: 1.76 + 0.05 * p,
            s_3: 0.8 - 0.03 * p,
        }
    }
}

impl Default for PhysicalParameters {
    fn default() -> Self {
        Self::derive(2.5)
    }
}

/// Spectral shape selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpectrumModel {
    PlainBreak,
    ExponentialCutoff,
    WeightedCombination { w1: f64, w2: f64 },
}

impl SpectrumModel {
    /// Build a weighted combination, rejecting non-positive or non-finite weights.
    pub fn weighted(w1: f64, w2: f64) -> Result<Self, ConfigError> {
        if !(w1.is_finite() && w2.is_finite() && w1 > 0.0 && w2 > 0.0) {
            return Err(ConfigError::InvalidWeights { w1, w2 });
        }
        Ok(SpectrumModel::WeightedCombination { w1, w2 })
    }

    pub fn from_spec(spec: ModelSpec, w1: f64, w2: f64) -> Result<Self, ConfigError> {
        match spec {
            ModelSpec::Plain => Ok(SpectrumModel::PlainBreak),
            ModelSpec::Cutoff => Ok(SpectrumModel::ExponentialCutoff),
            ModelSpec::Weighted => Self::weighted(w1, w2),
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(&self) -> &'static str {
        match self {
            SpectrumModel::PlainBreak => "self-absorbed broken power law",
            SpectrumModel::ExponentialCutoff => "self-absorbed power law + exponential cutoff",
            SpectrumModel::WeightedCombination { .. } => "weighted combination",
        }
    }

    /// Model flux at frequency `v`.
    ///
    /// May return `0`, `inf` or `NaN` for extreme inputs; callers treat
    /// non-finite results as a rejected proposal.
    pub fn flux(&self, phys: &PhysicalParameters, v: f64, f_v: f64, v_a: f64, v_m: f64) -> f64 {
        let low = self_absorption(phys, v / v_a);
        match *self {
            SpectrumModel::PlainBreak => f_v * low * peak_break(phys, v / v_m),
            SpectrumModel::ExponentialCutoff => f_v * low * cutoff(phys, v / v_m),
            SpectrumModel::WeightedCombination { w1, w2 } => {
                let y = v / v_m;
                let mixed = (w1 * peak_break(phys, y) + w2 * cutoff(phys, y)) / (w1 + w2);
                f_v * low * mixed
            }
        }
    }
}

fn self_absorption(phys: &PhysicalParameters, x: f64) -> f64 {
    let s = phys.s_1;
    (x.powf(-s * phys.beta_1) + x.powf(-s * phys.beta_2)).powf(-1.0 / s)
}

fn peak_break(phys: &PhysicalParameters, y: f64) -> f64 {
    let s = phys.s_2;
    (1.0 + y.powf(s * (phys.beta_2 - phys.beta_3))).powf(-1.0 / s)
}

fn cutoff(phys: &PhysicalParameters, y: f64) -> f64 {
    (-y.powf(phys.s_3)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    const F_V: f64 = 9.120108393559097; // 10^0.96
    const V_A: f64 = 1.2882495516931343e10; // 10^10.11
    const V_M: f64 = 2.570395782768864e11; // 10^11.41

    #[test]
    fn physical_parameters_follow_p() {
        let phys = PhysicalParameters::from_p(2.5).unwrap();
        assert!((phys.beta_3 + 0.75).abs() < 1e-12);
        assert!((phys.s_2 - 1.885).abs() < 1e-12);
        assert!((phys.s_3 - 0.725).abs() < 1e-12);
        assert!((phys.epsilon_e - 0.1 / 3.0).abs() < 1e-12);
        assert_eq!(phys, PhysicalParameters::default());
    }

    #[test]
    fn invalid_power_law_index_is_rejected() {
        assert!(PhysicalParameters::from_p(2.0).is_err());
        assert!(PhysicalParameters::from_p(f64::NAN).is_err());
    }

    #[test]
    fn plain_break_has_expected_asymptotic_slopes() {
        let phys = PhysicalParameters::default();
        let model = SpectrumModel::PlainBreak;

        // Far below v_a: F ~ v^2.
        let (v1, v2) = (V_A * 1e-4, V_A * 2e-4);
        let slope = (model.flux(&phys, v2, F_V, V_A, V_M) / model.flux(&phys, v1, F_V, V_A, V_M)).log2();
        assert!((slope - 2.0).abs() < 1e-3, "low-frequency slope {slope}");

        // Far above v_m: F ~ v^((1-p)/2).
        let (v1, v2) = (V_M * 1e4, V_M * 2e4);
        let slope = (model.flux(&phys, v2, F_V, V_A, V_M) / model.flux(&phys, v1, F_V, V_A, V_M)).log2();
        assert!((slope - phys.beta_3).abs() < 1e-2, "high-frequency slope {slope}");
    }

    #[test]
    fn cutoff_suppresses_high_frequencies() {
        let phys = PhysicalParameters::default();
        let v = V_M * 50.0;
        let plain = SpectrumModel::PlainBreak.flux(&phys, v, F_V, V_A, V_M);
        let cut = SpectrumModel::ExponentialCutoff.flux(&phys, v, F_V, V_A, V_M);
        assert!(cut < plain);
        assert!(cut >= 0.0);
    }

    #[test]
    fn weighted_combination_interpolates_between_shapes() {
        let phys = PhysicalParameters::default();
        let v = V_M * 2.0;
        let plain = SpectrumModel::PlainBreak.flux(&phys, v, F_V, V_A, V_M);
        let cut = SpectrumModel::ExponentialCutoff.flux(&phys, v, F_V, V_A, V_M);
        let mixed = SpectrumModel::weighted(1.0, 3.0).unwrap().flux(&phys, v, F_V, V_A, V_M);
        let expected = 0.25 * plain + 0.75 * cut;
        assert!((mixed - expected).abs() < 1e-12 * expected.abs().max(1.0));
    }

    #[test]
    fn weighted_rejects_bad_weights() {
        assert!(SpectrumModel::weighted(0.0, 1.0).is_err());
        assert!(SpectrumModel::weighted(1.0, f64::INFINITY).is_err());
        assert_eq!(
            SpectrumModel::from_spec(ModelSpec::Cutoff, 0.0, 0.0).unwrap(),
            SpectrumModel::ExponentialCutoff
        );
    }
}
