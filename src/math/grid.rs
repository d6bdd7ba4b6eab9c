//! Log-spaced grids.
//!
//! Used for temperature ladders, synthetic observation frequencies and plot
//! axes. All of these span several decades, so linear spacing is useless.

use crate::error::ConfigError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
///
/// `steps == 1` yields `[min]`.
pub fn log_space(min: f64, max: f64, steps: usize) -> Vec<f64> {
    if steps == 0 {
        return Vec::new();
    }
    if steps == 1 {
        return vec![min];
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    // Pin the endpoints so callers can rely on exact values (e.g. T = 1).
    out[0] = min;
    out[steps - 1] = max;
    out
}

/// Validate a `(min, max)` range for `log_space`.
pub fn check_log_range(min: f64, max: f64) -> Result<(), ConfigError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max >= min) {
        return Err(ConfigError::InvalidBounds {
            index: 0,
            lower: min,
            upper: max,
        });
    }
    Ok(())
}
