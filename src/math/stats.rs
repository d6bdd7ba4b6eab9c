//! Small descriptive statistics on `f64` slices.
//!
//! NaN handling: sorting treats incomparable values as equal, matching the
//! rest of the crate. Callers only feed finite samples in practice.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Unbiased sample variance; `None` with fewer than two values.
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(ss / (values.len() as f64 - 1.0))
}

/// Linear-interpolated quantile of already sorted data, `q` in `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() as f64 - 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Sort in place and return the requested quantiles.
pub fn quantiles_mut(values: &mut [f64], qs: &[f64]) -> Option<Vec<f64>> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    qs.iter().map(|&q| quantile_sorted(values, q)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_variance_basic() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&v), Some(2.5));
        assert!((variance(&v).unwrap() - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(mean(&[]), None);
        assert_eq!(variance(&[1.0]), None);
    }

    #[test]
    fn quantiles_interpolate() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        let q = quantiles_mut(&mut v, &[0.0, 0.5, 1.0, 0.25]).unwrap();
        assert_eq!(q, vec![1.0, 3.0, 5.0, 2.0]);
        assert_eq!(v, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
