//! The target density the sampler drives.
//!
//! The sampler is generic over `LogPosterior` so it can be exercised on
//! analytic targets (Gaussians in the tests) as well as on spectral fits.

/// An unnormalized log posterior split into prior and likelihood.
///
/// Parallel tempering raises only the likelihood to the power `beta`, so the
/// two parts must be evaluated separately.
pub trait LogPosterior: Sync {
    /// Dimension of the parameter vector.
    fn dim(&self) -> usize;

    /// `0` (or any finite value) inside the support, `-inf` outside.
    fn log_prior(&self, theta: &[f64]) -> f64;

    /// Log-likelihood; may be non-finite for degenerate parameters.
    fn log_likelihood(&self, theta: &[f64]) -> f64;
}

/// Cached log-probabilities of one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogProb {
    pub log_prior: f64,
    pub log_likelihood: f64,
    /// Prior admitted the point but the likelihood was not finite.
    pub degenerate: bool,
}

impl LogProb {
    pub fn rejected() -> Self {
        Self {
            log_prior: f64::NEG_INFINITY,
            log_likelihood: f64::NEG_INFINITY,
            degenerate: false,
        }
    }

    /// Both parts finite.
    pub fn is_admissible(&self) -> bool {
        self.log_prior.is_finite() && self.log_likelihood.is_finite()
    }

    /// `beta * log L + log prior`, or `-inf` if inadmissible.
    pub fn tempered(&self, beta: f64) -> f64 {
        if !self.is_admissible() {
            return f64::NEG_INFINITY;
        }
        beta * self.log_likelihood + self.log_prior
    }
}

/// Evaluate the prior first and only touch the likelihood inside the support.
pub fn evaluate<P: LogPosterior + ?Sized>(posterior: &P, theta: &[f64]) -> LogProb {
    let log_prior = posterior.log_prior(theta);
    if !log_prior.is_finite() {
        return LogProb::rejected();
    }
    let log_likelihood = posterior.log_likelihood(theta);
    if !log_likelihood.is_finite() {
        return LogProb {
            log_prior,
            log_likelihood: f64::NEG_INFINITY,
            degenerate: true,
        };
    }
    LogProb {
        log_prior,
        log_likelihood,
        degenerate: false,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Analytic targets shared by the sampler tests.

    use super::LogPosterior;
    use crate::sampler::prior::PriorBounds;

    /// Independent Gaussian with the given means and standard deviations,
    /// truncated to a wide box prior.
    pub struct Gaussian {
        pub mean: Vec<f64>,
        pub sd: Vec<f64>,
        pub prior: PriorBounds,
    }

    impl Gaussian {
        pub fn new(mean: Vec<f64>, sd: Vec<f64>, half_width: f64) -> Self {
            let bounds = mean
                .iter()
                .map(|&m| (m - half_width, m + half_width))
                .collect();
            Self {
                mean,
                sd,
                prior: PriorBounds::new(bounds).expect("valid test bounds"),
            }
        }
    }

    impl LogPosterior for Gaussian {
        fn dim(&self) -> usize {
            self.mean.len()
        }

        fn log_prior(&self, theta: &[f64]) -> f64 {
            self.prior.log_prior(theta)
        }

        fn log_likelihood(&self, theta: &[f64]) -> f64 {
            -0.5 * theta
                .iter()
                .zip(&self.mean)
                .zip(&self.sd)
                .map(|((x, m), s)| ((x - m) / s).powi(2))
                .sum::<f64>()
        }
    }
}
