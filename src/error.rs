//! Error types.
//!
//! - `ConfigError`: malformed run configuration, detected before any sweep.
//! - `SamplerError`: misuse of the sampler state machine or the chain archive.
//! - `AppError`: what the binary reports (message + process exit code).
//!
//! Inadmissible or numerically degenerate parameter vectors are *not* errors;
//! they surface as `f64::NEG_INFINITY` log-probabilities and are rejected.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("ensemble size {walkers} is below twice the parameter dimension {dim}")]
    EnsembleTooSmall { walkers: usize, dim: usize },
    #[error("ensemble size {0} must be even")]
    OddEnsemble(usize),
    #[error("temperature ladder is empty")]
    EmptyLadder,
    #[error("temperature ladder must start at the cold chain (beta = 1), got {0}")]
    LadderMissingColdChain(f64),
    #[error("temperature ladder must be strictly decreasing (beta[{index}] = {beta})")]
    LadderNotDecreasing { index: usize, beta: f64 },
    #[error("inverse temperature beta[{index}] = {beta} must be finite and > 0")]
    InvalidBeta { index: usize, beta: f64 },
    #[error("maximum temperature {0} must be finite and >= 1")]
    InvalidMaxTemperature(f64),
    #[error("observation columns differ in length: freq={freq}, flux={flux}, error={error}")]
    ObservationLengthMismatch { freq: usize, flux: usize, error: usize },
    #[error("{n} observations cannot constrain {dim} parameters")]
    TooFewObservations { n: usize, dim: usize },
    #[error("observation {index}: frequency {value} must be finite and > 0")]
    InvalidFrequency { index: usize, value: f64 },
    #[error("observation {index}: flux {value} must be finite")]
    InvalidFlux { index: usize, value: f64 },
    #[error("observation {index}: flux error {value} must be finite and >= 0")]
    InvalidFluxError { index: usize, value: f64 },
    #[error("prior bound {index} is invalid: lower={lower}, upper={upper}")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },
    #[error("prior has {bounds} bounds but the parameter vector has {dim} components")]
    PriorDimensionMismatch { bounds: usize, dim: usize },
    #[error("iteration count must be > 0")]
    ZeroIterations,
    #[error("burn-in {burn_in} must be below the iteration count {iterations}")]
    BurnInTooLarge { burn_in: usize, iterations: usize },
    #[error("burn-in fraction {0} must lie in [0, 1)")]
    InvalidBurnInFraction(f64),
    #[error("stretch scale a = {0} must be finite and > 1")]
    InvalidStretchScale(f64),
    #[error("swap interval must be > 0")]
    ZeroSwapInterval,
    #[error("expected {expected} initial positions, got {got}")]
    InitialPositionCount { expected: usize, got: usize },
    #[error("initial position {walker} has {got} components, expected {dim}")]
    InitialPositionDimension { walker: usize, got: usize, dim: usize },
    #[error("initial position (temperature {temperature}, walker {walker}) lies outside the prior support")]
    InitialPositionOutsidePrior { temperature: usize, walker: usize },
    #[error("jitter scales have {got} components, expected {dim}")]
    JitterDimension { got: usize, dim: usize },
    #[error("combination weights must be finite and > 0 (w1={w1}, w2={w2})")]
    InvalidWeights { w1: f64, w2: f64 },
    #[error("power-law index p = {0} must be finite and > 2")]
    InvalidPowerLawIndex(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("sampler is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("burn-in {burn_in} discards all {recorded} recorded iterations")]
    BurnInExhausted { burn_in: usize, recorded: usize },
    #[error("append for walker {walker} at iteration {iteration}, expected iteration {expected}")]
    OutOfOrderAppend {
        walker: usize,
        iteration: usize,
        expected: usize,
    },
    #[error("chain archive has no samples")]
    EmptyArchive,
    #[error("temperature {temperature} is not archived ({recorded} recorded; enable recording of all temperatures)")]
    TemperatureNotRecorded { temperature: usize, recorded: usize },
    #[error("walker {walker} out of range ({walkers} walkers)")]
    WalkerOutOfRange { walker: usize, walkers: usize },
    #[error("parameter {param} out of range (dimension {dim})")]
    ParameterOutOfRange { param: usize, dim: usize },
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(2, format!("Invalid configuration: {err}"))
    }
}

impl From<SamplerError> for AppError {
    fn from(err: SamplerError) -> Self {
        match err {
            SamplerError::Config(e) => e.into(),
            other => AppError::new(4, format!("Sampler failure: {other}")),
        }
    }
}
