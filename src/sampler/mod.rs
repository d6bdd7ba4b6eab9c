//! Parallel-tempered affine-invariant ensemble MCMC.
//!
//! Bottom-up: `prior` + `likelihood` form a `LogPosterior`; `ladder`,
//! `ensemble`, `stretch` and `swap` are the moving parts; `chain` records the
//! run; `ptmcmc` drives it; `diagnostics` summarizes it.

pub mod chain;
pub mod diagnostics;
pub mod ensemble;
pub mod ladder;
pub mod likelihood;
pub mod posterior;
pub mod prior;
pub mod ptmcmc;
pub mod stretch;
pub mod swap;

pub use chain::{BurnIn, ChainArchive, ChainRecorder};
pub use diagnostics::{PosteriorSummary, RunDiagnostics, summarize};
pub use ensemble::{Walker, WalkerEnsemble, gaussian_ball};
pub use ladder::TemperatureLadder;
pub use likelihood::{ModelEvaluator, SpectralPosterior};
pub use posterior::{LogPosterior, LogProb};
pub use prior::PriorBounds;
pub use ptmcmc::{CancelToken, InitialPositions, PtSampler, RunStats, RunStatus, SamplerConfig, SamplerState};
