//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the spectral parameter layout (`SPECTRAL_DIM`, `param`)
//! - validated observation sets (`ObservationSet`)
//! - CLI-facing configuration (`ModelSpec`, `FitConfig`)

pub mod types;

pub use types::*;
