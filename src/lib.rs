//! `syncfit` library crate.
//!
//! The binary (`syncfit`) is a thin wrapper around this library so that:
//!
//! - the sampler and models are testable without spawning processes
//! - the sampler can drive any `LogPosterior`, not only spectral fits
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod sampler;
