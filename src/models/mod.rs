//! Synchrotron spectrum model implementations.
//!
//! Models are implemented as small, pure functions so that the sampler can
//! stay generic over the spectral shape.

pub mod spectrum;

pub use spectrum::*;
