//! Data sources other than CSV files.

pub mod synthetic;

pub use synthetic::{INITIAL_GUESS, REFERENCE_TRUTH, SyntheticSpec, generate};
