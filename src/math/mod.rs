//! Mathematical utilities: log-spaced grids and descriptive statistics.

pub mod grid;
pub mod stats;

pub use grid::*;
pub use stats::*;
