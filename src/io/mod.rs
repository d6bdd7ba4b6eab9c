//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - summary JSON and samples CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
