//! Benchmark setup error type.
//!
//! Aggregates the errors that may arise while preparing benchmark data so
//! that setup functions can propagate failures with `?` instead of using
//! `.expect()`.

use crate::source::SyntheticError;
use dadac_core::DadacError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic data generation failed.
    #[error("synthetic source generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// Configuration, neighbour search or clustering failed.
    #[error("clustering failed: {0}")]
    Core(#[from] DadacError),
}
