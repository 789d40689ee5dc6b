//! Benchmark support crate for dadac.
//!
//! Provides a seeded synthetic data source and parameter types used by the
//! Criterion benchmarks of the full clustering pipeline and of the density
//! stage.

pub mod error;
pub mod params;
pub mod source;
