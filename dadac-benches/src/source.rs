//! Synthetic data source for benchmarking.
//!
//! Provides [`SyntheticSource`], a [`DataSource`] over seeded Gaussian blobs
//! stored as a flat row-major `Vec<f64>`.

use std::f64::consts::TAU;

use dadac_core::{DataSource, DataSourceError};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Errors that may occur during synthetic source generation.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum SyntheticError {
    /// The requested point count was zero.
    #[error("point count must be greater than zero")]
    ZeroPoints,
    /// The requested dimension count was zero.
    #[error("dimension count must be greater than zero")]
    ZeroDimensions,
    /// The requested blob count was zero.
    #[error("blob count must be greater than zero")]
    ZeroBlobs,
}

/// Configuration for synthetic blob generation.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Number of points to generate.
    pub point_count: usize,
    /// Dimensionality of each point.
    pub dimensions: usize,
    /// Number of blobs the points are spread over, round robin.
    pub blobs: u32,
    /// Distance between consecutive blob centers along the first axis.
    pub separation: f64,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

/// A [`DataSource`] of isotropic unit-variance Gaussian blobs.
///
/// # Examples
///
/// ```
/// use dadac_benches::source::{SyntheticConfig, SyntheticSource};
/// use dadac_core::DataSource;
///
/// let config = SyntheticConfig {
///     point_count: 10,
///     dimensions: 4,
///     blobs: 2,
///     separation: 8.0,
///     seed: 42,
/// };
/// let source = SyntheticSource::generate(&config).expect("valid config");
/// assert_eq!(source.len(), 10);
/// assert_eq!(source.dimensions(), Some(4));
/// ```
#[derive(Clone, Debug)]
pub struct SyntheticSource {
    data: Vec<f64>,
    point_count: usize,
    dimensions: usize,
}

impl SyntheticSource {
    /// Generates points eagerly from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyntheticError::ZeroPoints`], [`SyntheticError::ZeroDimensions`]
    /// or [`SyntheticError::ZeroBlobs`] when the matching count is zero.
    #[expect(
        clippy::float_arithmetic,
        reason = "blob placement offsets every coordinate by its center"
    )]
    pub fn generate(config: &SyntheticConfig) -> Result<Self, SyntheticError> {
        if config.point_count == 0 {
            return Err(SyntheticError::ZeroPoints);
        }
        if config.dimensions == 0 {
            return Err(SyntheticError::ZeroDimensions);
        }
        if config.blobs == 0 {
            return Err(SyntheticError::ZeroBlobs);
        }

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let mut data = Vec::with_capacity(config.point_count.saturating_mul(config.dimensions));
        let mut blob = 0_u32;
        for _ in 0..config.point_count {
            let offset = f64::from(blob) * config.separation;
            data.push(offset + standard_normal(&mut rng));
            data.extend((1..config.dimensions).map(|_| standard_normal(&mut rng)));
            blob = blob.saturating_add(1);
            if blob == config.blobs {
                blob = 0;
            }
        }

        Ok(Self {
            data,
            point_count: config.point_count,
            dimensions: config.dimensions,
        })
    }

    fn row(&self, index: usize) -> Result<&[f64], DataSourceError> {
        let start = index
            .checked_mul(self.dimensions)
            .ok_or(DataSourceError::OutOfBounds { index })?;
        let end = start
            .checked_add(self.dimensions)
            .ok_or(DataSourceError::OutOfBounds { index })?;
        self.data
            .get(start..end)
            .ok_or(DataSourceError::OutOfBounds { index })
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "Box-Muller transform requires floating-point arithmetic"
)]
fn standard_normal(rng: &mut SmallRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

impl DataSource for SyntheticSource {
    fn len(&self) -> usize {
        self.point_count
    }

    #[expect(
        clippy::unnecessary_literal_bound,
        reason = "DataSource trait constrains the return type to &str"
    )]
    fn name(&self) -> &str {
        "synthetic"
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "squared Euclidean distance requires arithmetic on f64 values"
    )]
    fn squared_distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError> {
        let left = self.row(i)?;
        let right = self.row(j)?;
        Ok(left
            .iter()
            .zip(right)
            .map(|(a, b)| {
                let diff = a - b;
                diff * diff
            })
            .sum())
    }
}
