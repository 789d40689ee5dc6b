//! Shared fixtures for the integration suites.

use dadac_core::{DataSource, DataSourceError};

/// Row-major point cloud.
#[derive(Clone, Debug)]
pub struct Cloud {
    points: Vec<Vec<f64>>,
}

impl Cloud {
    #[must_use]
    pub fn new(points: Vec<Vec<f64>>) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn point(&self, index: usize) -> &[f64] {
        &self.points[index]
    }

    /// Same cloud with its points listed in `order`.
    #[must_use]
    pub fn reordered(&self, order: &[usize]) -> Self {
        Self::new(order.iter().map(|&i| self.points[i].clone()).collect())
    }
}

impl DataSource for Cloud {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn name(&self) -> &str {
        "cloud"
    }

    fn squared_distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError> {
        let a = self
            .points
            .get(i)
            .ok_or(DataSourceError::OutOfBounds { index: i })?;
        let b = self
            .points
            .get(j)
            .ok_or(DataSourceError::OutOfBounds { index: j })?;
        Ok(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum())
    }
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
