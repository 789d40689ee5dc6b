//! Shared test utilities for `dadac-core`.

use crate::{
    datasource::DataSource,
    error::DataSourceError,
    neighbourhood::{Neighbour, Neighbourhoods},
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// One-dimensional [`DataSource`] that records distance invocations.
#[derive(Clone)]
pub(crate) struct CountingSource {
    data: Vec<f64>,
    calls: Arc<AtomicUsize>,
}

impl CountingSource {
    #[must_use]
    pub(crate) fn new(data: Vec<f64>, calls: Arc<AtomicUsize>) -> Self {
        Self { data, calls }
    }

    #[must_use]
    pub(crate) fn calls(&self) -> &Arc<AtomicUsize> {
        &self.calls
    }
}

impl DataSource for CountingSource {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn name(&self) -> &str {
        "counting"
    }

    fn squared_distance(&self, left: usize, right: usize) -> Result<f64, DataSourceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let a = self
            .data
            .get(left)
            .ok_or(DataSourceError::OutOfBounds { index: left })?;
        let b = self
            .data
            .get(right)
            .ok_or(DataSourceError::OutOfBounds { index: right })?;
        Ok((a - b) * (a - b))
    }
}

/// Row-major point cloud used by the stage-level tests.
#[derive(Clone, Debug)]
pub(crate) struct PointCloud {
    points: Vec<Vec<f64>>,
}

impl PointCloud {
    #[must_use]
    pub(crate) fn new(points: Vec<Vec<f64>>) -> Self {
        Self { points }
    }
}

impl DataSource for PointCloud {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn name(&self) -> &str {
        "cloud"
    }

    fn squared_distance(&self, left: usize, right: usize) -> Result<f64, DataSourceError> {
        let a = self
            .points
            .get(left)
            .ok_or(DataSourceError::OutOfBounds { index: left })?;
        let b = self
            .points
            .get(right)
            .ok_or(DataSourceError::OutOfBounds { index: right })?;
        Ok(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum())
    }
}

/// Builds validated neighbourhoods for `points` with `k` entries per row.
pub(crate) fn neighbourhoods_for(points: Vec<Vec<f64>>, k: usize) -> Neighbourhoods {
    let cloud = PointCloud::new(points);
    Neighbourhoods::exact(&cloud, k).expect("exact neighbourhoods must build")
}

/// Builds a neighbour row from `(index, squared distance)` pairs.
pub(crate) fn row(entries: &[(usize, f64)]) -> Vec<Neighbour> {
    entries
        .iter()
        .map(|&(index, sq_distance)| Neighbour::new(index, sq_distance))
        .collect()
}
