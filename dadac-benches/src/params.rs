//! Benchmark parameter types.
//!
//! Groups related benchmark parameters into structs so that benchmark
//! helper functions stay under the Clippy `too-many-arguments` threshold.

use std::fmt;

/// Parameters for a full pipeline benchmark run.
#[derive(Clone, Debug)]
pub struct PipelineBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
    /// Neighbours per point.
    pub neighbours: usize,
}

impl fmt::Display for PipelineBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},k={}", self.point_count, self.neighbours)
    }
}

/// Parameters for a density-stage benchmark run.
#[derive(Clone, Debug)]
pub struct DensityBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
    /// Neighbours per point.
    pub neighbours: usize,
    /// Intrinsic dimension handed to the estimator.
    pub dimension: f64,
}

impl fmt::Display for DensityBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={},k={},d={}",
            self.point_count, self.neighbours, self.dimension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_name_every_parameter() {
        let pipeline = PipelineBenchParams {
            point_count: 500,
            neighbours: 30,
        };
        let density = DensityBenchParams {
            point_count: 500,
            neighbours: 30,
            dimension: 2.5,
        };

        assert_eq!(pipeline.to_string(), "n=500,k=30");
        assert_eq!(density.to_string(), "n=500,k=30,d=2.5");
    }
}
