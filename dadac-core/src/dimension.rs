//! Two-nearest-neighbour intrinsic dimension estimate.
//!
//! The ratio `mu = r2 / r1` of the second to the first neighbour distance is
//! Pareto distributed with tail index equal to the intrinsic dimension, so the
//! maximum-likelihood estimate is `n / sum(ln mu)` over the usable points.

use rayon::prelude::*;
use tracing::{info, instrument};

use crate::{error::NumericFault, neighbourhood::Neighbourhoods};

/// Outcome of [`estimate_intrinsic_dimension`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TwoNnEstimate {
    dimension: f64,
    used: usize,
    discarded: usize,
}

impl TwoNnEstimate {
    /// Estimated intrinsic dimension.
    #[rustfmt::skip]
    #[must_use]
    pub fn dimension(&self) -> f64 { self.dimension }

    /// Number of points whose ratio entered the estimate.
    #[rustfmt::skip]
    #[must_use]
    pub fn used(&self) -> usize { self.used }

    /// Number of points dropped for duplicate or tied distances.
    #[rustfmt::skip]
    #[must_use]
    pub fn discarded(&self) -> usize { self.discarded }
}

/// Estimates the intrinsic dimension from the first two neighbour distances
/// of every row.
///
/// Points with `r1 == 0`, `r1 == r2` or rows shorter than three entries are
/// skipped.
///
/// # Errors
/// Returns [`NumericFault::DegenerateDistanceRatios`] when no point yields a
/// usable ratio.
///
/// # Examples
/// ```
/// use dadac_core::{Neighbour, Neighbourhoods, estimate_intrinsic_dimension};
///
/// let row = |i: usize, a: (usize, f64), b: (usize, f64)| {
///     vec![Neighbour::new(i, 0.0), Neighbour::new(a.0, a.1), Neighbour::new(b.0, b.1)]
/// };
/// let rows = vec![
///     row(0, (1, 1.0), (2, 4.0)),
///     row(1, (0, 1.0), (2, 1.0)),
///     row(2, (1, 1.0), (0, 4.0)),
/// ];
/// let neighbourhoods = Neighbourhoods::try_from_rows(rows, 3)?;
/// let estimate = estimate_intrinsic_dimension(&neighbourhoods)?;
/// assert_eq!(estimate.used(), 2);
/// assert!((estimate.dimension() - 1.0 / 2.0_f64.ln()).abs() < 1e-12);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[instrument(name = "core.dimension", skip(neighbourhoods), fields(points = neighbourhoods.len()))]
pub fn estimate_intrinsic_dimension(
    neighbourhoods: &Neighbourhoods,
) -> Result<TwoNnEstimate, NumericFault> {
    let log_ratios: Vec<Option<f64>> = (0..neighbourhoods.len())
        .into_par_iter()
        .map(|point| log_ratio(neighbourhoods, point))
        .collect();

    // Sequential sum keeps the estimate independent of the worker count.
    let (used, total) = log_ratios
        .iter()
        .flatten()
        .fold((0_usize, 0.0_f64), |(count, sum), value| (count + 1, sum + value));
    if used == 0 || total <= 0.0 {
        return Err(NumericFault::DegenerateDistanceRatios);
    }

    let estimate = TwoNnEstimate {
        dimension: used as f64 / total,
        used,
        discarded: log_ratios.len() - used,
    };
    info!(
        dimension = estimate.dimension,
        used = estimate.used,
        discarded = estimate.discarded,
        "intrinsic dimension estimated"
    );
    Ok(estimate)
}

fn log_ratio(neighbourhoods: &Neighbourhoods, point: usize) -> Option<f64> {
    let row = neighbourhoods.row(point);
    let first = row.get(1)?.sq_distance;
    let second = row.get(2)?.sq_distance;
    if first <= 0.0 {
        return None;
    }
    let value = 0.5 * (second / first).ln();
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{neighbourhoods_for, row};
    use rand::{Rng, SeedableRng, rngs::SmallRng};
    use rstest::rstest;

    fn uniform_cube(count: usize, dims: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..count)
            .map(|_| (0..dims).map(|_| rng.gen_range(0.0..1.0)).collect())
            .collect()
    }

    #[rstest]
    #[case::plane(2)]
    #[case::volume(3)]
    fn recovers_dimension_of_uniform_samples(#[case] dims: usize) {
        let neighbourhoods = neighbourhoods_for(uniform_cube(1_500, dims, 11), 3);

        let estimate = estimate_intrinsic_dimension(&neighbourhoods).expect("estimate must succeed");

        let error = (estimate.dimension() - dims as f64).abs();
        assert!(error < 0.4, "estimated {} for {dims}", estimate.dimension());
    }

    #[test]
    fn embedded_line_reports_one_dimension() {
        let mut rng = SmallRng::seed_from_u64(5);
        let points = (0..1_000)
            .map(|_| {
                let t: f64 = rng.gen_range(0.0..10.0);
                vec![t, 2.0 * t, -t]
            })
            .collect();
        let neighbourhoods = neighbourhoods_for(points, 3);

        let estimate = estimate_intrinsic_dimension(&neighbourhoods).expect("estimate must succeed");

        assert!((estimate.dimension() - 1.0).abs() < 0.25);
    }

    #[test]
    fn degenerate_rows_are_discarded() {
        let rows = vec![
            row(&[(0, 0.0), (1, 0.0), (2, 1.0)]),
            row(&[(1, 0.0), (0, 0.0), (2, 1.0)]),
            row(&[(2, 0.0), (0, 1.0), (1, 1.0)]),
        ];
        let neighbourhoods = Neighbourhoods::try_from_rows(rows, 3).expect("rows are valid");

        let err = estimate_intrinsic_dimension(&neighbourhoods).expect_err("no usable ratio");

        assert_eq!(err, NumericFault::DegenerateDistanceRatios);
    }
}
