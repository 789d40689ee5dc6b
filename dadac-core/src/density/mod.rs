//! Adaptive-scale density estimation and nearest-denser linkage.
//!
//! Every point picks its own neighbourhood size `kstar` with a
//! likelihood-ratio test, then reports a log density from the volume of the
//! ball reaching its `kstar`-th neighbour. The estimates are corrected by `Z`
//! standard errors and each point is linked to its closest denser neighbour.

mod volume;

use rayon::prelude::*;
use tracing::{Span, field, info, instrument, warn};

pub(crate) use self::volume::ln_unit_ball_volume;
use crate::{
    neighbourhood::Neighbourhoods,
    point::{PointInfo, is_denser},
};

/// Critical value of the likelihood-ratio statistic used when selecting
/// `kstar`.
pub const DEFAULT_LIKELIHOOD_THRESHOLD: f64 = 23.928_126_98;

/// Smallest neighbour position tested by the scale selection.
const FIRST_TESTED_NEIGHBOUR: usize = 4;

/// Parameters of the point-cloud density estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DensityParams {
    /// Intrinsic dimension of the data.
    pub dimension: f64,
    /// Confidence scalar applied by the correction pass.
    pub z: f64,
    /// Critical value that stops the growth of `kstar`.
    pub likelihood_threshold: f64,
}

/// Per-point densities together with the dimension they were computed in.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityField {
    points: Vec<PointInfo>,
    dimension: f64,
    excluded: usize,
}

impl DensityField {
    pub(crate) fn from_points(points: Vec<PointInfo>, dimension: f64) -> Self {
        let excluded = points.iter().filter(|point| point.is_excluded()).count();
        Self {
            points,
            dimension,
            excluded,
        }
    }

    /// Per-point records in input order.
    #[rustfmt::skip]
    #[must_use]
    pub fn points(&self) -> &[PointInfo] { &self.points }

    /// Dimension used by the estimate.
    #[rustfmt::skip]
    #[must_use]
    pub fn dimension(&self) -> f64 { self.dimension }

    /// Number of points excluded for a non-finite density.
    #[rustfmt::skip]
    #[must_use]
    pub fn excluded(&self) -> usize { self.excluded }

    /// Returns whether every point was excluded.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.excluded == self.points.len()
    }

    /// Recomputes `log_rho_c = log_rho - z * log_rho_err` for every point.
    pub(crate) fn apply_correction(&mut self, z: f64) {
        self.points.par_iter_mut().for_each(|point| {
            if !point.is_excluded() {
                point.log_rho_c = point.log_rho - z * point.log_rho_err;
            }
        });
    }

    /// Links every point to the first denser entry of its neighbour row.
    ///
    /// Rows are sorted by distance, so the first hit inside the `kstar`
    /// window is also the first hit of the whole row; points with no denser
    /// neighbour in their row become peaks.
    pub(crate) fn link_nearest_denser(&mut self, neighbourhoods: &Neighbourhoods) {
        let points = &self.points;
        let links: Vec<Option<usize>> = (0..points.len())
            .into_par_iter()
            .map(|point| {
                if points[point].is_excluded() {
                    return None;
                }
                neighbourhoods
                    .row(point)
                    .iter()
                    .skip(1)
                    .map(|neighbour| neighbour.index)
                    .find(|&candidate| {
                        !points[candidate].is_excluded() && is_denser(points, candidate, point)
                    })
            })
            .collect();
        for (point, link) in self.points.iter_mut().zip(links) {
            point.nearest_denser = link;
        }
    }
}

/// Estimates densities for a point cloud and links nearest-denser
/// neighbours.
///
/// Points whose density is not finite (for instance because their `kstar`-th
/// neighbour sits at distance zero) are excluded and counted.
///
/// # Examples
/// ```
/// use dadac_core::{DensityParams, Neighbour, Neighbourhoods, estimate_densities};
///
/// let rows: Vec<Vec<Neighbour>> = (0..8_usize)
///     .map(|i| {
///         let mut row: Vec<Neighbour> = (0..8_usize)
///             .map(|j| Neighbour::new(j, (i as f64 - j as f64).powi(2)))
///             .collect();
///         row.sort_by(|a, b| a.sq_distance.total_cmp(&b.sq_distance).then(a.index.cmp(&b.index)));
///         row.retain(|n| n.index != i);
///         row.insert(0, Neighbour::new(i, 0.0));
///         row.truncate(6);
///         row
///     })
///     .collect();
/// let neighbourhoods = Neighbourhoods::try_from_rows(rows, 6)?;
/// let params = DensityParams { dimension: 1.0, z: 0.0, likelihood_threshold: 23.928_126_98 };
/// let field = estimate_densities(&neighbourhoods, params);
/// assert_eq!(field.points().len(), 8);
/// assert!(field.points().iter().all(|p| (3..=5).contains(&p.kstar)));
/// # Ok::<(), dadac_core::DadacError>(())
/// ```
#[instrument(
    name = "core.density",
    skip(neighbourhoods),
    fields(points = neighbourhoods.len(), excluded = field::Empty),
)]
pub fn estimate_densities(neighbourhoods: &Neighbourhoods, params: DensityParams) -> DensityField {
    let count = neighbourhoods.len();
    let ln_points = (count as f64).ln();
    let ln_omega = ln_unit_ball_volume(params.dimension);
    let half_dimension = 0.5 * params.dimension;

    let points: Vec<PointInfo> = (0..count)
        .into_par_iter()
        .map(|point| {
            let kstar = select_kstar(
                neighbourhoods,
                point,
                half_dimension,
                params.likelihood_threshold,
            );
            let radius_sq = neighbourhoods
                .row(point)
                .get(kstar)
                .map_or(0.0, |neighbour| neighbour.sq_distance);
            let log_rho = ((kstar - 1) as f64).ln()
                - ln_points
                - ln_omega
                - half_dimension * radius_sq.ln();
            if log_rho.is_finite() {
                PointInfo::new(kstar, log_rho, standard_error(kstar), 0.0)
            } else {
                PointInfo::excluded(kstar)
            }
        })
        .collect();

    let mut field = DensityField::from_points(points, params.dimension);
    field.apply_correction(params.z);
    field.link_nearest_denser(neighbourhoods);
    record_exclusions(&field);
    field
}

pub(crate) fn record_exclusions(field: &DensityField) {
    Span::current().record("excluded", field.excluded);
    if field.excluded > 0 {
        warn!(
            excluded = field.excluded,
            "points with non-finite density excluded from clustering"
        );
    }
    info!(
        points = field.points.len(),
        excluded = field.excluded,
        "densities estimated"
    );
}

/// Standard error of a log density estimated from `kstar` neighbours.
#[must_use]
pub fn standard_error(kstar: usize) -> f64 {
    let k = kstar as f64;
    ((4.0 * k + 2.0) / (k * (k - 1.0))).sqrt()
}

/// Selects the adaptive neighbourhood size of `point`.
///
/// Starting at the fourth neighbour, the volume reaching the `(j-1)`-th
/// neighbour of `point` is compared with the volume reaching the `(j-1)`-th
/// neighbour of its `j`-th neighbour. The statistic
/// `-2 (j-1) ln(4 V_i V_j / (V_i + V_j)^2)` grows as the two volumes diverge;
/// growth stops at the first `j` where it reaches `threshold`, and
/// `kstar = j - 1`. If every tested `j` passes, `kstar` is the last row
/// position.
///
/// Rows shorter than five entries return their last position, at least one.
#[must_use]
pub fn select_kstar(
    neighbourhoods: &Neighbourhoods,
    point: usize,
    half_dimension: f64,
    threshold: f64,
) -> usize {
    let row = neighbourhoods.row(point);
    let last = row.len().saturating_sub(1).max(1);
    for j in FIRST_TESTED_NEIGHBOUR..row.len() {
        let ksel = j - 1;
        let neighbour_row = neighbourhoods.row(row[j].index);
        let Some(neighbour_radius) = neighbour_row.get(ksel) else {
            return ksel;
        };
        let log_volume_i = half_dimension * row[ksel].sq_distance.ln();
        let log_volume_j = half_dimension * neighbour_radius.sq_distance.ln();
        let statistic = -2.0
            * ksel as f64
            * (4.0_f64.ln() + log_volume_i + log_volume_j
                - 2.0 * log_sum_exp(log_volume_i, log_volume_j));
        // Zero radii yield NaN.
        if statistic.is_nan() || statistic >= threshold {
            return ksel;
        }
    }
    last
}

fn log_sum_exp(a: f64, b: f64) -> f64 {
    let high = a.max(b);
    if high == f64::NEG_INFINITY {
        return high;
    }
    high + (-(a - b).abs()).exp().ln_1p()
}
