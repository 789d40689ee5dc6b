//! Per-point density state shared by every clustering stage.

use std::cmp::Ordering;

/// Density estimate and linkage for a single point.
///
/// A point whose density could not be estimated carries
/// `log_rho == f64::NEG_INFINITY` and is excluded from clustering.
///
/// # Examples
/// ```
/// use dadac_core::PointInfo;
///
/// let point = PointInfo::new(7, -1.5, 0.6, 1.0);
/// assert_eq!(point.kstar, 7);
/// assert!((point.log_rho_c - (-2.1)).abs() < 1e-12);
/// assert!(!point.is_excluded());
/// assert!(PointInfo::excluded(3).is_excluded());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointInfo {
    /// Adaptive neighbourhood size.
    pub kstar: usize,
    /// Log density.
    pub log_rho: f64,
    /// Log density lowered by `Z` standard errors.
    pub log_rho_c: f64,
    /// Standard error of [`PointInfo::log_rho`].
    pub log_rho_err: f64,
    /// Closest neighbour that is denser under [`density_order`], or `None`
    /// for peaks and excluded points.
    pub nearest_denser: Option<usize>,
}

impl PointInfo {
    /// Builds a point record and applies the `z` correction.
    #[must_use]
    pub fn new(kstar: usize, log_rho: f64, log_rho_err: f64, z: f64) -> Self {
        Self {
            kstar,
            log_rho,
            log_rho_c: log_rho - z * log_rho_err,
            log_rho_err,
            nearest_denser: None,
        }
    }

    /// Builds the record of a point excluded from clustering.
    #[must_use]
    pub const fn excluded(kstar: usize) -> Self {
        Self {
            kstar,
            log_rho: f64::NEG_INFINITY,
            log_rho_c: f64::NEG_INFINITY,
            log_rho_err: 0.0,
            nearest_denser: None,
        }
    }

    /// Returns whether the point takes no part in clustering.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        !self.log_rho.is_finite()
    }

    /// Merging score `log_rho_c - log_rho_err`.
    #[must_use]
    pub fn g(&self) -> f64 {
        self.log_rho_c - self.log_rho_err
    }
}

/// Orders points from densest to sparsest by `log_rho_c`, breaking ties by
/// the lower index.
///
/// `Ordering::Less` means `left` is denser than `right`.
///
/// # Examples
/// ```
/// use std::cmp::Ordering;
/// use dadac_core::{PointInfo, density_order};
///
/// let points = [PointInfo::new(3, 1.0, 0.0, 0.0), PointInfo::new(3, 1.0, 0.0, 0.0)];
/// assert_eq!(density_order(&points, 0, 1), Ordering::Less);
/// ```
#[must_use]
pub fn density_order(points: &[PointInfo], left: usize, right: usize) -> Ordering {
    points[right]
        .log_rho_c
        .total_cmp(&points[left].log_rho_c)
        .then(left.cmp(&right))
}

/// Returns whether `left` is denser than `right` under [`density_order`].
#[must_use]
pub fn is_denser(points: &[PointInfo], left: usize, right: usize) -> bool {
    density_order(points, left, right) == Ordering::Less
}
