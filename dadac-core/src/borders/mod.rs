//! Border detection between clusters.
//!
//! A point is a border candidate between its own cluster and another when a
//! neighbour inside its `kstar` window belongs to that other cluster. The
//! saddle of a cluster pair is its densest candidate. Saddles are held by a
//! [`BorderStore`]: a dense symmetric table for few clusters or per-cluster
//! maps when the table would be too large.

mod dense;
mod sparse;

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{info, instrument};

pub use self::{dense::DenseBorders, sparse::SparseBorders};
use crate::{
    memory::dense_border_bytes, neighbourhood::Neighbourhoods, peaks::Peaks, point::PointInfo,
};

/// Default memory budget for a dense border table.
pub const DEFAULT_BORDER_BUDGET_BYTES: u64 = 256 * 1024 * 1024;

/// Saddle record of a cluster pair, or the peak record on the diagonal.
///
/// # Examples
/// ```
/// use dadac_core::Border;
///
/// let high = Border { point: 9, density: -1.0, error: 0.2 };
/// let low = Border { point: 3, density: -2.0, error: 0.2 };
/// assert!(high.outranks(&low));
/// assert!(!low.outranks(&high));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Border {
    /// The saddle point.
    pub point: usize,
    /// Corrected log density (`log_rho_c`) of the saddle.
    pub density: f64,
    /// Standard error of the saddle's log density.
    pub error: f64,
}

impl Border {
    /// Builds the record describing `point`.
    #[must_use]
    pub fn of(point: usize, info: &PointInfo) -> Self {
        Self {
            point,
            density: info.log_rho_c,
            error: info.log_rho_err,
        }
    }

    /// Returns whether `self` is a higher saddle than `other`: denser, or as
    /// dense with a lower point index.
    #[must_use]
    pub fn outranks(&self, other: &Self) -> bool {
        match self.density.total_cmp(&other.density) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.point < other.point,
        }
    }
}

/// Capability over a symmetric cluster-pair table of [`Border`] records.
///
/// `get(a, b)` and `get(b, a)` always return the same record. The diagonal
/// `get(a, a)` holds the record of cluster `a`'s center.
pub trait BorderStore {
    /// Number of cluster ids the store was sized for.
    fn cluster_count(&self) -> usize;

    /// Record for the pair `(a, b)`, if any.
    fn get(&self, a: usize, b: usize) -> Option<Border>;

    /// Replaces the record for `(a, b)`.
    fn set(&mut self, a: usize, b: usize, border: Option<Border>);

    /// Other clusters sharing a record with `a`, ascending by id.
    fn neighbours(&self, a: usize) -> Vec<(usize, Border)>;

    /// Every off-diagonal record once, as `(a, b, border)` with `a < b`,
    /// ascending.
    fn iter_pairs(&self) -> Vec<(usize, usize, Border)>;

    /// Stores `candidate` for `(a, b)` when the pair has no record or
    /// `candidate` outranks it. Returns whether the record changed.
    fn update_if_higher(&mut self, a: usize, b: usize, candidate: Border) -> bool {
        let replace = self
            .get(a, b)
            .is_none_or(|current| candidate.outranks(&current));
        if replace {
            self.set(a, b, Some(candidate));
        }
        replace
    }

    /// Folds cluster `gone` into `keep`: each neighbour of `gone` ends up with
    /// the higher of its two saddles towards `keep`, and every record of
    /// `gone`, including the pair itself, is removed.
    fn absorb(&mut self, keep: usize, gone: usize) {
        for (other, border) in self.neighbours(gone) {
            if other != keep {
                self.update_if_higher(keep, other, border);
            }
            self.set(gone, other, None);
        }
        self.set(gone, gone, None);
    }
}

/// Table layout requested by the configuration.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum BorderStorage {
    /// Dense when the table fits the budget, sparse otherwise.
    #[default]
    Auto,
    /// Always a `C x C` table.
    Dense,
    /// Always per-cluster maps.
    Sparse,
}

impl BorderStorage {
    /// Returns whether `clusters` clusters should use the sparse layout.
    ///
    /// # Examples
    /// ```
    /// use dadac_core::BorderStorage;
    ///
    /// assert!(!BorderStorage::Auto.is_sparse_for(10, 1 << 20));
    /// assert!(BorderStorage::Auto.is_sparse_for(100_000, 1 << 20));
    /// assert!(BorderStorage::Sparse.is_sparse_for(2, 1 << 20));
    /// ```
    #[must_use]
    pub fn is_sparse_for(self, clusters: usize, budget_bytes: u64) -> bool {
        match self {
            Self::Auto => dense_border_bytes(clusters) >= budget_bytes,
            Self::Dense => false,
            Self::Sparse => true,
        }
    }
}

/// A [`BorderStore`] in either layout.
#[derive(Clone, Debug, PartialEq)]
pub enum Borders {
    /// `C x C` table.
    Dense(DenseBorders),
    /// Per-cluster maps.
    Sparse(SparseBorders),
}

impl Borders {
    /// Empty store for `clusters` clusters in the requested layout.
    #[must_use]
    pub fn new(clusters: usize, sparse: bool) -> Self {
        if sparse {
            Self::Sparse(SparseBorders::new(clusters))
        } else {
            Self::Dense(DenseBorders::new(clusters))
        }
    }

    /// Returns whether the sparse layout is in use.
    #[must_use]
    pub const fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    fn store(&self) -> &dyn BorderStore {
        match self {
            Self::Dense(table) => table,
            Self::Sparse(maps) => maps,
        }
    }

    fn store_mut(&mut self) -> &mut dyn BorderStore {
        match self {
            Self::Dense(table) => table,
            Self::Sparse(maps) => maps,
        }
    }
}

impl BorderStore for Borders {
    fn cluster_count(&self) -> usize {
        self.store().cluster_count()
    }

    fn get(&self, a: usize, b: usize) -> Option<Border> {
        self.store().get(a, b)
    }

    fn set(&mut self, a: usize, b: usize, border: Option<Border>) {
        self.store_mut().set(a, b, border);
    }

    fn neighbours(&self, a: usize) -> Vec<(usize, Border)> {
        self.store().neighbours(a)
    }

    fn iter_pairs(&self) -> Vec<(usize, usize, Border)> {
        self.store().iter_pairs()
    }
}

type Candidates = HashMap<(usize, usize), Border>;

fn offer(candidates: &mut Candidates, pair: (usize, usize), border: Border) {
    candidates
        .entry(pair)
        .and_modify(|current| {
            if border.outranks(current) {
                *current = border;
            }
        })
        .or_insert(border);
}

/// Finds the saddle of every cluster pair and records each center on the
/// diagonal.
///
/// Candidates are gathered in parallel into per-thread tables and reduced by
/// keeping the higher saddle, so the outcome does not depend on scheduling.
///
/// # Examples
/// ```
/// use dadac_core::{Border, BorderStore, Borders, Neighbour, Neighbourhoods, PointInfo,
///     detect_borders, discover_peaks};
///
/// // Two peaks (0 and 3) with a valley at 1 and 2.
/// let densities = [3.0, 1.0, 1.5, 4.0];
/// let rows = (0..4_usize)
///     .map(|i| {
///         let mut row = vec![Neighbour::new(i, 0.0)];
///         row.extend((0..4_usize).filter(|&j| j != i).map(|j| {
///             Neighbour::new(j, (i as f64 - j as f64).powi(2))
///         }));
///         row.sort_by(|a, b| a.sq_distance.total_cmp(&b.sq_distance).then(a.index.cmp(&b.index)));
///         row.truncate(2);
///         row
///     })
///     .collect();
/// let neighbourhoods = Neighbourhoods::try_from_rows(rows, 2)?;
/// let mut points: Vec<PointInfo> =
///     densities.iter().map(|&d| PointInfo::new(1, d, 0.1, 0.0)).collect();
/// points[1].nearest_denser = Some(0);
/// points[2].nearest_denser = Some(3);
/// let peaks = discover_peaks(&points);
/// let borders = detect_borders(&neighbourhoods, &points, &peaks, false);
/// assert_eq!(borders.get(0, 1).map(|b| b.point), Some(2));
/// assert_eq!(borders.get(1, 0), borders.get(0, 1));
/// # Ok::<(), dadac_core::DadacError>(())
/// ```
#[instrument(
    name = "core.heuristic2",
    skip(neighbourhoods, points, peaks),
    fields(clusters = peaks.cluster_count(), sparse = sparse),
)]
pub fn detect_borders(
    neighbourhoods: &Neighbourhoods,
    points: &[PointInfo],
    peaks: &Peaks,
    sparse: bool,
) -> Borders {
    let candidates = (0..points.len())
        .into_par_iter()
        .fold(Candidates::new, |mut found, point| {
            let Some(own) = peaks.label(point) else {
                return found;
            };
            let window = points[point].kstar + 1;
            let border = Border::of(point, &points[point]);
            for neighbour in neighbourhoods.row(point).iter().take(window).skip(1) {
                match peaks.label(neighbour.index) {
                    Some(other) if other != own => {
                        offer(&mut found, (own.min(other), own.max(other)), border);
                    }
                    _ => {}
                }
            }
            found
        })
        .reduce(Candidates::new, |mut left, right| {
            for (pair, border) in right {
                offer(&mut left, pair, border);
            }
            left
        });

    let mut borders = Borders::new(peaks.cluster_count(), sparse);
    for (cluster, &center) in peaks.centers().iter().enumerate() {
        borders.set(cluster, cluster, Some(Border::of(center, &points[center])));
    }
    for ((a, b), border) in candidates {
        borders.update_if_higher(a, b, border);
    }
    info!(pairs = borders.iter_pairs().len(), "borders detected");
    borders
}
