//! Peak discovery: initial clusters from the nearest-denser forest.

use rayon::prelude::*;
use tracing::{info, instrument};

use crate::point::{PointInfo, density_order};

/// Cluster labels produced by [`discover_peaks`].
///
/// Cluster `c` is centred on `centers()[c]`; ids follow the order in which
/// peaks were met, so cluster `0` holds the densest point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Peaks {
    labels: Vec<Option<usize>>,
    centers: Vec<usize>,
}

impl Peaks {
    /// Cluster of every point; `None` for excluded points.
    #[rustfmt::skip]
    #[must_use]
    pub fn labels(&self) -> &[Option<usize>] { &self.labels }

    /// Center point of every cluster.
    #[rustfmt::skip]
    #[must_use]
    pub fn centers(&self) -> &[usize] { &self.centers }

    /// Number of clusters.
    #[rustfmt::skip]
    #[must_use]
    pub fn cluster_count(&self) -> usize { self.centers.len() }

    /// Cluster of `point`.
    #[must_use]
    pub fn label(&self, point: usize) -> Option<usize> {
        self.labels.get(point).copied().flatten()
    }
}

/// Visits points from densest to sparsest, opening a cluster at every point
/// without a nearest-denser link and otherwise inheriting the label of the
/// link.
///
/// The visiting order is the one that defines the links, so every link has
/// been labelled by the time it is needed.
///
/// # Examples
/// ```
/// use dadac_core::{PointInfo, discover_peaks};
///
/// let mut points = vec![
///     PointInfo::new(3, 2.0, 0.1, 0.0),
///     PointInfo::new(3, 1.0, 0.1, 0.0),
///     PointInfo::new(3, 3.0, 0.1, 0.0),
/// ];
/// points[1].nearest_denser = Some(0);
/// let peaks = discover_peaks(&points);
/// assert_eq!(peaks.centers(), &[2, 0]);
/// assert_eq!(peaks.labels(), &[Some(1), Some(1), Some(0)]);
/// ```
#[instrument(name = "core.heuristic1", skip(points), fields(points = points.len()))]
pub fn discover_peaks(points: &[PointInfo]) -> Peaks {
    let mut order: Vec<usize> = (0..points.len())
        .filter(|&point| !points[point].is_excluded())
        .collect();
    order.par_sort_unstable_by(|&left, &right| density_order(points, left, right));

    let mut labels = vec![None; points.len()];
    let mut centers = Vec::new();
    for point in order {
        let inherited = points[point]
            .nearest_denser
            .and_then(|denser| labels[denser]);
        labels[point] = Some(inherited.unwrap_or_else(|| {
            centers.push(point);
            centers.len() - 1
        }));
    }

    info!(clusters = centers.len(), "peaks discovered");
    Peaks { labels, centers }
}
