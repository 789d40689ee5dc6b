//! Halo assignment after merging.

use tracing::debug;

use crate::{borders::BorderStore, point::PointInfo};

/// How halo points are reported.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum HaloLabelling {
    /// Halo points lose their cluster and are reported as noise (`-1`).
    #[default]
    Noise,
    /// Halo points keep their cluster and carry the halo flag.
    Flag,
}

/// Highest saddle density incident to each cluster, if it has any border.
fn highest_saddles(borders: &impl BorderStore) -> Vec<Option<f64>> {
    let mut highest = vec![None; borders.cluster_count()];
    for (a, b, border) in borders.iter_pairs() {
        for cluster in [a, b] {
            let slot: &mut Option<f64> = &mut highest[cluster];
            *slot = Some(slot.map_or(border.density, |current| current.max(border.density)));
        }
    }
    highest
}

/// Flags every clustered point whose `log_rho_c` lies below the highest
/// saddle density of its cluster. Clusters without borders have no halo.
///
/// # Examples
/// ```
/// use dadac_core::{Border, BorderStore, Borders, PointInfo, find_halo};
///
/// let points = [
///     PointInfo::new(5, 3.0, 0.1, 0.0),
///     PointInfo::new(5, 1.0, 0.1, 0.0),
///     PointInfo::new(5, 2.0, 0.1, 0.0),
/// ];
/// let mut borders = Borders::new(2, false);
/// borders.set(0, 1, Some(Border::of(2, &points[2])));
/// let labels = [Some(0), Some(0), Some(1)];
/// assert_eq!(find_halo(&points, &labels, &borders), vec![false, true, false]);
/// ```
#[must_use]
pub fn find_halo(
    points: &[PointInfo],
    labels: &[Option<usize>],
    borders: &impl BorderStore,
) -> Vec<bool> {
    let highest = highest_saddles(borders);
    let halo: Vec<bool> = points
        .iter()
        .zip(labels)
        .map(|(point, label)| {
            label
                .and_then(|cluster| highest.get(cluster).copied().flatten())
                .is_some_and(|saddle| point.log_rho_c < saddle)
        })
        .collect();
    debug!(halo = halo.iter().filter(|&&flag| flag).count(), "halo assigned");
    halo
}
