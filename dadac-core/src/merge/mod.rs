//! Peak merging.
//!
//! Two clusters merge when their saddle is statistically indistinguishable
//! from the weaker of their peaks. Candidates are taken from a min-heap keyed
//! by merging strength; entries made stale by earlier merges are skipped by
//! comparing per-cluster versions.

mod union_find;

use std::{cmp::Ordering, collections::BinaryHeap};

use tracing::{Span, debug, field, info, instrument};

use self::union_find::ClusterSets;
use crate::{
    borders::{Border, BorderStore, Borders},
    peaks::Peaks,
    point::{PointInfo, is_denser},
};

/// Final clusters after merging.
#[derive(Clone, Debug, PartialEq)]
pub struct Merged {
    labels: Vec<Option<usize>>,
    centers: Vec<usize>,
    borders: Borders,
    merges: usize,
}

impl Merged {
    /// Final cluster of every point; `None` for excluded points.
    #[rustfmt::skip]
    #[must_use]
    pub fn labels(&self) -> &[Option<usize>] { &self.labels }

    /// Center point of every final cluster.
    #[rustfmt::skip]
    #[must_use]
    pub fn centers(&self) -> &[usize] { &self.centers }

    /// Saddles between final clusters, centers on the diagonal.
    #[rustfmt::skip]
    #[must_use]
    pub fn borders(&self) -> &Borders { &self.borders }

    /// Number of merges applied.
    #[rustfmt::skip]
    #[must_use]
    pub fn merges(&self) -> usize { self.merges }

    /// Number of final clusters.
    #[rustfmt::skip]
    #[must_use]
    pub fn cluster_count(&self) -> usize { self.centers.len() }

    pub(crate) fn into_parts(self) -> (Vec<Option<usize>>, Vec<usize>, Borders) {
        (self.labels, self.centers, self.borders)
    }
}

/// Upper confidence bound of a saddle's log density at confidence `z`.
///
/// `density` already holds `log_rho - z * err`, so the bound adds the error
/// back twice.
#[must_use]
pub fn saddle_bound(border: &Border, z: f64) -> f64 {
    border.density + 2.0 * z * border.error
}

/// Merging strength of a pair: the lower of the two peak bounds minus the
/// saddle bound. The pair merges when this is negative.
///
/// # Examples
/// ```
/// use dadac_core::{Border, merge_strength};
///
/// let saddle = Border { point: 4, density: 1.0, error: 0.5 };
/// assert_eq!(merge_strength(3.0, 2.0, &saddle, 0.0), 1.0);
/// assert!(merge_strength(3.0, 2.0, &saddle, 2.0) < 0.0);
/// ```
#[must_use]
pub fn merge_strength(peak_a: f64, peak_b: f64, border: &Border, z: f64) -> f64 {
    peak_a.min(peak_b) - saddle_bound(border, z)
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    strength: f64,
    low: usize,
    high: usize,
    versions: (u64, u64),
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    // Reversed so the max-heap pops the weakest strength, then lowest ids.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .strength
            .total_cmp(&self.strength)
            .then(other.low.cmp(&self.low))
            .then(other.high.cmp(&self.high))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct MergeState<'a> {
    points: &'a [PointInfo],
    centers: Vec<usize>,
    alive: Vec<bool>,
    versions: Vec<u64>,
    heap: BinaryHeap<Candidate>,
    z: f64,
}

impl MergeState<'_> {
    fn peak_bound(&self, cluster: usize) -> f64 {
        self.points[self.centers[cluster]].log_rho_c
    }

    fn offer(&mut self, a: usize, b: usize, border: &Border) {
        let (low, high) = (a.min(b), a.max(b));
        let strength = merge_strength(self.peak_bound(low), self.peak_bound(high), border, self.z);
        if strength < 0.0 {
            self.heap.push(Candidate {
                strength,
                low,
                high,
                versions: (self.versions[low], self.versions[high]),
            });
        }
    }

    fn is_current(&self, candidate: &Candidate) -> bool {
        self.alive[candidate.low]
            && self.alive[candidate.high]
            && self.versions[candidate.low] == candidate.versions.0
            && self.versions[candidate.high] == candidate.versions.1
    }
}

/// Merges clusters whose saddle is not significant at confidence `z`.
///
/// The denser center survives each merge and the merged cluster keeps, per
/// neighbouring cluster, the higher of the two saddles. Surviving clusters
/// are renumbered in their original order, so the densest peak keeps id `0`.
///
/// # Examples
/// ```
/// use dadac_core::{Border, BorderStore, Borders, PointInfo, discover_peaks, merge_peaks};
///
/// let mut points = vec![
///     PointInfo::new(3, 3.0, 0.5, 1.0),
///     PointInfo::new(3, 2.9, 0.5, 1.0),
///     PointInfo::new(3, 2.8, 0.5, 1.0),
/// ];
/// points[2].nearest_denser = Some(1);
/// let peaks = discover_peaks(&points);
/// let mut borders = Borders::new(peaks.cluster_count(), false);
/// borders.set(0, 0, Some(Border::of(0, &points[0])));
/// borders.set(1, 1, Some(Border::of(1, &points[1])));
/// borders.set(0, 1, Some(Border::of(2, &points[2])));
///
/// let merged = merge_peaks(&points, &peaks, borders, 1.0);
/// assert_eq!(merged.cluster_count(), 1);
/// assert_eq!(merged.centers(), &[0]);
/// ```
#[instrument(
    name = "core.heuristic3",
    skip(points, peaks, borders),
    fields(clusters = peaks.cluster_count(), z = z, merged = field::Empty),
)]
pub fn merge_peaks(points: &[PointInfo], peaks: &Peaks, mut borders: Borders, z: f64) -> Merged {
    let clusters = peaks.cluster_count();
    let mut state = MergeState {
        points,
        centers: peaks.centers().to_vec(),
        alive: vec![true; clusters],
        versions: vec![0; clusters],
        heap: BinaryHeap::new(),
        z,
    };
    for (a, b, border) in borders.iter_pairs() {
        state.offer(a, b, &border);
    }

    let mut sets = ClusterSets::new(clusters);
    let mut merges = 0;
    while let Some(candidate) = state.heap.pop() {
        if !state.is_current(&candidate) {
            continue;
        }
        let (low, high) = (candidate.low, candidate.high);
        let (keep, gone) = if is_denser(points, state.centers[low], state.centers[high]) {
            (low, high)
        } else {
            (high, low)
        };
        debug!(keep, gone, strength = candidate.strength, "merging clusters");

        borders.absorb(keep, gone);
        state.alive[gone] = false;
        state.versions[keep] += 1;
        sets.merge_into(keep, gone);
        merges += 1;

        for (other, border) in borders.neighbours(keep) {
            state.offer(keep, other, &border);
        }
    }

    let merged = relabel(peaks, &state, &mut sets, &borders, merges);
    Span::current().record("merged", merges);
    info!(clusters = merged.cluster_count(), merges, "peaks merged");
    merged
}

fn relabel(
    peaks: &Peaks,
    state: &MergeState<'_>,
    sets: &mut ClusterSets,
    borders: &Borders,
    merges: usize,
) -> Merged {
    let clusters = state.alive.len();
    let mut renumbered = vec![None; clusters];
    let mut centers = Vec::new();
    for cluster in (0..clusters).filter(|&cluster| state.alive[cluster]) {
        renumbered[cluster] = Some(centers.len());
        centers.push(state.centers[cluster]);
    }

    let final_id: Vec<Option<usize>> = (0..clusters)
        .map(|cluster| renumbered[sets.survivor(cluster)])
        .collect();
    let labels = peaks
        .labels()
        .iter()
        .map(|label| label.and_then(|cluster| final_id[cluster]))
        .collect();

    let mut remapped = Borders::new(centers.len(), borders.is_sparse());
    for (cluster, new_id) in renumbered.iter().enumerate() {
        if let Some(id) = *new_id {
            remapped.set(id, id, borders.get(cluster, cluster));
        }
    }
    for (a, b, border) in borders.iter_pairs() {
        if let (Some(left), Some(right)) = (renumbered[a], renumbered[b]) {
            remapped.set(left, right, Some(border));
        }
    }

    Merged {
        labels,
        centers,
        borders: remapped,
        merges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Three peaks on a line with saddles of the given densities between
    /// neighbours, all errors `err`.
    fn three_peaks(peaks: [f64; 3], saddles: [f64; 2], err: f64, z: f64) -> (Vec<PointInfo>, Peaks, Borders) {
        let mut points: Vec<PointInfo> = peaks
            .iter()
            .chain(saddles.iter())
            .map(|&log_rho| PointInfo::new(5, log_rho, err, z))
            .collect();
        points[3].nearest_denser = Some(0);
        points[4].nearest_denser = Some(2);
        let peaks_found = crate::peaks::discover_peaks(&points);
        let mut borders = Borders::new(peaks_found.cluster_count(), false);
        for (cluster, &center) in peaks_found.centers().iter().enumerate() {
            borders.set(cluster, cluster, Some(Border::of(center, &points[center])));
        }
        let id = |point: usize| peaks_found.label(point).unwrap_or(usize::MAX);
        borders.set(id(0), id(1), Some(Border::of(3, &points[3])));
        borders.set(id(1), id(2), Some(Border::of(4, &points[4])));
        (points, peaks_found, borders)
    }

    #[test]
    fn zero_confidence_keeps_low_saddles() {
        let (points, peaks, borders) = three_peaks([5.0, 4.0, 6.0], [1.0, 2.0], 0.3, 0.0);

        let merged = merge_peaks(&points, &peaks, borders, 0.0);

        assert_eq!(merged.cluster_count(), 3);
        assert_eq!(merged.merges(), 0);
    }

    #[test]
    fn large_confidence_merges_connected_clusters() {
        let z = 50.0;
        let (points, peaks, borders) = three_peaks([5.0, 4.0, 6.0], [1.0, 2.0], 0.3, z);

        let merged = merge_peaks(&points, &peaks, borders, z);

        assert_eq!(merged.cluster_count(), 1);
        assert_eq!(merged.centers(), &[2]);
        assert!(merged.labels().iter().all(|label| *label == Some(0)));
        assert!(merged.borders().iter_pairs().is_empty());
        assert_eq!(merged.borders().get(0, 0).map(|border| border.point), Some(2));
    }

    #[rstest]
    #[case::dense(false)]
    #[case::sparse(true)]
    fn only_the_shallow_saddle_merges(#[case] sparse: bool) {
        let z = 1.0;
        let (points, peaks, dense) = three_peaks([5.0, 4.0, 6.0], [1.0, 3.9], 0.3, z);
        let mut borders = Borders::new(peaks.cluster_count(), sparse);
        for (a, b, border) in dense.iter_pairs() {
            borders.set(a, b, Some(border));
        }
        for cluster in 0..peaks.cluster_count() {
            borders.set(cluster, cluster, dense.get(cluster, cluster));
        }

        let merged = merge_peaks(&points, &peaks, borders, z);

        assert_eq!(merged.cluster_count(), 2);
        assert_eq!(merged.centers(), &[2, 0]);
        assert_eq!(merged.labels()[1], merged.labels()[2]);
        assert_ne!(merged.labels()[0], merged.labels()[1]);
        let saddle = merged.borders().get(0, 1).map(|border| border.point);
        assert_eq!(saddle, Some(3));
        assert_eq!(merged.borders().is_sparse(), sparse);
    }

    #[test]
    fn surviving_pairs_are_significant() {
        let z = 1.5;
        let (points, peaks, borders) = three_peaks([5.0, 4.0, 6.0], [3.0, 2.5], 0.4, z);

        let merged = merge_peaks(&points, &peaks, borders, z);

        for (a, b, border) in merged.borders().iter_pairs() {
            let lower_a = points[merged.centers()[a]].log_rho_c;
            let lower_b = points[merged.centers()[b]].log_rho_c;
            assert!(merge_strength(lower_a, lower_b, &border, z) >= 0.0);
        }
    }

    #[test]
    fn candidates_pop_weakest_first() {
        let mut heap = BinaryHeap::new();
        for (strength, low, high) in [(-0.5, 0, 1), (-2.0, 1, 2), (-2.0, 0, 3)] {
            heap.push(Candidate {
                strength,
                low,
                high,
                versions: (0, 0),
            });
        }

        let order: Vec<(usize, usize)> = std::iter::from_fn(|| heap.pop())
            .map(|candidate| (candidate.low, candidate.high))
            .collect();

        assert_eq!(order, vec![(0, 3), (1, 2), (0, 1)]);
    }
}
