//! Result types for clustering runs.
//!
//! A [`ClusteringResult`] owns the per-point records, the final clusters and
//! the saddles between them. Member lists are built on first use.

use std::{sync::OnceLock, time::Duration};

use crate::{
    borders::{BorderStore, Borders},
    point::PointInfo,
};

/// Identifier assigned to a final cluster.
///
/// # Examples
/// ```
/// use dadac_core::ClusterId;
///
/// let id = ClusterId::new(4);
/// assert_eq!(id.get(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(usize);

impl ClusterId {
    /// Creates a cluster identifier.
    #[rustfmt::skip]
    #[must_use]
    pub const fn new(id: usize) -> Self { Self(id) }

    /// Returns the underlying numeric identifier.
    #[rustfmt::skip]
    #[must_use]
    pub const fn get(self) -> usize { self.0 }
}

/// Final state of one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointRecord {
    /// Adaptive neighbourhood size.
    pub kstar: usize,
    /// Final cluster, or `None` for excluded points and noise-labelled halo.
    pub cluster: Option<ClusterId>,
    /// Log density.
    pub log_rho: f64,
    /// Log density lowered by `Z` standard errors.
    pub log_rho_c: f64,
    /// Standard error of the log density.
    pub log_rho_err: f64,
    /// Merging score `log_rho_c - log_rho_err`.
    pub g: f64,
    /// Nearest denser point, `None` for peaks and excluded points.
    pub nearest_denser: Option<usize>,
    /// Whether the point is the center of a final cluster.
    pub is_center: bool,
    /// Whether the point lies below its cluster's highest saddle.
    pub is_halo: bool,
}

impl PointRecord {
    /// Cluster id as written by the driver: `-1` when unassigned.
    ///
    /// # Examples
    /// ```
    /// use dadac_core::{ClusterId, PointRecord};
    ///
    /// let mut record = PointRecord {
    ///     kstar: 4, cluster: Some(ClusterId::new(2)), log_rho: 0.0, log_rho_c: 0.0,
    ///     log_rho_err: 0.0, g: 0.0, nearest_denser: None, is_center: true, is_halo: false,
    /// };
    /// assert_eq!(record.cluster_index(), 2);
    /// record.cluster = None;
    /// assert_eq!(record.cluster_index(), -1);
    /// ```
    #[must_use]
    pub fn cluster_index(&self) -> i64 {
        self.cluster
            .and_then(|id| i64::try_from(id.get()).ok())
            .unwrap_or(-1)
    }

    /// Returns whether the point took no part in clustering.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        !self.log_rho.is_finite()
    }
}

/// Saddle between a cluster and one of its neighbours.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BorderEntry {
    /// The neighbouring cluster.
    pub other: ClusterId,
    /// Saddle point index.
    pub saddle_point: usize,
    /// Saddle `log_rho_c`.
    pub density: f64,
    /// Saddle standard error.
    pub error: f64,
}

/// Wall-clock time spent in each stage of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageTimings {
    /// Neighbour search or grid stencil.
    pub neighbours: Duration,
    /// Intrinsic dimension, densities and nearest-denser links.
    pub density: Duration,
    /// Peak discovery.
    pub peaks: Duration,
    /// Border detection.
    pub borders: Duration,
    /// Peak merging and halo.
    pub merging: Duration,
}

/// Output of a [`crate::Dadac`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringResult {
    points: Vec<PointRecord>,
    centers: Vec<usize>,
    borders: Borders,
    dimension: f64,
    peak_count: usize,
    excluded: usize,
    timings: StageTimings,
    members: OnceLock<Vec<Vec<usize>>>,
}

/// Per-point outcome of clustering handed to [`ClusteringResult::assemble`].
pub(crate) struct Assignment<'a> {
    pub(crate) points: &'a [PointInfo],
    pub(crate) labels: Vec<Option<usize>>,
    pub(crate) halo: Vec<bool>,
    pub(crate) keep_halo_labels: bool,
}

impl ClusteringResult {
    pub(crate) fn assemble(
        assignment: Assignment<'_>,
        centers: Vec<usize>,
        borders: Borders,
        dimension: f64,
        peak_count: usize,
        excluded: usize,
        timings: StageTimings,
    ) -> Self {
        let mut is_center = vec![false; assignment.points.len()];
        for &center in &centers {
            is_center[center] = true;
        }
        let points = assignment
            .points
            .iter()
            .zip(assignment.labels)
            .zip(assignment.halo)
            .zip(is_center)
            .map(|(((info, label), is_halo), center)| {
                let cluster = label
                    .filter(|_| assignment.keep_halo_labels || !is_halo)
                    .map(ClusterId::new);
                PointRecord {
                    kstar: info.kstar,
                    cluster,
                    log_rho: info.log_rho,
                    log_rho_c: info.log_rho_c,
                    log_rho_err: info.log_rho_err,
                    g: info.g(),
                    nearest_denser: info.nearest_denser,
                    is_center: center,
                    is_halo,
                }
            })
            .collect();
        Self {
            points,
            centers,
            borders,
            dimension,
            peak_count,
            excluded,
            timings,
            members: OnceLock::new(),
        }
    }

    /// Per-point records in input order.
    #[rustfmt::skip]
    #[must_use]
    pub fn points(&self) -> &[PointRecord] { &self.points }

    /// Number of final clusters.
    #[rustfmt::skip]
    #[must_use]
    pub fn cluster_count(&self) -> usize { self.centers.len() }

    /// Center point of every final cluster, indexed by cluster id.
    #[rustfmt::skip]
    #[must_use]
    pub fn centers(&self) -> &[usize] { &self.centers }

    /// Intrinsic dimension used for the density estimates.
    #[rustfmt::skip]
    #[must_use]
    pub fn intrinsic_dimension(&self) -> f64 { self.dimension }

    /// Number of peaks found before merging.
    #[rustfmt::skip]
    #[must_use]
    pub fn peak_count(&self) -> usize { self.peak_count }

    /// Number of points excluded for a non-finite density.
    #[rustfmt::skip]
    #[must_use]
    pub fn excluded_count(&self) -> usize { self.excluded }

    /// Time spent in each stage.
    #[rustfmt::skip]
    #[must_use]
    pub fn timings(&self) -> StageTimings { self.timings }

    /// Saddle store between final clusters, centers on the diagonal.
    #[rustfmt::skip]
    #[must_use]
    pub fn border_store(&self) -> &Borders { &self.borders }

    /// Number of points flagged as halo.
    #[must_use]
    pub fn halo_count(&self) -> usize {
        self.points.iter().filter(|point| point.is_halo).count()
    }

    /// Cluster index of every point, `-1` when unassigned.
    #[must_use]
    pub fn cluster_indices(&self) -> Vec<i64> {
        self.points.iter().map(PointRecord::cluster_index).collect()
    }

    /// Points assigned to `cluster`, ascending. Empty for unknown ids.
    #[must_use]
    pub fn members(&self, cluster: ClusterId) -> &[usize] {
        self.member_lists()
            .get(cluster.get())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of assigned points per cluster.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.member_lists().iter().map(Vec::len).collect()
    }

    /// Saddles between `cluster` and each neighbouring cluster, ascending by
    /// neighbour id.
    ///
    /// # Examples
    /// ```
    /// use dadac_core::{ClusterId, DadacBuilder, Neighbour, Neighbourhoods};
    ///
    /// # let rows: Vec<Vec<Neighbour>> = (0..8_usize)
    /// #     .map(|i| {
    /// #         let mut row: Vec<Neighbour> = (0..8_usize)
    /// #             .map(|j| Neighbour::new(j, (i as f64 - j as f64).powi(2)))
    /// #             .collect();
    /// #         row.sort();
    /// #         row.truncate(6);
    /// #         row
    /// #     })
    /// #     .collect();
    /// let dadac = DadacBuilder::new().with_neighbours(6).with_dimension(1.0).build()?;
    /// let neighbourhoods = Neighbourhoods::try_from_rows(rows, 6)?;
    /// let result = dadac.run_neighbourhoods(&neighbourhoods)?;
    /// for cluster in 0..result.cluster_count() {
    ///     for entry in result.borders(ClusterId::new(cluster)) {
    ///         assert_ne!(entry.other.get(), cluster);
    ///     }
    /// }
    /// # Ok::<(), dadac_core::DadacError>(())
    /// ```
    #[must_use]
    pub fn borders(&self, cluster: ClusterId) -> Vec<BorderEntry> {
        self.borders
            .neighbours(cluster.get())
            .into_iter()
            .map(|(other, border)| BorderEntry {
                other: ClusterId::new(other),
                saddle_point: border.point,
                density: border.density,
                error: border.error,
            })
            .collect()
    }

    fn member_lists(&self) -> &[Vec<usize>] {
        self.members.get_or_init(|| {
            let mut lists = vec![Vec::new(); self.centers.len()];
            for (point, record) in self.points.iter().enumerate() {
                if let Some(list) = record.cluster.and_then(|id| lists.get_mut(id.get())) {
                    list.push(point);
                }
            }
            lists
        })
    }
}
