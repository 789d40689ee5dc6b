//! Clustering orchestration.
//!
//! [`Dadac`] runs the pipeline: neighbourhoods, intrinsic dimension,
//! densities, peak discovery, border detection, merging and halo. Inputs are
//! a [`DataSource`], any [`NeighbourProvider`], pre-built
//! [`Neighbourhoods`], or a [`PixelGrid`].

use std::{
    borrow::Cow,
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{Span, debug, field, info, instrument, warn};

use crate::{
    Result,
    borders::{BorderStorage, detect_borders},
    builder::{Settings, validate_neighbours},
    datasource::DataSource,
    density::{DensityField, DensityParams, estimate_densities},
    dimension::estimate_intrinsic_dimension,
    error::{DadacError, NumericFault},
    halo::{HaloLabelling, find_halo},
    image::{GridNeighbours, ImageDensity, PixelGrid, estimate_image_densities},
    memory::{estimate_peak_bytes, format_bytes},
    merge::merge_peaks,
    neighbourhood::{ExactNeighbours, NeighbourProvider, Neighbourhoods, RowLength},
    peaks::discover_peaks,
    result::{Assignment, ClusteringResult, StageTimings},
};

/// What a run clusters.
#[derive(Clone, Copy)]
enum Input<'a> {
    Provider(&'a (dyn NeighbourProvider + Sync)),
    Rows(&'a Neighbourhoods),
    Image(&'a PixelGrid),
}

impl Input<'_> {
    fn name(&self) -> &str {
        match self {
            Self::Provider(provider) => provider.name(),
            Self::Rows(_) => "neighbourhoods",
            Self::Image(grid) => grid.name(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Provider(provider) => provider.len(),
            Self::Rows(neighbourhoods) => neighbourhoods.len(),
            Self::Image(grid) => grid.len(),
        }
    }

    const fn mode(&self) -> &'static str {
        match self {
            Self::Provider(_) => "points",
            Self::Rows(_) => "rows",
            Self::Image(_) => "image",
        }
    }
}

/// Entry point for running the clustering pipeline.
///
/// # Examples
/// ```
/// use dadac_core::{DadacBuilder, DataSource, DataSourceError};
///
/// struct Line(Vec<f64>);
///
/// impl DataSource for Line {
///     fn len(&self) -> usize { self.0.len() }
///     fn name(&self) -> &str { "line" }
///     fn squared_distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError> {
///         let a = self.0.get(i).ok_or(DataSourceError::OutOfBounds { index: i })?;
///         let b = self.0.get(j).ok_or(DataSourceError::OutOfBounds { index: j })?;
///         Ok((a - b) * (a - b))
///     }
/// }
///
/// let values: Vec<f64> = (0..40).map(|i| f64::from(i) * 0.1).collect();
/// let dadac = DadacBuilder::new().with_neighbours(10).with_dimension(1.0).build()?;
/// let result = dadac.run(&Line(values))?;
/// assert_eq!(result.points().len(), 40);
/// assert!(result.cluster_count() >= 1);
/// # Ok::<(), dadac_core::DadacError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Dadac {
    settings: Settings,
}

impl Dadac {
    pub(crate) const fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Neighbours per point, the point itself included.
    #[rustfmt::skip]
    #[must_use]
    pub fn neighbours(&self) -> usize { self.settings.neighbours }

    /// Confidence scalar `Z`.
    #[rustfmt::skip]
    #[must_use]
    pub fn z(&self) -> f64 { self.settings.z }

    /// Whether halo assignment runs.
    #[rustfmt::skip]
    #[must_use]
    pub fn halo(&self) -> bool { self.settings.halo }

    /// How halo points are reported.
    #[rustfmt::skip]
    #[must_use]
    pub fn halo_labelling(&self) -> HaloLabelling { self.settings.halo_labelling }

    /// Requested border table layout.
    #[rustfmt::skip]
    #[must_use]
    pub fn border_storage(&self) -> BorderStorage { self.settings.border_storage }

    /// Dense border table budget used by [`BorderStorage::Auto`].
    #[rustfmt::skip]
    #[must_use]
    pub fn border_budget_bytes(&self) -> u64 { self.settings.border_budget_bytes }

    /// Fixed intrinsic dimension, if any.
    #[rustfmt::skip]
    #[must_use]
    pub fn dimension(&self) -> Option<f64> { self.settings.dimension }

    /// Critical value of the scale-selection test.
    #[rustfmt::skip]
    #[must_use]
    pub fn likelihood_threshold(&self) -> f64 { self.settings.likelihood_threshold }

    /// Image density window radius in pixels.
    #[rustfmt::skip]
    #[must_use]
    pub fn window_radius(&self) -> usize { self.settings.window_radius }

    /// How image density windows are measured.
    #[rustfmt::skip]
    #[must_use]
    pub fn image_density(&self) -> ImageDensity { self.settings.image_density }

    /// Dedicated worker count, if any.
    #[rustfmt::skip]
    #[must_use]
    pub fn threads(&self) -> Option<usize> { self.settings.threads }

    /// Memory limit in bytes, if any.
    #[rustfmt::skip]
    #[must_use]
    pub fn max_bytes(&self) -> Option<u64> { self.settings.max_bytes }

    /// Clusters a point cloud using exact nearest neighbours.
    ///
    /// # Errors
    /// Returns [`DadacError::EmptySource`] for an empty source,
    /// [`DadacError::InsufficientData`] when it holds no more points than the
    /// neighbour count, [`DadacError::MemoryLimitExceeded`] when the memory
    /// guard trips, [`DadacError::DataSource`] when a distance cannot be read
    /// and [`DadacError::NumericFailure`] when the intrinsic dimension or
    /// every density is degenerate.
    pub fn run<D>(&self, source: &D) -> Result<ClusteringResult>
    where
        D: DataSource + Sync + ?Sized,
    {
        debug!(
            data_source = source.name(),
            dimensions = ?source.dimensions(),
            "searching exact neighbours"
        );
        self.run_provider(&ExactNeighbours::new(source))
    }

    /// Clusters the points of a custom neighbour provider.
    ///
    /// # Errors
    /// As [`Self::run`], plus [`DadacError::InconsistentNeighbourhood`] when
    /// the provider returns a malformed row.
    pub fn run_provider<P>(&self, provider: &P) -> Result<ClusteringResult>
    where
        P: NeighbourProvider + Sync,
    {
        self.in_pool(|| self.execute(Input::Provider(provider)))
    }

    /// Clusters pre-computed neighbourhoods. Their row length is used as the
    /// neighbour count.
    ///
    /// # Errors
    /// Returns [`DadacError::InvalidNeighbourCount`] when rows hold four
    /// entries or fewer, plus the errors of [`Self::run`].
    pub fn run_neighbourhoods(&self, neighbourhoods: &Neighbourhoods) -> Result<ClusteringResult> {
        self.in_pool(|| self.execute(Input::Rows(neighbourhoods)))
    }

    /// Clusters the unmasked pixels of an image.
    ///
    /// # Errors
    /// Returns [`DadacError::NumericFailure`] when every pixel is masked,
    /// plus the size and memory errors of [`Self::run`].
    ///
    /// # Examples
    /// ```
    /// use dadac_core::{DadacBuilder, PixelGrid};
    ///
    /// let grid = PixelGrid::unmasked(12, 12, vec![1.0; 144])?;
    /// let dadac = DadacBuilder::new().with_neighbours(9).with_window_radius(2).build()?;
    /// let result = dadac.run_image(&grid)?;
    /// assert_eq!(result.points().len(), 144);
    /// assert_eq!(result.intrinsic_dimension(), 2.0);
    /// # Ok::<(), dadac_core::DadacError>(())
    /// ```
    pub fn run_image(&self, grid: &PixelGrid) -> Result<ClusteringResult> {
        self.in_pool(|| self.execute(Input::Image(grid)))
    }

    fn in_pool<F>(&self, job: F) -> Result<ClusteringResult>
    where
        F: FnOnce() -> Result<ClusteringResult> + Send,
    {
        let Some(threads) = self.settings.threads else {
            return job();
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|error| DadacError::ThreadPool {
                message: error.to_string(),
            })?;
        pool.install(job)
    }

    #[instrument(
        name = "core.run",
        err,
        skip(self, input),
        fields(
            data_source = %input.name(),
            mode = input.mode(),
            points = input.len(),
            neighbours = field::Empty,
            z = self.settings.z,
            clusters = field::Empty,
        ),
    )]
    fn execute(&self, input: Input<'_>) -> Result<ClusteringResult> {
        let name: Arc<str> = Arc::from(input.name());
        let items = input.len();
        let neighbours = match input {
            Input::Rows(neighbourhoods) => {
                validate_neighbours(neighbourhoods.k())?;
                neighbourhoods.k()
            }
            Input::Provider(_) | Input::Image(_) => self.settings.neighbours,
        };
        Span::current().record("neighbours", neighbours);
        self.check_size(&name, items, neighbours)?;

        let mut timings = StageTimings::default();
        let started = Instant::now();
        let neighbourhoods = match input {
            Input::Provider(provider) => {
                Cow::Owned(Neighbourhoods::from_provider(provider, neighbours)?)
            }
            Input::Rows(neighbourhoods) => Cow::Borrowed(neighbourhoods),
            Input::Image(grid) => {
                let provider = GridNeighbours::new(grid, self.settings.window_radius, neighbours);
                Cow::Owned(Neighbourhoods::collect(
                    &provider,
                    RowLength::AtMost(neighbours),
                )?)
            }
        };
        timings.neighbours = started.elapsed();

        let started = Instant::now();
        let field = match input {
            Input::Image(grid) => estimate_image_densities(
                grid,
                &neighbourhoods,
                self.settings.window_radius,
                self.settings.image_density,
                self.settings.z,
            )
            .map_err(|fault| numeric(&name, fault))?,
            Input::Provider(_) | Input::Rows(_) => {
                self.estimate_point_densities(&name, &neighbourhoods)?
            }
        };
        timings.density = started.elapsed();

        let result = self.cluster(&name, &neighbourhoods, &field, timings)?;
        Span::current().record("clusters", result.cluster_count());
        info!(
            clusters = result.cluster_count(),
            peaks = result.peak_count(),
            halo = result.halo_count(),
            excluded = result.excluded_count(),
            "clustering completed"
        );
        Ok(result)
    }

    fn check_size(&self, name: &Arc<str>, items: usize, neighbours: usize) -> Result<()> {
        if items == 0 {
            warn!(data_source = %name, "data source is empty, returning error");
            return Err(DadacError::EmptySource {
                data_source: Arc::clone(name),
            });
        }
        if items <= neighbours {
            return Err(DadacError::InsufficientData {
                data_source: Arc::clone(name),
                items,
                neighbours,
            });
        }
        if let Some(limit) = self.settings.max_bytes {
            let estimated = estimate_peak_bytes(items, neighbours);
            debug!(
                estimated = %format_bytes(estimated),
                limit = %format_bytes(limit),
                "memory estimate"
            );
            if estimated > limit {
                return Err(DadacError::MemoryLimitExceeded { estimated, limit });
            }
        }
        Ok(())
    }

    fn estimate_point_densities(
        &self,
        name: &Arc<str>,
        neighbourhoods: &Neighbourhoods,
    ) -> Result<DensityField> {
        let dimension = match self.settings.dimension {
            Some(dimension) => dimension,
            None => estimate_intrinsic_dimension(neighbourhoods)
                .map_err(|fault| numeric(name, fault))?
                .dimension(),
        };
        Ok(estimate_densities(
            neighbourhoods,
            DensityParams {
                dimension,
                z: self.settings.z,
                likelihood_threshold: self.settings.likelihood_threshold,
            },
        ))
    }

    fn cluster(
        &self,
        name: &Arc<str>,
        neighbourhoods: &Neighbourhoods,
        field: &DensityField,
        mut timings: StageTimings,
    ) -> Result<ClusteringResult> {
        if field.is_degenerate() {
            return Err(numeric(name, NumericFault::AllPointsExcluded));
        }
        let points = field.points();

        let started = Instant::now();
        let peaks = discover_peaks(points);
        timings.peaks = started.elapsed();

        let started = Instant::now();
        let sparse = self
            .settings
            .border_storage
            .is_sparse_for(peaks.cluster_count(), self.settings.border_budget_bytes);
        let borders = detect_borders(neighbourhoods, points, &peaks, sparse);
        timings.borders = started.elapsed();

        let started = Instant::now();
        let merged = merge_peaks(points, &peaks, borders, self.settings.z);
        let halo = if self.settings.halo {
            find_halo(points, merged.labels(), merged.borders())
        } else {
            vec![false; points.len()]
        };
        timings.merging = started.elapsed();
        log_timings(&timings);

        let (labels, centers, borders) = merged.into_parts();
        Ok(ClusteringResult::assemble(
            Assignment {
                points,
                labels,
                halo,
                keep_halo_labels: self.settings.halo_labelling == HaloLabelling::Flag,
            },
            centers,
            borders,
            field.dimension(),
            peaks.cluster_count(),
            field.excluded(),
            timings,
        ))
    }
}

fn numeric(name: &Arc<str>, fault: NumericFault) -> DadacError {
    DadacError::NumericFailure {
        data_source: Arc::clone(name),
        fault,
    }
}

fn log_timings(timings: &StageTimings) {
    let millis = |duration: Duration| duration.as_secs_f64() * 1e3;
    debug!(
        neighbours_ms = millis(timings.neighbours),
        density_ms = millis(timings.density),
        peaks_ms = millis(timings.peaks),
        borders_ms = millis(timings.borders),
        merging_ms = millis(timings.merging),
        "stage timings"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DadacBuilder, ErrorKind,
        test_utils::{PointCloud, neighbourhoods_for},
    };
    use rstest::rstest;

    fn two_lines() -> PointCloud {
        let mut points: Vec<Vec<f64>> = (0..30).map(|i| vec![f64::from(i) * 0.1, 0.0]).collect();
        points.extend((0..30).map(|i| vec![f64::from(i) * 0.1, 50.0]));
        PointCloud::new(points)
    }

    #[rstest]
    #[case::empty(PointCloud::new(Vec::new()), ErrorKind::InsufficientData, "DADAC_EMPTY_SOURCE")]
    #[case::too_few(
        PointCloud::new((0..8).map(|i| vec![f64::from(i)]).collect()),
        ErrorKind::InsufficientData,
        "DADAC_INSUFFICIENT_DATA"
    )]
    fn rejects_small_inputs(
        #[case] cloud: PointCloud,
        #[case] kind: ErrorKind,
        #[case] code: &str,
    ) {
        let dadac = DadacBuilder::new()
            .with_neighbours(8)
            .build()
            .expect("settings are valid");

        let err = dadac.run(&cloud).expect_err("input is too small");

        assert_eq!(err.code().as_str(), code);
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn memory_guard_rejects_large_runs() {
        let dadac = DadacBuilder::new()
            .with_neighbours(10)
            .with_max_bytes(64)
            .build()
            .expect("settings are valid");

        let err = dadac.run(&two_lines()).expect_err("limit is tiny");

        assert!(matches!(err, DadacError::MemoryLimitExceeded { limit: 64, .. }));
    }

    #[test]
    fn rows_with_few_entries_are_rejected() {
        let neighbourhoods = neighbourhoods_for((0..10).map(|i| vec![f64::from(i)]).collect(), 4);
        let dadac = DadacBuilder::new().build().expect("defaults are valid");

        let err = dadac
            .run_neighbourhoods(&neighbourhoods)
            .expect_err("four entries are too few");

        assert!(matches!(err, DadacError::InvalidNeighbourCount { got: 4 }));
    }

    #[test]
    fn separated_groups_do_not_share_clusters() {
        let dadac = DadacBuilder::new()
            .with_neighbours(10)
            .with_dimension(1.0)
            .with_z(1.0)
            .build()
            .expect("settings are valid");

        let result = dadac.run(&two_lines()).expect("run succeeds");

        let labels = result.cluster_indices();
        for left in 0..30 {
            for right in 30..60 {
                if labels[left] >= 0 && labels[right] >= 0 {
                    assert_ne!(labels[left], labels[right]);
                }
            }
        }
        assert!(result.cluster_count() >= 2);
    }

    #[test]
    fn dedicated_pool_matches_global_pool() {
        let builder = DadacBuilder::new().with_neighbours(10).with_dimension(1.0);
        let global = builder.clone().build().expect("valid");
        let pooled = builder.with_threads(2).build().expect("valid");

        let expected = global.run(&two_lines()).expect("run succeeds");
        let actual = pooled.run(&two_lines()).expect("run succeeds");

        assert_eq!(actual.cluster_indices(), expected.cluster_indices());
        assert_eq!(actual.centers(), expected.centers());
    }

    #[test]
    fn fully_masked_image_is_a_numeric_failure() {
        let grid = PixelGrid::try_new(4, 4, vec![1.0; 16], vec![0; 16]).expect("shape is valid");
        let dadac = DadacBuilder::new()
            .with_neighbours(5)
            .with_window_radius(1)
            .build()
            .expect("valid");

        let err = dadac.run_image(&grid).expect_err("nothing to cluster");

        assert_eq!(err.kind(), ErrorKind::NumericFailure);
    }
}
