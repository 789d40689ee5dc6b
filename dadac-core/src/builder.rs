//! Builder utilities for configuring Dadac runs.
//!
//! Every tunable of the pipeline lives here and is validated once by
//! [`DadacBuilder::build`] before a [`Dadac`] instance exists.

use crate::{
    Result,
    borders::{BorderStorage, DEFAULT_BORDER_BUDGET_BYTES},
    dadac::Dadac,
    density::DEFAULT_LIKELIHOOD_THRESHOLD,
    error::DadacError,
    halo::HaloLabelling,
    image::ImageDensity,
};

/// Smallest accepted neighbour count is one above this.
const MIN_NEIGHBOURS_EXCLUSIVE: usize = 4;

/// Validated configuration shared by every run of a [`Dadac`] instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Settings {
    pub(crate) neighbours: usize,
    pub(crate) z: f64,
    pub(crate) halo: bool,
    pub(crate) halo_labelling: HaloLabelling,
    pub(crate) border_storage: BorderStorage,
    pub(crate) border_budget_bytes: u64,
    pub(crate) dimension: Option<f64>,
    pub(crate) likelihood_threshold: f64,
    pub(crate) window_radius: usize,
    pub(crate) image_density: ImageDensity,
    pub(crate) threads: Option<usize>,
    pub(crate) max_bytes: Option<u64>,
}

/// Configures and constructs [`Dadac`] instances.
///
/// # Examples
/// ```
/// use dadac_core::{BorderStorage, DadacBuilder};
///
/// let dadac = DadacBuilder::new()
///     .with_neighbours(50)
///     .with_z(1.5)
///     .with_sparse_borders(true)
///     .build()?;
/// assert_eq!(dadac.neighbours(), 50);
/// assert_eq!(dadac.z(), 1.5);
/// assert_eq!(dadac.border_storage(), BorderStorage::Sparse);
/// # Ok::<(), dadac_core::DadacError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DadacBuilder {
    settings: Settings,
}

impl Default for DadacBuilder {
    fn default() -> Self {
        Self {
            settings: Settings {
                neighbours: 1001,
                z: 2.0,
                halo: true,
                halo_labelling: HaloLabelling::Noise,
                border_storage: BorderStorage::Auto,
                border_budget_bytes: DEFAULT_BORDER_BUDGET_BYTES,
                dimension: None,
                likelihood_threshold: DEFAULT_LIKELIHOOD_THRESHOLD,
                window_radius: 15,
                image_density: ImageDensity::Occupancy,
                threads: None,
                max_bytes: None,
            },
        }
    }
}

impl DadacBuilder {
    /// Creates a builder populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use dadac_core::DadacBuilder;
    ///
    /// let builder = DadacBuilder::new();
    /// assert_eq!(builder.neighbours(), 1001);
    /// assert_eq!(builder.z(), 2.0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of neighbours per point, the point itself included.
    #[must_use]
    pub fn with_neighbours(mut self, neighbours: usize) -> Self {
        self.settings.neighbours = neighbours;
        self
    }

    /// Returns the configured neighbour count.
    #[rustfmt::skip]
    #[must_use]
    pub fn neighbours(&self) -> usize { self.settings.neighbours }

    /// Confidence scalar `Z`; larger values merge more peaks.
    #[must_use]
    pub fn with_z(mut self, z: f64) -> Self {
        self.settings.z = z;
        self
    }

    /// Returns the configured confidence scalar.
    #[rustfmt::skip]
    #[must_use]
    pub fn z(&self) -> f64 { self.settings.z }

    /// Enables or disables halo assignment.
    #[must_use]
    pub fn with_halo(mut self, halo: bool) -> Self {
        self.settings.halo = halo;
        self
    }

    /// Chooses how halo points are reported.
    ///
    /// # Examples
    /// ```
    /// use dadac_core::{DadacBuilder, HaloLabelling};
    ///
    /// let dadac = DadacBuilder::new().with_halo_labelling(HaloLabelling::Flag).build()?;
    /// assert_eq!(dadac.halo_labelling(), HaloLabelling::Flag);
    /// # Ok::<(), dadac_core::DadacError>(())
    /// ```
    #[must_use]
    pub fn with_halo_labelling(mut self, labelling: HaloLabelling) -> Self {
        self.settings.halo_labelling = labelling;
        self
    }

    /// Selects the border table layout.
    #[must_use]
    pub fn with_border_storage(mut self, storage: BorderStorage) -> Self {
        self.settings.border_storage = storage;
        self
    }

    /// Forces sparse (`true`) or dense (`false`) border tables.
    #[must_use]
    pub fn with_sparse_borders(self, sparse: bool) -> Self {
        self.with_border_storage(if sparse {
            BorderStorage::Sparse
        } else {
            BorderStorage::Dense
        })
    }

    /// Largest dense border table, in bytes, that [`BorderStorage::Auto`]
    /// accepts before switching to sparse maps.
    #[must_use]
    pub fn with_border_budget_bytes(mut self, bytes: u64) -> Self {
        self.settings.border_budget_bytes = bytes;
        self
    }

    /// Fixes the intrinsic dimension instead of estimating it.
    #[must_use]
    pub fn with_dimension(mut self, dimension: f64) -> Self {
        self.settings.dimension = Some(dimension);
        self
    }

    /// Critical value of the scale-selection likelihood-ratio test.
    #[must_use]
    pub fn with_likelihood_threshold(mut self, threshold: f64) -> Self {
        self.settings.likelihood_threshold = threshold;
        self
    }

    /// Radius, in pixels, of the image density window.
    #[must_use]
    pub fn with_window_radius(mut self, radius: usize) -> Self {
        self.settings.window_radius = radius;
        self
    }

    /// How image density windows are measured.
    #[must_use]
    pub fn with_image_density(mut self, density: ImageDensity) -> Self {
        self.settings.image_density = density;
        self
    }

    /// Runs on a dedicated pool of `threads` workers; `0` lets rayon decide.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.settings.threads = Some(threads);
        self
    }

    /// Rejects runs whose estimated peak memory exceeds `bytes`.
    ///
    /// # Examples
    /// ```
    /// use dadac_core::DadacBuilder;
    ///
    /// let dadac = DadacBuilder::new().with_max_bytes(1 << 30).build()?;
    /// assert_eq!(dadac.max_bytes(), Some(1 << 30));
    /// # Ok::<(), dadac_core::DadacError>(())
    /// ```
    #[must_use]
    pub fn with_max_bytes(mut self, bytes: u64) -> Self {
        self.settings.max_bytes = Some(bytes);
        self
    }

    /// Validates the configuration and constructs a [`Dadac`] instance.
    ///
    /// # Errors
    /// Returns [`DadacError::InvalidNeighbourCount`] when the neighbour count
    /// is not above four, [`DadacError::InvalidConfidence`] when `z` is
    /// negative or not finite, [`DadacError::InvalidDimension`] when a fixed
    /// dimension is not a positive finite value,
    /// [`DadacError::InvalidLikelihoodThreshold`] for a non-positive or
    /// non-finite threshold and [`DadacError::InvalidWindowRadius`] for a
    /// zero radius.
    ///
    /// # Examples
    /// ```
    /// use dadac_core::{DadacBuilder, DadacError};
    ///
    /// let err = DadacBuilder::new().with_neighbours(3).build().unwrap_err();
    /// assert!(matches!(err, DadacError::InvalidNeighbourCount { got: 3 }));
    /// ```
    pub fn build(self) -> Result<Dadac> {
        let settings = self.settings;
        if settings.neighbours <= MIN_NEIGHBOURS_EXCLUSIVE {
            return Err(DadacError::InvalidNeighbourCount {
                got: settings.neighbours,
            });
        }
        if !settings.z.is_finite() || settings.z < 0.0 {
            return Err(DadacError::InvalidConfidence { got: settings.z });
        }
        if let Some(dimension) = settings.dimension {
            if !dimension.is_finite() || dimension <= 0.0 {
                return Err(DadacError::InvalidDimension { got: dimension });
            }
        }
        if !settings.likelihood_threshold.is_finite() || settings.likelihood_threshold <= 0.0 {
            return Err(DadacError::InvalidLikelihoodThreshold {
                got: settings.likelihood_threshold,
            });
        }
        if settings.window_radius == 0 {
            return Err(DadacError::InvalidWindowRadius { got: 0 });
        }
        Ok(Dadac::new(settings))
    }
}

/// Checks a neighbour count supplied through pre-built neighbourhoods.
pub(crate) fn validate_neighbours(neighbours: usize) -> Result<()> {
    if neighbours <= MIN_NEIGHBOURS_EXCLUSIVE {
        return Err(DadacError::InvalidNeighbourCount { got: neighbours });
    }
    Ok(())
}
