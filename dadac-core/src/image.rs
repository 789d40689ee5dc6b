//! Image mode: grid-local neighbourhoods and windowed pixel densities.
//!
//! Pixels are points indexed row-major. Neighbours are the nearest unmasked
//! pixels in row/column space and densities come from a circular window of
//! radius `R`, so no distance search or dimension estimate is needed.

use std::{f64::consts::PI, sync::Arc};

use rayon::prelude::*;
use tracing::{field, instrument};

use crate::{
    density::{DensityField, record_exclusions},
    error::{DadacError, DataSourceError, NumericFault, Result},
    neighbourhood::{Neighbour, NeighbourProvider, Neighbourhoods},
    point::PointInfo,
};

/// How the density window of a pixel is measured.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ImageDensity {
    /// Count the unmasked pixels inside the window.
    #[default]
    Occupancy,
    /// Sum the values of the unmasked pixels inside the window.
    Intensity,
}

/// A 2-D image with a validity mask (`0` masked, anything else valid).
///
/// # Examples
/// ```
/// use dadac_core::PixelGrid;
///
/// let grid = PixelGrid::try_new(2, 3, vec![1.0; 6], vec![1, 1, 0, 1, 1, 1])?;
/// assert_eq!(grid.len(), 6);
/// assert!(!grid.is_valid(2));
/// assert_eq!(grid.valid_count(), 5);
/// # Ok::<(), dadac_core::DadacError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PixelGrid {
    name: Arc<str>,
    rows: usize,
    cols: usize,
    values: Vec<f64>,
    mask: Vec<i32>,
}

impl PixelGrid {
    /// Builds a grid from row-major values and mask.
    ///
    /// # Errors
    /// Returns [`DadacError::ImageShapeMismatch`] when either buffer does not
    /// hold `rows * cols` entries.
    pub fn try_new(rows: usize, cols: usize, values: Vec<f64>, mask: Vec<i32>) -> Result<Self> {
        let cells = rows.checked_mul(cols);
        if cells != Some(values.len()) || cells != Some(mask.len()) {
            return Err(DadacError::ImageShapeMismatch {
                rows,
                cols,
                values: values.len(),
                mask: mask.len(),
            });
        }
        Ok(Self {
            name: Arc::from("image"),
            rows,
            cols,
            values,
            mask,
        })
    }

    /// Builds a grid whose pixels are all valid.
    ///
    /// # Errors
    /// See [`Self::try_new`].
    pub fn unmasked(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        let mask = vec![1; values.len()];
        Self::try_new(rows, cols, values, mask)
    }

    /// Renames the grid for logs and errors.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of rows.
    #[rustfmt::skip]
    #[must_use]
    pub fn rows(&self) -> usize { self.rows }

    /// Number of columns.
    #[rustfmt::skip]
    #[must_use]
    pub fn cols(&self) -> usize { self.cols }

    /// Total number of pixels.
    #[rustfmt::skip]
    #[must_use]
    pub fn len(&self) -> usize { self.values.len() }

    /// Returns whether the grid has no pixels.
    #[rustfmt::skip]
    #[must_use]
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Name used in logs and errors.
    #[rustfmt::skip]
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Returns whether `pixel` is unmasked.
    #[must_use]
    pub fn is_valid(&self, pixel: usize) -> bool {
        self.mask.get(pixel).is_some_and(|&flag| flag != 0)
    }

    /// Number of unmasked pixels.
    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&flag| flag != 0).count()
    }

    /// Value of `pixel`.
    #[must_use]
    pub fn value(&self, pixel: usize) -> Option<f64> {
        self.values.get(pixel).copied()
    }

    /// Row and column of `pixel`.
    #[must_use]
    pub const fn position(&self, pixel: usize) -> (usize, usize) {
        (pixel / self.cols, pixel % self.cols)
    }

    fn offset(&self, row: usize, col: usize, dr: isize, dc: isize) -> Option<usize> {
        let r = row.checked_add_signed(dr).filter(|&r| r < self.rows)?;
        let c = col.checked_add_signed(dc).filter(|&c| c < self.cols)?;
        Some(r * self.cols + c)
    }
}

/// Pixel offsets sorted by distance, then row offset, then column offset.
#[derive(Clone, Debug)]
struct Stencil {
    offsets: Vec<(isize, isize, usize)>,
}

impl Stencil {
    fn disk(radius: usize) -> Self {
        let reach = isize::try_from(radius).unwrap_or(isize::MAX);
        let limit = radius.saturating_mul(radius);
        let mut offsets: Vec<(isize, isize, usize)> = (-reach..=reach)
            .flat_map(|dr| (-reach..=reach).map(move |dc| (dr, dc)))
            .map(|(dr, dc)| (dr, dc, dr.unsigned_abs().pow(2) + dc.unsigned_abs().pow(2)))
            .filter(|&(_, _, sq)| sq <= limit)
            .collect();
        offsets.sort_unstable_by_key(|&(dr, dc, sq)| (sq, dr, dc));
        Self { offsets }
    }

    /// Smallest disk holding at least `cells` offsets, never below `radius`.
    fn covering(radius: usize, cells: usize) -> Self {
        let mut reach = radius.max(1);
        loop {
            let stencil = Self::disk(reach);
            if stencil.offsets.len() >= cells {
                return stencil;
            }
            reach += 1;
        }
    }
}

/// [`NeighbourProvider`] over the unmasked pixels of a [`PixelGrid`].
///
/// Masked pixels get a row holding only themselves.
#[derive(Clone, Debug)]
pub struct GridNeighbours<'a> {
    grid: &'a PixelGrid,
    stencil: Stencil,
}

impl<'a> GridNeighbours<'a> {
    /// Searches up to `radius` pixels away, widening the search when the disk
    /// holds fewer than `k` cells.
    #[must_use]
    pub fn new(grid: &'a PixelGrid, radius: usize, k: usize) -> Self {
        Self {
            grid,
            stencil: Stencil::covering(radius, k),
        }
    }
}

impl NeighbourProvider for GridNeighbours<'_> {
    fn len(&self) -> usize {
        self.grid.len()
    }

    fn name(&self) -> &str {
        self.grid.name()
    }

    fn find_neighbours(&self, point: usize, k: usize) -> Result<Vec<Neighbour>, DataSourceError> {
        if point >= self.grid.len() {
            return Err(DataSourceError::OutOfBounds { index: point });
        }
        if !self.grid.is_valid(point) {
            return Ok(vec![Neighbour::new(point, 0.0)]);
        }
        let (row, col) = self.grid.position(point);
        Ok(self
            .stencil
            .offsets
            .iter()
            .filter_map(|&(dr, dc, sq)| {
                self.grid
                    .offset(row, col, dr, dc)
                    .filter(|&pixel| self.grid.is_valid(pixel))
                    .map(|pixel| Neighbour::new(pixel, sq as f64))
            })
            .take(k)
            .collect())
    }
}

/// Per-row prefix sums of pixel occupancy and value.
struct RowPrefix {
    cols: usize,
    counts: Vec<usize>,
    sums: Vec<f64>,
}

impl RowPrefix {
    fn new(grid: &PixelGrid) -> Self {
        let stride = grid.cols + 1;
        let mut counts = vec![0; grid.rows * stride];
        let mut sums = vec![0.0; grid.rows * stride];
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let pixel = row * grid.cols + col;
                let (count, value) = if grid.is_valid(pixel) {
                    (1, grid.values[pixel])
                } else {
                    (0, 0.0)
                };
                counts[row * stride + col + 1] = counts[row * stride + col] + count;
                sums[row * stride + col + 1] = sums[row * stride + col] + value;
            }
        }
        Self {
            cols: grid.cols,
            counts,
            sums,
        }
    }

    /// Count and sum over `row`, columns `first..=last`.
    fn segment(&self, row: usize, first: usize, last: usize) -> (usize, f64) {
        let base = row * (self.cols + 1);
        (
            self.counts[base + last + 1] - self.counts[base + first],
            self.sums[base + last + 1] - self.sums[base + first],
        )
    }
}

/// Unmasked pixel count and value sum inside the radius-`radius` disk around
/// `pixel`.
fn window(grid: &PixelGrid, prefix: &RowPrefix, pixel: usize, radius: usize) -> (usize, f64) {
    let (row, col) = grid.position(pixel);
    let first_row = row.saturating_sub(radius);
    let last_row = (row + radius).min(grid.rows - 1);
    (first_row..=last_row).fold((0, 0.0), |(count, sum), r| {
        let dr = r.abs_diff(row);
        let half_width = (radius * radius - dr * dr).isqrt();
        let first = col.saturating_sub(half_width);
        let last = (col + half_width).min(grid.cols - 1);
        let (c, s) = prefix.segment(r, first, last);
        (count + c, sum + s)
    })
}

/// Estimates windowed densities for every pixel and links nearest-denser
/// pixels.
///
/// `log_rho = ln(window) - ln(pi R^2)` where the window is the unmasked pixel
/// count or value sum; the standard error is `1 / sqrt(count)`. Masked pixels
/// and windows with a non-positive sum are excluded.
///
/// # Errors
/// Returns [`NumericFault::AllPixelsMasked`] when no pixel is valid.
#[instrument(
    name = "core.density",
    skip(grid, neighbourhoods),
    fields(points = grid.len(), excluded = field::Empty),
)]
pub(crate) fn estimate_image_densities(
    grid: &PixelGrid,
    neighbourhoods: &Neighbourhoods,
    radius: usize,
    mode: ImageDensity,
    z: f64,
) -> Result<DensityField, NumericFault> {
    if grid.valid_count() == 0 {
        return Err(NumericFault::AllPixelsMasked);
    }
    let prefix = RowPrefix::new(grid);
    let ln_area = (PI * (radius * radius) as f64).ln();
    let max_kstar = neighbourhoods.k().saturating_sub(1).max(1);

    let points: Vec<PointInfo> = (0..grid.len())
        .into_par_iter()
        .map(|pixel| {
            let kstar = neighbourhoods
                .row(pixel)
                .len()
                .saturating_sub(1)
                .clamp(1, max_kstar);
            if !grid.is_valid(pixel) {
                return PointInfo::excluded(kstar);
            }
            let (count, sum) = window(grid, &prefix, pixel, radius);
            let mass = match mode {
                ImageDensity::Occupancy => count as f64,
                ImageDensity::Intensity => sum,
            };
            let log_rho = mass.ln() - ln_area;
            if log_rho.is_finite() {
                PointInfo::new(kstar, log_rho, (count as f64).sqrt().recip(), 0.0)
            } else {
                PointInfo::excluded(kstar)
            }
        })
        .collect();

    let mut field = DensityField::from_points(points, 2.0);
    field.apply_correction(z);
    field.link_nearest_denser(neighbourhoods);
    record_exclusions(&field);
    Ok(field)
}
