//! Raw image and mask loading.
use std::path::{Path, PathBuf};

use dadac_core::PixelGrid;
use tracing::{info, instrument};

use crate::errors::DenseMatrixProviderError;
use crate::raw::{Precision, read_floats, read_i32s};

/// Locations and shape of a raw image with its validity mask.
///
/// Values are little-endian floats in row-major order; the mask holds one
/// little-endian `i32` per pixel, non-zero for pixels taking part in
/// clustering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawImage {
    /// Pixel values.
    pub values: PathBuf,
    /// Pixel mask.
    pub mask: PathBuf,
    /// Row count.
    pub rows: usize,
    /// Column count.
    pub cols: usize,
    /// Width of the stored values.
    pub precision: Precision,
}

impl RawImage {
    /// Reads both files into a [`PixelGrid`] named after the values file.
    ///
    /// # Errors
    /// Returns [`DenseMatrixProviderError::PixelCountMismatch`] when a file
    /// does not hold `rows * cols` entries,
    /// [`DenseMatrixProviderError::TruncatedFile`] for partial values and
    /// [`DenseMatrixProviderError::Io`] when a file cannot be read.
    #[instrument(
        name = "dense.image",
        skip(self),
        fields(values = %self.values.display(), rows = self.rows, cols = self.cols),
    )]
    pub fn load(&self) -> Result<PixelGrid, DenseMatrixProviderError> {
        let expected = self
            .rows
            .checked_mul(self.cols)
            .ok_or(DenseMatrixProviderError::CapacityOverflow {
                rows: self.rows,
                dimension: self.cols,
            })?;
        let values = read_floats(&self.values, self.precision, self.precision.width())?;
        check_count(&self.values, expected, values.len())?;
        let mask = read_i32s(&self.mask)?;
        check_count(&self.mask, expected, mask.len())?;

        let grid = PixelGrid::try_new(self.rows, self.cols, values, mask)?
            .with_name(self.values.display().to_string());
        info!(valid = grid.valid_count(), "image loaded");
        Ok(grid)
    }
}

fn check_count(path: &Path, expected: usize, actual: usize) -> Result<(), DenseMatrixProviderError> {
    if expected == actual {
        Ok(())
    } else {
        Err(DenseMatrixProviderError::PixelCountMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        })
    }
}
