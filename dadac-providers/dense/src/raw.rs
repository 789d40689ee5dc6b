//! Readers for headerless little-endian binary files.
use std::{fs, path::Path};

use tracing::debug;

use crate::errors::DenseMatrixProviderError;

/// Width of the floating-point values stored in a raw file.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Precision {
    /// IEEE 754 single precision, 4 bytes per value.
    #[default]
    Float32,
    /// IEEE 754 double precision, 8 bytes per value.
    Float64,
}

impl Precision {
    /// Bytes per value.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

fn read_records(path: &Path, record: usize) -> Result<Vec<u8>, DenseMatrixProviderError> {
    let bytes = fs::read(path)?;
    if bytes.len() % record != 0 {
        return Err(DenseMatrixProviderError::TruncatedFile {
            path: path.to_path_buf(),
            bytes: bytes.len(),
            record,
        });
    }
    debug!(path = %path.display(), bytes = bytes.len(), "raw file read");
    Ok(bytes)
}

/// Reads every value of a raw float file, widened to `f64`.
///
/// `record` is the byte length the file size must be a multiple of, which
/// lets callers demand whole rows rather than whole values.
pub(crate) fn read_floats(
    path: &Path,
    precision: Precision,
    record: usize,
) -> Result<Vec<f64>, DenseMatrixProviderError> {
    let bytes = read_records(path, record)?;
    let values = match precision {
        Precision::Float32 => bytes
            .chunks_exact(4)
            .map(|chunk| <[u8; 4]>::try_from(chunk).map(|raw| f64::from(f32::from_le_bytes(raw))))
            .collect::<Result<Vec<_>, _>>(),
        Precision::Float64 => bytes
            .chunks_exact(8)
            .map(|chunk| <[u8; 8]>::try_from(chunk).map(f64::from_le_bytes))
            .collect::<Result<Vec<_>, _>>(),
    };
    values.map_err(|_| DenseMatrixProviderError::TruncatedFile {
        path: path.to_path_buf(),
        bytes: bytes.len(),
        record,
    })
}

/// Reads a raw file of little-endian `i32` values.
pub(crate) fn read_i32s(path: &Path) -> Result<Vec<i32>, DenseMatrixProviderError> {
    let bytes = read_records(path, 4)?;
    Ok(bytes
        .chunks_exact(4)
        .filter_map(|chunk| <[u8; 4]>::try_from(chunk).ok())
        .map(i32::from_le_bytes)
        .collect())
}
