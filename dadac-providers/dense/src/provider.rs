//! Dense matrix provider implementation and ingestion utilities.
use std::{fs::File, path::Path};

use arrow_array::{Array, FixedSizeListArray, RecordBatchReader};

use dadac_core::{DataSource, DataSourceError};
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use parquet::file::reader::ChunkReader;
use tracing::{info, instrument};

use crate::errors::DenseMatrixProviderError;
use crate::ingest::{append_fixed_size_list_values, validate_fixed_size_list_field};
use crate::raw::{Precision, read_floats};

/// Dense point cloud backed by a contiguous row-major `f64` buffer.
///
/// # Examples
/// ```
/// use dadac_core::DataSource;
/// use dadac_providers_dense::DenseMatrixProvider;
///
/// let cloud = DenseMatrixProvider::try_from_rows("demo", vec![vec![0.0, 0.0], vec![3.0, 4.0]])?;
/// assert_eq!(cloud.len(), 2);
/// assert_eq!(cloud.squared_distance(0, 1)?, 25.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrixProvider {
    name: String,
    rows: usize,
    dimension: usize,
    values: Vec<f64>,
}

impl DenseMatrixProvider {
    pub(crate) fn from_parts(
        name: impl Into<String>,
        rows: usize,
        dimension: usize,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(values.len(), rows.saturating_mul(dimension));
        Self {
            name: name.into(),
            rows,
            dimension,
            values,
        }
    }

    /// Returns the dimensionality of each row.
    #[rustfmt::skip]
    #[must_use]
    pub fn dimension(&self) -> usize { self.dimension }

    /// Returns the underlying row-major matrix.
    #[rustfmt::skip]
    #[must_use]
    pub fn data(&self) -> &[f64] { &self.values }

    /// Builds a provider from in-memory rows of equal length.
    ///
    /// # Errors
    /// Returns [`DenseMatrixProviderError::ZeroDimension`] for empty rows,
    /// [`DenseMatrixProviderError::InvalidRowLength`] when lengths differ and
    /// [`DenseMatrixProviderError::NonFiniteValue`] for NaN or infinite
    /// coordinates.
    pub fn try_from_rows(
        name: impl Into<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, DenseMatrixProviderError> {
        let dimension = rows.first().map_or(0, Vec::len);
        if dimension == 0 && !rows.is_empty() {
            return Err(DenseMatrixProviderError::ZeroDimension);
        }
        let mut values = Vec::with_capacity(rows.len().saturating_mul(dimension));
        for (row, coordinates) in rows.iter().enumerate() {
            if coordinates.len() != dimension {
                return Err(DenseMatrixProviderError::InvalidRowLength {
                    row,
                    expected: dimension,
                    actual: coordinates.len(),
                });
            }
            values.extend_from_slice(coordinates);
        }
        check_finite(&values, dimension)?;
        Ok(Self::from_parts(name, rows.len(), dimension, values))
    }

    /// Loads a headerless little-endian file of `dimension`-wide rows.
    ///
    /// # Errors
    /// Returns [`DenseMatrixProviderError::ZeroDimension`] when `dimension`
    /// is zero, [`DenseMatrixProviderError::TruncatedFile`] when the file
    /// does not hold whole rows, [`DenseMatrixProviderError::NonFiniteValue`]
    /// for NaN or infinite values and [`DenseMatrixProviderError::Io`] when
    /// the file cannot be read.
    #[instrument(name = "dense.raw", skip(name, path), fields(path = %path.as_ref().display()))]
    pub fn try_from_raw_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        dimension: usize,
        precision: Precision,
    ) -> Result<Self, DenseMatrixProviderError> {
        if dimension == 0 {
            return Err(DenseMatrixProviderError::ZeroDimension);
        }
        let record = dimension
            .checked_mul(precision.width())
            .ok_or(DenseMatrixProviderError::CapacityOverflow { rows: 1, dimension })?;
        let values = read_floats(path.as_ref(), precision, record)?;
        check_finite(&values, dimension)?;
        let rows = values.len() / dimension;
        info!(rows, dimension, "raw matrix loaded");
        Ok(Self::from_parts(name, rows, dimension, values))
    }

    /// Loads data from an Arrow [`FixedSizeListArray`] of `Float32` or
    /// `Float64` values.
    ///
    /// # Errors
    /// Returns the list validation errors of
    /// [`Self::try_from_parquet_reader`].
    pub fn try_from_fixed_size_list(
        name: impl Into<String>,
        array: &FixedSizeListArray,
    ) -> Result<Self, DenseMatrixProviderError> {
        let mut values = Vec::new();
        let dimension = append_fixed_size_list_values(array, None, 0, &mut values)?;
        Ok(Self::from_parts(name, array.len(), dimension, values))
    }

    /// Loads data from a Parquet column containing
    /// `FixedSizeList<Float32 | Float64, D>` rows.
    ///
    /// # Errors
    /// See [`Self::try_from_parquet_reader`]; also
    /// [`DenseMatrixProviderError::Io`] when the file cannot be opened.
    pub fn try_from_parquet_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        column: &str,
    ) -> Result<Self, DenseMatrixProviderError> {
        let file = File::open(path)?;
        Self::try_from_parquet_reader(name, file, column)
    }

    /// Loads data from a Parquet reader.
    ///
    /// # Errors
    /// Returns [`DenseMatrixProviderError::ColumnNotFound`] for a missing
    /// column, a type, nullability, null or non-finite value error when the
    /// column does not hold complete float rows, and the Arrow or Parquet
    /// error when decoding fails.
    #[instrument(name = "dense.parquet", skip(name, reader))]
    pub fn try_from_parquet_reader<R>(
        name: impl Into<String>,
        reader: R,
        column: &str,
    ) -> Result<Self, DenseMatrixProviderError>
    where
        R: ChunkReader + Send + 'static,
    {
        let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;
        let mask = ProjectionMask::columns(builder.parquet_schema(), [column]);
        let reader = builder.with_projection(mask).build()?;
        let schema = reader.schema();
        let column_index =
            schema
                .index_of(column)
                .map_err(|_| DenseMatrixProviderError::ColumnNotFound {
                    column: column.to_owned(),
                })?;
        let field = schema.field(column_index);
        let dimension = validate_fixed_size_list_field(field, column)?;
        let mut values = Vec::new();
        let mut rows = 0_usize;
        for batch in reader {
            let batch = batch?;
            let column_array = batch.column(column_index);
            let list = column_array
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| DenseMatrixProviderError::InvalidColumnType {
                    column: column.to_owned(),
                    actual: column_array.data_type().clone(),
                })?;
            append_fixed_size_list_values(list, Some(dimension), rows, &mut values)?;
            rows += list.len();
        }
        info!(rows, dimension, "parquet matrix loaded");
        Ok(Self::from_parts(name, rows, dimension, values))
    }

    fn row_slice(&self, index: usize) -> Result<&[f64], DataSourceError> {
        if index >= self.rows {
            return Err(DataSourceError::OutOfBounds { index });
        }
        let start = index
            .checked_mul(self.dimension)
            .ok_or(DataSourceError::OutOfBounds { index })?;
        self.values
            .get(start..start + self.dimension)
            .ok_or(DataSourceError::OutOfBounds { index })
    }
}

fn check_finite(values: &[f64], dimension: usize) -> Result<(), DenseMatrixProviderError> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(position) => Err(DenseMatrixProviderError::NonFiniteValue {
            row: position / dimension,
            value_index: position % dimension,
        }),
        None => Ok(()),
    }
}

fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

impl DataSource for DenseMatrixProvider {
    fn len(&self) -> usize {
        self.rows
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimension)
    }

    fn squared_distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError> {
        Ok(squared_euclidean(self.row_slice(i)?, self.row_slice(j)?))
    }

    fn batch_squared_distances(
        &self,
        query: usize,
        candidates: &[usize],
    ) -> Result<Vec<f64>, DataSourceError> {
        let anchor = self.row_slice(query)?;
        candidates
            .iter()
            .map(|&candidate| Ok(squared_euclidean(anchor, self.row_slice(candidate)?)))
            .collect()
    }
}
