//! Errors raised while loading dense point clouds and images.
use std::path::PathBuf;

use arrow_schema::{ArrowError, DataType};
use thiserror::Error;

/// Failure to load or validate a dense matrix or pixel grid.
#[derive(Debug, Error)]
pub enum DenseMatrixProviderError {
    /// The requested Parquet column does not exist.
    #[error("column `{column}` not found in Parquet schema")]
    ColumnNotFound {
        /// Requested column name.
        column: String,
    },
    /// The column is not a `FixedSizeList` of floats.
    #[error("column `{column}` must be a FixedSizeList<Float32 | Float64, _> but found {actual:?}")]
    InvalidColumnType {
        /// Requested column name.
        column: String,
        /// Type found in the schema.
        actual: DataType,
    },
    /// The list children are neither `Float32` nor `Float64`.
    #[error("FixedSizeList child type must be Float32 or Float64 but found {actual:?}")]
    InvalidListValueType {
        /// Child type found.
        actual: DataType,
    },
    /// The schema allows nulls in the list or its children.
    #[error("column `{column}` must not be nullable (nullable child: {nullable_child})")]
    NullableField {
        /// Requested column name.
        column: String,
        /// Whether the child field was the nullable one.
        nullable_child: bool,
    },
    /// The list width is negative or zero.
    #[error("invalid FixedSizeList dimension {actual}")]
    InvalidDimension {
        /// Width declared by the schema.
        actual: i32,
    },
    /// A raw file was read with zero coordinates per point.
    #[error("points must have at least one coordinate")]
    ZeroDimension,
    #[error("row {row} is null")]
    NullRow { row: usize },
    #[error("row {row} contains null value at position {value_index}")]
    NullValue { row: usize, value_index: usize },
    /// A coordinate is NaN or infinite.
    #[error("row {row} contains a non-finite value at position {value_index}")]
    NonFiniteValue {
        /// Offending row.
        row: usize,
        /// Position within the row.
        value_index: usize,
    },
    #[error("row {row} has length {actual} but expected {expected}")]
    InvalidRowLength {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("matrix with {rows} rows and dimension {dimension} exceeds capacity limits")]
    CapacityOverflow { rows: usize, dimension: usize },
    #[error("inconsistent dimensions across batches: expected {expected}, got {actual}")]
    InconsistentBatchDimension { expected: usize, actual: usize },
    /// A raw file does not hold a whole number of values or rows.
    #[error("`{}` holds {bytes} bytes, not a multiple of {record} bytes", .path.display())]
    TruncatedFile {
        /// File that was read.
        path: PathBuf,
        /// File size.
        bytes: usize,
        /// Size of one complete record.
        record: usize,
    },
    /// An image file does not hold `rows * cols` values.
    #[error("`{}` holds {actual} values but the image has {expected} pixels", .path.display())]
    PixelCountMismatch {
        /// File that was read.
        path: PathBuf,
        /// `rows * cols`.
        expected: usize,
        /// Values found.
        actual: usize,
    },
    /// The loaded data was rejected by the clustering core.
    #[error("core rejected the input: {0}")]
    Core(#[from] dadac_core::DadacError),
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DenseMatrixProviderError {
    /// Stable machine-readable identifier of the variant.
    ///
    /// # Examples
    /// ```
    /// use dadac_providers_dense::DenseMatrixProviderError;
    ///
    /// assert_eq!(DenseMatrixProviderError::ZeroDimension.code(), "DENSE_ZERO_DIMENSION");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound { .. } => "DENSE_COLUMN_NOT_FOUND",
            Self::InvalidColumnType { .. } => "DENSE_INVALID_COLUMN_TYPE",
            Self::InvalidListValueType { .. } => "DENSE_INVALID_LIST_VALUE_TYPE",
            Self::NullableField { .. } => "DENSE_NULLABLE_FIELD",
            Self::InvalidDimension { .. } => "DENSE_INVALID_DIMENSION",
            Self::ZeroDimension => "DENSE_ZERO_DIMENSION",
            Self::NullRow { .. } => "DENSE_NULL_ROW",
            Self::NullValue { .. } => "DENSE_NULL_VALUE",
            Self::NonFiniteValue { .. } => "DENSE_NON_FINITE_VALUE",
            Self::InvalidRowLength { .. } => "DENSE_INVALID_ROW_LENGTH",
            Self::CapacityOverflow { .. } => "DENSE_CAPACITY_OVERFLOW",
            Self::InconsistentBatchDimension { .. } => "DENSE_INCONSISTENT_BATCH_DIMENSION",
            Self::TruncatedFile { .. } => "DENSE_TRUNCATED_FILE",
            Self::PixelCountMismatch { .. } => "DENSE_PIXEL_COUNT_MISMATCH",
            Self::Core(_) => "DENSE_CORE",
            Self::Arrow(_) => "DENSE_ARROW",
            Self::Parquet(_) => "DENSE_PARQUET",
            Self::Io(_) => "DENSE_IO",
        }
    }
}
