//! Error types for the dadac core library.
//!
//! Defines the error enums exposed by the public API, their stable codes, the
//! coarse [`ErrorKind`] used by drivers to pick exit codes, and a result alias.

use std::{fmt, sync::Arc};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced by [`crate::DataSource`] operations.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DataSourceError {
    /// Requested index was outside the source's bounds.
    #[error("index {index} is out of bounds")]
    OutOfBounds {
        /// The requested row that exceeded the source bounds.
        index: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`DataSourceError`] variants.
    enum DataSourceErrorCode for DataSourceError {
        /// Requested index was outside the source's bounds.
        OutOfBounds => OutOfBounds { .. } => "DATA_SOURCE_OUT_OF_BOUNDS",
    }
}

/// Describes why a neighbour row was rejected.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum NeighbourhoodFault {
    /// The row was empty or did not start with the point itself.
    #[error("row does not start with the point itself")]
    MissingSelf,
    /// The self entry carried a non-zero distance.
    #[error("self entry has a non-zero distance")]
    NonZeroSelfDistance,
    /// A distance was negative, NaN or infinite.
    #[error("distance at position {position} is not a finite non-negative value")]
    InvalidDistance {
        /// Position of the offending entry within the row.
        position: usize,
    },
    /// Distances were not in ascending order.
    #[error("distance at position {position} is smaller than its predecessor")]
    Unsorted {
        /// Position of the first entry that breaks the ordering.
        position: usize,
    },
    /// A neighbour index referenced a point outside the data set.
    #[error("neighbour {neighbour} is outside the data set")]
    OutOfRange {
        /// The invalid neighbour index.
        neighbour: usize,
    },
    /// A neighbour index appeared more than once.
    #[error("neighbour {neighbour} appears more than once")]
    Duplicate {
        /// The repeated neighbour index.
        neighbour: usize,
    },
    /// The row did not hold the requested number of entries.
    #[error("row has {got} entries but {expected} were required")]
    WrongLength {
        /// Number of entries each row must hold.
        expected: usize,
        /// Number of entries supplied.
        got: usize,
    },
}

/// Describes a numeric failure that prevents clustering.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum NumericFault {
    /// No point produced a usable nearest-neighbour distance ratio.
    #[error("no point has a usable two-nearest-neighbour distance ratio")]
    DegenerateDistanceRatios,
    /// Every point produced a non-finite density.
    #[error("every point produced a non-finite density")]
    AllPointsExcluded,
    /// Every pixel of the image was masked.
    #[error("every pixel of the image is masked")]
    AllPixelsMasked,
}

/// Error type produced when constructing or running [`crate::Dadac`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DadacError {
    /// The neighbour count must exceed four.
    #[error("neighbours must be greater than 4 (got {got})")]
    InvalidNeighbourCount {
        /// The invalid neighbour count supplied by the caller.
        got: usize,
    },
    /// The confidence scalar must be finite and non-negative.
    #[error("z must be a finite value >= 0 (got {got})")]
    InvalidConfidence {
        /// The invalid confidence supplied by the caller.
        got: f64,
    },
    /// The intrinsic dimension must be finite and positive.
    #[error("dimension must be a finite value > 0 (got {got})")]
    InvalidDimension {
        /// The invalid dimension.
        got: f64,
    },
    /// The likelihood-ratio threshold must be finite and positive.
    #[error("likelihood threshold must be a finite value > 0 (got {got})")]
    InvalidLikelihoodThreshold {
        /// The invalid threshold supplied by the caller.
        got: f64,
    },
    /// The image density window radius must be at least one pixel.
    #[error("window radius must be at least 1 (got {got})")]
    InvalidWindowRadius {
        /// The invalid radius supplied by the caller.
        got: usize,
    },
    /// The input contained no points.
    #[error("data source `{data_source}` contains no items")]
    EmptySource {
        /// Identifier for the empty data source.
        data_source: Arc<str>,
    },
    /// The input did not contain more points than the neighbour count.
    #[error(
        "data source `{data_source}` has {items} items but {neighbours} neighbours require at least {}",
        neighbours.saturating_add(1)
    )]
    InsufficientData {
        /// Identifier for the data source that lacked sufficient items.
        data_source: Arc<str>,
        /// Number of items available in the data source.
        items: usize,
        /// Configured neighbour count.
        neighbours: usize,
    },
    /// Density estimation could not produce usable values.
    #[error("numeric failure on `{data_source}`: {fault}")]
    NumericFailure {
        /// Identifier for the data source being clustered.
        data_source: Arc<str>,
        /// What went wrong.
        fault: NumericFault,
    },
    /// A neighbour row violated the neighbourhood contract.
    #[error("inconsistent neighbourhood for point {point}: {fault}")]
    InconsistentNeighbourhood {
        /// Point whose row was rejected.
        point: usize,
        /// What was wrong with the row.
        fault: NeighbourhoodFault,
    },
    /// Image values and mask disagree with the declared grid shape.
    #[error("image of {rows}x{cols} requires {expected} cells but values={values}, mask={mask}", expected = rows.saturating_mul(*cols))]
    ImageShapeMismatch {
        /// Declared row count.
        rows: usize,
        /// Declared column count.
        cols: usize,
        /// Number of pixel values supplied.
        values: usize,
        /// Number of mask entries supplied.
        mask: usize,
    },
    /// The estimated working set exceeds the configured memory limit.
    #[error("estimated peak memory {estimated} bytes exceeds the limit of {limit} bytes")]
    MemoryLimitExceeded {
        /// Estimated peak bytes for the run.
        estimated: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
    /// A [`crate::DataSource`] operation failed while running the algorithm.
    #[error("data source `{data_source}` failed: {error}")]
    DataSource {
        /// Identifier for the data source that produced the error.
        data_source: Arc<str>,
        #[source]
        /// Underlying data source error bubbled up by the algorithm.
        error: DataSourceError,
    },
    /// The dedicated worker pool could not be created.
    #[error("failed to build worker pool: {message}")]
    ThreadPool {
        /// Message reported by the pool builder.
        message: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`DadacError`] variants.
    enum DadacErrorCode for DadacError {
        /// The neighbour count must exceed four.
        InvalidNeighbourCount => InvalidNeighbourCount { .. } => "DADAC_INVALID_NEIGHBOUR_COUNT",
        /// The confidence scalar must be finite and non-negative.
        InvalidConfidence => InvalidConfidence { .. } => "DADAC_INVALID_CONFIDENCE",
        /// The intrinsic dimension must be finite and positive.
        InvalidDimension => InvalidDimension { .. } => "DADAC_INVALID_DIMENSION",
        /// The likelihood-ratio threshold must be finite and positive.
        InvalidLikelihoodThreshold => InvalidLikelihoodThreshold { .. } => "DADAC_INVALID_LIKELIHOOD_THRESHOLD",
        /// The image density window radius must be at least one pixel.
        InvalidWindowRadius => InvalidWindowRadius { .. } => "DADAC_INVALID_WINDOW_RADIUS",
        /// The input contained no points.
        EmptySource => EmptySource { .. } => "DADAC_EMPTY_SOURCE",
        /// The input did not contain more points than the neighbour count.
        InsufficientData => InsufficientData { .. } => "DADAC_INSUFFICIENT_DATA",
        /// Density estimation could not produce usable values.
        NumericFailure => NumericFailure { .. } => "DADAC_NUMERIC_FAILURE",
        /// A neighbour row violated the neighbourhood contract.
        InconsistentNeighbourhood => InconsistentNeighbourhood { .. } => "DADAC_INCONSISTENT_NEIGHBOURHOOD",
        /// Image values and mask disagree with the declared grid shape.
        ImageShapeMismatch => ImageShapeMismatch { .. } => "DADAC_IMAGE_SHAPE_MISMATCH",
        /// The estimated working set exceeds the configured memory limit.
        MemoryLimitExceeded => MemoryLimitExceeded { .. } => "DADAC_MEMORY_LIMIT_EXCEEDED",
        /// A [`crate::DataSource`] operation failed while running the algorithm.
        DataSourceFailure => DataSource { .. } => "DADAC_DATA_SOURCE_FAILURE",
        /// The dedicated worker pool could not be created.
        ThreadPool => ThreadPool { .. } => "DADAC_THREAD_POOL",
    }
}

/// Coarse classification of [`DadacError`] used to select process exit codes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// A parameter or input shape was out of range.
    InvalidArgument,
    /// The input held too few points for the neighbour count.
    InsufficientData,
    /// Densities could not be estimated.
    NumericFailure,
    /// Supplied neighbour rows broke the neighbourhood contract.
    InconsistentNeighbourhood,
    /// Any other failure, such as an I/O backed data source error.
    Other,
}

impl ErrorKind {
    /// Process exit code associated with this kind.
    ///
    /// # Examples
    /// ```
    /// use dadac_core::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::InvalidArgument.exit_code(), 2);
    /// assert_eq!(ErrorKind::NumericFailure.exit_code(), 4);
    /// ```
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::InvalidArgument => 2,
            Self::InsufficientData => 3,
            Self::NumericFailure => 4,
            Self::InconsistentNeighbourhood | Self::Other => 1,
        }
    }
}

impl DadacError {
    /// Retrieve the inner [`DataSourceErrorCode`] when the error originated in a [`crate::DataSource`].
    pub const fn data_source_code(&self) -> Option<DataSourceErrorCode> {
        match self {
            Self::DataSource { error, .. } => Some(error.code()),
            _ => None,
        }
    }

    /// Classify the error.
    ///
    /// # Examples
    /// ```
    /// use dadac_core::{DadacError, ErrorKind};
    ///
    /// let err = DadacError::InvalidNeighbourCount { got: 3 };
    /// assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidNeighbourCount { .. }
            | Self::InvalidConfidence { .. }
            | Self::InvalidDimension { .. }
            | Self::InvalidLikelihoodThreshold { .. }
            | Self::InvalidWindowRadius { .. }
            | Self::ImageShapeMismatch { .. } => ErrorKind::InvalidArgument,
            Self::EmptySource { .. } | Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::NumericFailure { .. } => ErrorKind::NumericFailure,
            Self::InconsistentNeighbourhood { .. } => ErrorKind::InconsistentNeighbourhood,
            Self::MemoryLimitExceeded { .. } | Self::DataSource { .. } | Self::ThreadPool { .. } => {
                ErrorKind::Other
            }
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T, E = DadacError> = core::result::Result<T, E>;
