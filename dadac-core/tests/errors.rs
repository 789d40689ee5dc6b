//! Stable error codes and exit-code classification.

use std::sync::Arc;

use dadac_core::{
    DadacError, DadacErrorCode, DataSourceError, DataSourceErrorCode, ErrorKind,
    NeighbourhoodFault, NumericFault,
};
use rstest::rstest;

#[rstest]
fn out_of_bounds_has_stable_data_source_code() {
    let error = DataSourceError::OutOfBounds { index: 0 };

    assert_eq!(error.code(), DataSourceErrorCode::OutOfBounds);
    assert_eq!(error.code().as_str(), "DATA_SOURCE_OUT_OF_BOUNDS");
    assert_eq!(error.to_string(), "index 0 is out of bounds");
}

#[rstest]
#[case::neighbours(
    DadacError::InvalidNeighbourCount { got: 3 },
    DadacErrorCode::InvalidNeighbourCount,
    ErrorKind::InvalidArgument,
)]
#[case::confidence(
    DadacError::InvalidConfidence { got: -1.0 },
    DadacErrorCode::InvalidConfidence,
    ErrorKind::InvalidArgument,
)]
#[case::dimension(
    DadacError::InvalidDimension { got: 0.0 },
    DadacErrorCode::InvalidDimension,
    ErrorKind::InvalidArgument,
)]
#[case::shape(
    DadacError::ImageShapeMismatch { rows: 2, cols: 2, values: 3, mask: 4 },
    DadacErrorCode::ImageShapeMismatch,
    ErrorKind::InvalidArgument,
)]
#[case::empty(
    DadacError::EmptySource { data_source: Arc::from("empty") },
    DadacErrorCode::EmptySource,
    ErrorKind::InsufficientData,
)]
#[case::insufficient(
    DadacError::InsufficientData { data_source: Arc::from("small"), items: 3, neighbours: 5 },
    DadacErrorCode::InsufficientData,
    ErrorKind::InsufficientData,
)]
#[case::numeric(
    DadacError::NumericFailure {
        data_source: Arc::from("image"),
        fault: NumericFault::AllPixelsMasked,
    },
    DadacErrorCode::NumericFailure,
    ErrorKind::NumericFailure,
)]
#[case::rows(
    DadacError::InconsistentNeighbourhood { point: 2, fault: NeighbourhoodFault::MissingSelf },
    DadacErrorCode::InconsistentNeighbourhood,
    ErrorKind::InconsistentNeighbourhood,
)]
#[case::memory(
    DadacError::MemoryLimitExceeded { estimated: 10, limit: 5 },
    DadacErrorCode::MemoryLimitExceeded,
    ErrorKind::Other,
)]
fn returns_expected_dadac_code(
    #[case] error: DadacError,
    #[case] expected: DadacErrorCode,
    #[case] kind: ErrorKind,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.code().as_str(), expected.as_str());
    assert_eq!(error.kind(), kind);
    assert_eq!(error.data_source_code(), None);
}

#[test]
fn data_source_failures_expose_inner_code() {
    let error = DadacError::DataSource {
        data_source: Arc::from("source"),
        error: DataSourceError::OutOfBounds { index: 1 },
    };

    assert_eq!(error.code(), DadacErrorCode::DataSourceFailure);
    assert_eq!(error.data_source_code(), Some(DataSourceErrorCode::OutOfBounds));
    assert_eq!(error.kind().exit_code(), 1);
}

#[rstest]
#[case::invalid(ErrorKind::InvalidArgument, 2)]
#[case::insufficient(ErrorKind::InsufficientData, 3)]
#[case::numeric(ErrorKind::NumericFailure, 4)]
#[case::rows(ErrorKind::InconsistentNeighbourhood, 1)]
#[case::other(ErrorKind::Other, 1)]
fn kinds_map_to_exit_codes(#[case] kind: ErrorKind, #[case] code: u8) {
    assert_eq!(kind.exit_code(), code);
}
