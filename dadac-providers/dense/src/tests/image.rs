use super::{DenseMatrixProviderError, Precision, RawImage, support::*};
use rstest::rstest;
use tempfile::TempDir;

fn image(dir: &TempDir, values: &[f32], mask: &[i32], rows: usize, cols: usize) -> RawImage {
    RawImage {
        values: write_f32s(dir.path(), "values.bin", values),
        mask: write_i32s(dir.path(), "mask.bin", mask),
        rows,
        cols,
        precision: Precision::Float32,
    }
}

#[test]
fn image_and_mask_become_a_grid() {
    let dir = TempDir::new().expect("temp dir");
    let raw = image(&dir, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 0, 1, 1, 0, 1], 2, 3);

    let grid = raw.load().expect("files match the shape");

    assert_eq!((grid.rows(), grid.cols()), (2, 3));
    assert_eq!(grid.valid_count(), 4);
    assert!(!grid.is_valid(1));
    assert_eq!(grid.value(5), Some(6.0));
    assert!(grid.name().ends_with("values.bin"));
}

#[test]
fn float64_images_are_supported() {
    let dir = TempDir::new().expect("temp dir");
    let raw = RawImage {
        values: write_f64s(dir.path(), "values.bin", &[0.25; 4]),
        mask: write_i32s(dir.path(), "mask.bin", &[1; 4]),
        rows: 2,
        cols: 2,
        precision: Precision::Float64,
    };

    let grid = raw.load().expect("files match the shape");

    assert_eq!(grid.value(3), Some(0.25));
}

#[rstest]
#[case::short_values(vec![1.0; 3], vec![1; 4], "values.bin")]
#[case::long_mask(vec![1.0; 4], vec![1; 5], "mask.bin")]
fn files_must_cover_every_pixel(
    #[case] values: Vec<f32>,
    #[case] mask: Vec<i32>,
    #[case] culprit: &str,
) {
    let dir = TempDir::new().expect("temp dir");
    let raw = image(&dir, &values, &mask, 2, 2);

    let err = raw.load().expect_err("counts differ");

    match err {
        DenseMatrixProviderError::PixelCountMismatch { path, expected, .. } => {
            assert_eq!(expected, 4);
            assert!(path.ends_with(culprit));
        }
        other => panic!("unexpected error {other:?}"),
    }
}
