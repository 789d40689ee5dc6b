//! Unit tests for the CLI commands and input loading.

mod helpers;

use super::commands::{derive_data_source_name, run_command};
use super::{
    Cli, CliError, Command, ImageArgs, ParquetArgs, RawArgs, RunSource, USAGE_EXIT_CODE,
    render_parse_error, render_summary, run_cli,
};

use std::io::{self, Write};
use std::path::Path;

use clap::Parser;
use dadac_core::{BorderStorage, DadacError};
use dadac_providers_dense::DenseMatrixProviderError;
use dadac_test_support::{synthetic::disk_image, tracing::RecordingLayer};
use rstest::rstest;
use tracing::Level;

use helpers::{
    TestResult, blob_points, command, create_parquet_file, raw_source, run_cli_expecting_error,
    run_command_expecting_error, temp_dir, write_bytes, write_f32_points, write_f32s,
    write_f64_points, write_i32s,
};

#[rstest]
#[case::override_name("/tmp/source.parquet", Some("override"), "override")]
#[case::stem_with_extension("/tmp/source.parquet", None, "source")]
#[case::stem_without_extension("/tmp/source", None, "source")]
#[case::missing_stem("", None, "data_source")]
fn derive_data_source_name_selects_expected_name(
    #[case] raw_path: &str,
    #[case] override_name: Option<&'static str>,
    #[case] expected: &str,
) {
    let path = Path::new(raw_path);
    let name = derive_data_source_name(path, override_name);
    assert_eq!(name, expected);
}

#[rstest]
fn run_raw_clusters_every_point() -> TestResult {
    let dir = temp_dir();
    let path = write_f32_points(&dir, "blobs.bin", &blob_points());
    let cli = Cli {
        command: Command::Run(command(raw_source(path))),
    };

    let summary = run_cli(cli)?;

    assert_eq!(summary.data_source, "blobs");
    assert_eq!(summary.result.points().len(), 200);
    assert!(summary.result.cluster_count() >= 1);
    assert!(summary.result.peak_count() >= summary.result.cluster_count());
    Ok(())
}

#[rstest]
fn run_raw_reads_double_precision() -> TestResult {
    let dir = temp_dir();
    let path = write_f64_points(&dir, "blobs64.bin", &blob_points());
    let mut cmd = command(RunSource::Raw(RawArgs {
        path,
        dims: 2,
        float64: true,
    }));
    cmd.name = Some("doubles".into());

    let summary = run_command(cmd)?;

    assert_eq!(summary.data_source, "doubles");
    assert_eq!(summary.result.points().len(), 200);
    Ok(())
}

#[rstest]
fn run_raw_rejects_partial_rows() {
    let dir = temp_dir();
    let path = write_bytes(dir.path(), "partial.bin", &[0_u8; 12]);

    let err = run_command_expecting_error(command(raw_source(path)), "12 bytes are not whole rows");

    assert!(matches!(
        err,
        CliError::Dense(DenseMatrixProviderError::TruncatedFile { record: 8, .. })
    ));
    assert_eq!(err.exit_code(), 2);
}

#[rstest]
fn run_raw_reports_missing_files() {
    let dir = temp_dir();
    let path = dir.path().join("absent.bin");

    let err = run_command_expecting_error(command(raw_source(path)), "missing file must fail");

    assert!(matches!(err, CliError::Dense(DenseMatrixProviderError::Io(_))));
    assert_eq!(err.exit_code(), 1);
}

#[rstest]
fn run_parquet_success() -> TestResult {
    let dir = temp_dir();
    let path = create_parquet_file(&dir, "vectors.parquet", &blob_points())?;
    let mut cmd = command(RunSource::Parquet(ParquetArgs {
        path,
        column: "features".into(),
    }));
    cmd.name = Some("parquet".into());

    let summary = run_command(cmd)?;

    assert_eq!(summary.data_source, "parquet");
    assert_eq!(summary.result.points().len(), 200);
    Ok(())
}

#[rstest]
fn run_parquet_rejects_missing_column() -> TestResult {
    let dir = temp_dir();
    let path = create_parquet_file(&dir, "vectors.parquet", &blob_points())?;
    let cmd = command(RunSource::Parquet(ParquetArgs {
        path,
        column: "unknown".into(),
    }));

    let err = run_command_expecting_error(cmd, "missing column must fail");

    assert!(matches!(
        err,
        CliError::Dense(DenseMatrixProviderError::ColumnNotFound { ref column }) if column == "unknown"
    ));
    Ok(())
}

#[rstest]
fn run_image_excludes_masked_pixels() {
    let dir = temp_dir();
    let image = disk_image(40, 40, 6, &[(20, 10), (20, 30)]);
    let values: Vec<f32> = image
        .mask
        .iter()
        .map(|&valid| if valid == 0 { 0.0 } else { 1.0 })
        .collect();
    let values_path = write_f32s(&dir, "disks.raw", &values);
    let mask_path = write_i32s(&dir, "disks.mask", &image.mask);
    let mut cmd = command(RunSource::Image(ImageArgs {
        values: values_path,
        mask: mask_path,
        rows: 40,
        cols: 40,
        window_radius: 4,
        intensity: false,
        float64: false,
    }));
    cmd.neighbours = 21;

    let summary = run_command(cmd).expect("image run succeeds");

    let masked = image.mask.iter().filter(|&&valid| valid == 0).count();
    assert_eq!(summary.data_source, "disks");
    assert_eq!(summary.result.points().len(), 1600);
    assert_eq!(summary.result.excluded_count(), masked);
    assert_eq!(summary.result.intrinsic_dimension(), 2.0);
}

#[rstest]
fn run_image_rejects_short_masks() {
    let dir = temp_dir();
    let values_path = write_f32s(&dir, "values.raw", &[1.0; 16]);
    let mask_path = write_i32s(&dir, "values.mask", &[1; 15]);
    let cmd = command(RunSource::Image(ImageArgs {
        values: values_path,
        mask: mask_path,
        rows: 4,
        cols: 4,
        window_radius: 2,
        intensity: false,
        float64: false,
    }));

    let err = run_command_expecting_error(cmd, "a short mask must fail");

    assert!(matches!(
        err,
        CliError::Dense(DenseMatrixProviderError::PixelCountMismatch {
            expected: 16,
            actual: 15,
            ..
        })
    ));
}

#[rstest]
#[case::too_few_neighbours(4, 2.0, 2)]
#[case::negative_z(20, -1.0, 2)]
#[case::more_neighbours_than_points(300, 2.0, 3)]
fn configuration_errors_map_to_exit_codes(
    #[case] neighbours: usize,
    #[case] z: f64,
    #[case] exit_code: u8,
) {
    let dir = temp_dir();
    let path = write_f32_points(&dir, "blobs.bin", &blob_points());
    let mut cmd = command(raw_source(path));
    cmd.neighbours = neighbours;
    cmd.z = z;

    let err = run_command_expecting_error(cmd, "configuration must be rejected");

    assert!(matches!(err, CliError::Core(_)));
    assert_eq!(err.exit_code(), exit_code);
}

#[rstest]
fn insufficient_data_keeps_its_core_error() {
    let dir = temp_dir();
    let path = write_f32_points(&dir, "blobs.bin", &blob_points());
    let mut cmd = command(raw_source(path));
    cmd.neighbours = 500;
    let cli = Cli {
        command: Command::Run(cmd),
    };

    let err = run_cli_expecting_error(cli, "500 neighbours exceed 200 points");

    assert!(matches!(
        err.core(),
        Some(DadacError::InsufficientData {
            items: 200,
            neighbours: 500,
            ..
        })
    ));
}

#[rstest]
fn execute_span_records_the_source() -> TestResult {
    let dir = temp_dir();
    let path = write_f32_points(&dir, "blobs.bin", &blob_points());

    let (layer, summary) = RecordingLayer::capture(|| run_command(command(raw_source(path))));
    summary?;

    let execute = layer.span("cli.execute").expect("execute span recorded");
    assert_eq!(execute.field("source"), Some("raw"));
    assert_eq!(execute.field("neighbours"), Some("20"));
    assert!(layer.span("cli.run_raw").is_some());
    assert!(layer.span("core.run").is_some());
    assert!(layer.has_event(Level::INFO, "command completed"));
    Ok(())
}

#[rstest]
fn summary_lists_counts_and_timings() -> TestResult {
    let dir = temp_dir();
    let path = write_f32_points(&dir, "blobs.bin", &blob_points());
    let summary = run_command(command(raw_source(path)))?;

    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    let text = String::from_utf8(buffer)?;

    assert!(text.starts_with("data source: blobs\npoints: 200\n"));
    let clusters = format!("clusters: {}\n", summary.result.cluster_count());
    assert!(text.contains(&clusters));
    for label in ["peaks: ", "halo points: ", "excluded points: 0", "merging: ", "total: "] {
        assert!(text.contains(label), "summary lacks `{label}`:\n{text}");
    }
    Ok(())
}

#[rstest]
fn clap_parses_run_options() {
    let args = [
        "dadac", "run", "-k", "50", "-z", "1.5", "--no-halo", "--sparse-borders", "--threads",
        "2", "raw", "data.bin", "--dims", "3", "--float64",
    ];
    let cli = Cli::try_parse_from(args).expect("valid args must parse");
    let Command::Run(cmd) = cli.command;

    assert_eq!(cmd.neighbours, 50);
    assert_eq!(cmd.z, 1.5);
    assert!(cmd.no_halo);
    assert!(cmd.sparse_borders);
    assert_eq!(cmd.threads, Some(2));
    assert!(matches!(
        cmd.source,
        RunSource::Raw(RawArgs { dims: 3, float64: true, .. })
    ));
}

#[rstest]
fn clap_applies_defaults() {
    let args = [
        "dadac", "run", "image", "v.raw", "m.raw", "--rows", "8", "--cols", "9",
    ];
    let cli = Cli::try_parse_from(args).expect("valid args must parse");
    let Command::Run(cmd) = cli.command;

    assert_eq!(cmd.neighbours, 1001);
    assert_eq!(cmd.z, 2.0);
    assert!(!cmd.no_halo && !cmd.halo_flag);
    assert!(cmd.output.is_none() && cmd.borders.is_none());
    assert!(matches!(
        cmd.source,
        RunSource::Image(ImageArgs {
            rows: 8,
            cols: 9,
            window_radius: 15,
            intensity: false,
            ..
        })
    ));
}

struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[rstest]
#[case::help(&["dadac", "--help"], 0, "Usage")]
#[case::unknown_flag(&["dadac", "run", "--bogus"], USAGE_EXIT_CODE, "--bogus")]
#[case::missing_source(&["dadac", "run"], USAGE_EXIT_CODE, "Usage")]
fn parse_errors_render_with_exit_code(
    #[case] args: &[&str],
    #[case] expected_code: u8,
    #[case] expected_text: &str,
) {
    let err = Cli::try_parse_from(args).expect_err("arguments must not parse");
    let mut buffer = Vec::new();

    let code = render_parse_error(&err, &mut buffer).expect("buffer accepts writes");

    assert_eq!(code, expected_code);
    let text = String::from_utf8(buffer).expect("clap output is UTF-8");
    assert!(text.contains(expected_text), "unexpected output: {text}");
}

#[rstest]
fn parse_error_write_failures_are_reported() {
    let err = Cli::try_parse_from(["dadac", "run", "--bogus"]).expect_err("flag is unknown");

    let rendered = render_parse_error(&err, FailingWriter);

    let write_err = rendered.expect_err("writer rejects output");
    assert_eq!(write_err.kind(), io::ErrorKind::BrokenPipe);
}

#[rstest]
fn clap_rejects_conflicting_border_layouts() {
    let args = [
        "dadac", "run", "--sparse-borders", "--dense-borders", "raw", "d.bin", "--dims", "2",
    ];

    let err = Cli::try_parse_from(args).expect_err("layouts conflict");

    assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
}

#[rstest]
#[case::sparse(true, false, BorderStorage::Sparse)]
#[case::dense(false, true, BorderStorage::Dense)]
#[case::automatic(false, false, BorderStorage::Auto)]
fn border_flags_select_storage(
    #[case] sparse: bool,
    #[case] dense: bool,
    #[case] expected: BorderStorage,
) {
    let mut cmd = command(raw_source("unused.bin".into()));
    cmd.sparse_borders = sparse;
    cmd.dense_borders = dense;

    let dadac = super::commands::configure(&cmd, None).expect("flags are valid");

    assert_eq!(dadac.border_storage(), expected);
}
