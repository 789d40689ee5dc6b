//! Input builders and error helpers shared by the CLI tests.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{ArrayRef, FixedSizeListArray, Float32Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use dadac_test_support::synthetic::gaussian_blobs;
use parquet::arrow::arrow_writer::ArrowWriter;
use tempfile::TempDir;

use super::super::commands::run_command;
use super::super::{Cli, CliError, RawArgs, RunCommand, RunSource, run_cli};

pub(super) type TestResult = Result<(), Box<dyn std::error::Error>>;

pub(super) fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

/// Two well separated blobs of 100 points each in the plane.
pub(super) fn blob_points() -> Vec<Vec<f64>> {
    gaussian_blobs(&[vec![0.0, 0.0], vec![9.0, 0.0]], 100, 1.0, 17).points
}

pub(super) fn write_f32_points(dir: &TempDir, name: &str, points: &[Vec<f64>]) -> PathBuf {
    let bytes: Vec<u8> = points
        .iter()
        .flatten()
        .flat_map(|&value| (value as f32).to_le_bytes())
        .collect();
    write_bytes(dir.path(), name, &bytes)
}

pub(super) fn write_f64_points(dir: &TempDir, name: &str, points: &[Vec<f64>]) -> PathBuf {
    let bytes: Vec<u8> = points
        .iter()
        .flatten()
        .flat_map(|value| value.to_le_bytes())
        .collect();
    write_bytes(dir.path(), name, &bytes)
}

pub(super) fn write_f32s(dir: &TempDir, name: &str, values: &[f32]) -> PathBuf {
    let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
    write_bytes(dir.path(), name, &bytes)
}

pub(super) fn write_i32s(dir: &TempDir, name: &str, values: &[i32]) -> PathBuf {
    let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
    write_bytes(dir.path(), name, &bytes)
}

pub(super) fn write_bytes(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("write raw file");
    path
}

/// Writes `points` to a `features: FixedSizeList<Float32, 2>` column.
pub(super) fn create_parquet_file(
    dir: &TempDir,
    name: &str,
    points: &[Vec<f64>],
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = dir.path().join(name);
    let values = Float32Array::from_iter_values(points.iter().flatten().map(|&v| v as f32));
    let item = Arc::new(Field::new("item", DataType::Float32, false));
    let list = FixedSizeListArray::try_new(item.clone(), 2, Arc::new(values) as ArrayRef, None)?;
    let schema = Arc::new(Schema::new(vec![Field::new(
        "features",
        DataType::FixedSizeList(item, 2),
        false,
    )]));
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(list) as ArrayRef])?;
    let file = File::create(&path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(path)
}

/// A `run` command with small defaults suited to the test inputs.
pub(super) fn command(source: RunSource) -> RunCommand {
    RunCommand {
        neighbours: 20,
        z: 2.0,
        no_halo: false,
        halo_flag: false,
        sparse_borders: false,
        dense_borders: false,
        dimension: None,
        likelihood_threshold: None,
        threads: None,
        max_bytes: None,
        output: None,
        borders: None,
        name: None,
        source,
    }
}

pub(super) fn raw_source(path: PathBuf) -> RunSource {
    RunSource::Raw(RawArgs {
        path,
        dims: 2,
        float64: false,
    })
}

pub(super) fn run_cli_expecting_error(cli: Cli, panic_msg: &str) -> CliError {
    match run_cli(cli) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}

pub(super) fn run_command_expecting_error(cmd: RunCommand, panic_msg: &str) -> CliError {
    match run_command(cmd) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}
