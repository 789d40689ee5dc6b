//! Command implementations and argument parsing for the dadac CLI.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use dadac_core::{
    ClusteringResult, Dadac, DadacBuilder, DadacError, DataSource, HaloLabelling, ImageDensity,
    format_bytes,
};
use dadac_providers_dense::{DenseMatrixProvider, DenseMatrixProviderError, Precision, RawImage};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::output::{write_border_file, write_point_file};

const DEFAULT_NEIGHBOURS: usize = 1001;
const DEFAULT_Z: f64 = 2.0;
const DEFAULT_WINDOW_RADIUS: usize = 15;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "dadac", about = "Density peaks advanced clustering.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Cluster a point cloud or an image.
    Run(RunCommand),
}

/// Options accepted by the `run` command.
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Neighbours per point, the point itself included.
    #[arg(short = 'k', long = "neighbours", default_value_t = DEFAULT_NEIGHBOURS)]
    pub neighbours: usize,

    /// Confidence scalar; larger values merge more peaks.
    #[arg(short = 'z', long = "z", default_value_t = DEFAULT_Z)]
    pub z: f64,

    /// Skip halo assignment.
    #[arg(long = "no-halo")]
    pub no_halo: bool,

    /// Keep the cluster id of halo points and only flag them.
    #[arg(long = "halo-flag")]
    pub halo_flag: bool,

    /// Store borders in per-cluster maps.
    #[arg(long = "sparse-borders", conflicts_with = "dense_borders")]
    pub sparse_borders: bool,

    /// Store borders in a full cluster-by-cluster table.
    #[arg(long = "dense-borders")]
    pub dense_borders: bool,

    /// Fix the intrinsic dimension instead of estimating it.
    #[arg(long)]
    pub dimension: Option<f64>,

    /// Critical value of the scale-selection test.
    #[arg(long = "likelihood-threshold")]
    pub likelihood_threshold: Option<f64>,

    /// Worker threads; `0` lets the runtime decide.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Reject runs whose estimated peak memory exceeds this size.
    ///
    /// Accepts plain byte counts or binary suffixes: `K`, `M`, `G`, `T`,
    /// optionally followed by `B` or `iB`.
    #[arg(long = "max-bytes", value_parser = parse_byte_size)]
    pub max_bytes: Option<u64>,

    /// Write one line of point information per point to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write the saddle points of every cluster to this file.
    #[arg(long)]
    pub borders: Option<PathBuf>,

    /// Override name for the data source (defaults to the file name).
    #[arg(long)]
    pub name: Option<String>,

    /// Data source configuration.
    #[command(subcommand)]
    pub source: RunSource,
}

/// Input data sources.
#[derive(Debug, Subcommand, Clone)]
pub enum RunSource {
    /// Headerless little-endian float rows.
    Raw(RawArgs),
    /// A Parquet `FixedSizeList<Float32 | Float64, D>` column.
    Parquet(ParquetArgs),
    /// A raw image with an `i32` validity mask.
    Image(ImageArgs),
}

/// Raw point-cloud arguments.
#[derive(Debug, Args, Clone)]
pub struct RawArgs {
    /// Path to the raw file.
    pub path: PathBuf,

    /// Coordinates per point.
    #[arg(long)]
    pub dims: usize,

    /// Values are 8-byte doubles rather than 4-byte floats.
    #[arg(long)]
    pub float64: bool,
}

/// Parquet ingestion arguments.
#[derive(Debug, Args, Clone)]
pub struct ParquetArgs {
    /// Path to the Parquet file containing feature vectors.
    pub path: PathBuf,

    /// Column containing the feature vectors.
    #[arg(long)]
    pub column: String,
}

/// Image arguments.
#[derive(Debug, Args, Clone)]
pub struct ImageArgs {
    /// Raw pixel values, row-major.
    pub values: PathBuf,

    /// Raw `i32` mask, non-zero for pixels to cluster.
    pub mask: PathBuf,

    /// Image height.
    #[arg(long)]
    pub rows: usize,

    /// Image width.
    #[arg(long)]
    pub cols: usize,

    /// Radius of the density window in pixels.
    #[arg(long = "window-radius", default_value_t = DEFAULT_WINDOW_RADIUS)]
    pub window_radius: usize,

    /// Sum pixel values in the window instead of counting pixels.
    #[arg(long)]
    pub intensity: bool,

    /// Values are 8-byte doubles rather than 4-byte floats.
    #[arg(long)]
    pub float64: bool,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// An output file could not be written.
    #[error("failed to write `{}`: {source}", .path.display())]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// Input loading failed.
    #[error(transparent)]
    Dense(#[from] DenseMatrixProviderError),
    /// Clustering failed.
    #[error(transparent)]
    Core(#[from] DadacError),
}

impl CliError {
    /// Returns the clustering error behind this failure, if any.
    #[must_use]
    pub const fn core(&self) -> Option<&DadacError> {
        match self {
            Self::Core(error) | Self::Dense(DenseMatrixProviderError::Core(error)) => Some(error),
            _ => None,
        }
    }

    /// Process exit code for this failure.
    ///
    /// Clustering errors use the code of their kind; malformed input files
    /// count as invalid arguments; I/O failures exit with `1`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Core(error) | Self::Dense(DenseMatrixProviderError::Core(error)) => {
                error.kind().exit_code()
            }
            Self::Io { .. }
            | Self::Dense(
                DenseMatrixProviderError::Io(_)
                | DenseMatrixProviderError::Arrow(_)
                | DenseMatrixProviderError::Parquet(_),
            ) => 1,
            Self::Dense(_) => 2,
        }
    }
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Name reported by the data source implementation.
    pub data_source: String,
    /// Clustering outcome.
    pub result: ClusteringResult,
    /// Wall-clock time spent loading the input and clustering it.
    pub elapsed: Duration,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading, clustering or writing outputs fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use dadac_cli::cli::{Cli, Command, RawArgs, RunCommand, RunSource, run_cli};
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// let bytes: Vec<u8> = (0..40_u16)
///     .flat_map(|i| [f32::from(i), f32::from(i % 7)])
///     .flat_map(f32::to_le_bytes)
///     .collect();
/// std::fs::write(file.path(), bytes)?;
/// let cli = Cli {
///     command: Command::Run(RunCommand {
///         neighbours: 8,
///         z: 2.0,
///         no_halo: false,
///         halo_flag: false,
///         sparse_borders: false,
///         dense_borders: false,
///         dimension: None,
///         likelihood_threshold: None,
///         threads: None,
///         max_bytes: None,
///         output: None,
///         borders: None,
///         name: None,
///         source: RunSource::Raw(RawArgs {
///             path: file.path().to_path_buf(),
///             dims: 2,
///             float64: false,
///         }),
///     }),
/// };
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.result.points().len(), 40);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Run(run) => {
            Span::current().record("command", field::display("run"));
            run_command(run)
        }
    }
}

#[instrument(
    name = "cli.execute",
    err,
    skip(command),
    fields(neighbours = command.neighbours, z = command.z, source = field::Empty),
)]
pub(super) fn run_command(command: RunCommand) -> Result<ExecutionSummary, CliError> {
    let started = Instant::now();
    let span = Span::current();
    let summary = match &command.source {
        RunSource::Raw(args) => {
            span.record("source", field::display("raw"));
            let dadac = configure(&command, None)?;
            run_raw(&dadac, args, command.name.as_deref())?
        }
        RunSource::Parquet(args) => {
            span.record("source", field::display("parquet"));
            let dadac = configure(&command, None)?;
            run_parquet(&dadac, args, command.name.as_deref())?
        }
        RunSource::Image(args) => {
            span.record("source", field::display("image"));
            let dadac = configure(&command, Some(args))?;
            run_image(&dadac, args, command.name.as_deref())?
        }
    };
    let summary = ExecutionSummary {
        elapsed: started.elapsed(),
        ..summary
    };

    if let Some(path) = &command.output {
        write_point_file(&summary.result, path)?;
    }
    if let Some(path) = &command.borders {
        write_border_file(&summary.result, path)?;
    }

    info!(
        data_source = summary.data_source.as_str(),
        clusters = summary.result.cluster_count(),
        elapsed_ms = summary.elapsed.as_millis(),
        "command completed"
    );
    Ok(summary)
}

/// Translates command-line flags into a validated [`Dadac`].
pub(super) fn configure(command: &RunCommand, image: Option<&ImageArgs>) -> Result<Dadac, CliError> {
    let mut builder = DadacBuilder::new()
        .with_neighbours(command.neighbours)
        .with_z(command.z)
        .with_halo(!command.no_halo);
    if command.halo_flag {
        builder = builder.with_halo_labelling(HaloLabelling::Flag);
    }
    if command.sparse_borders || command.dense_borders {
        builder = builder.with_sparse_borders(command.sparse_borders);
    }
    if let Some(dimension) = command.dimension {
        builder = builder.with_dimension(dimension);
    }
    if let Some(threshold) = command.likelihood_threshold {
        builder = builder.with_likelihood_threshold(threshold);
    }
    if let Some(threads) = command.threads {
        builder = builder.with_threads(threads);
    }
    if let Some(bytes) = command.max_bytes {
        info!(limit = %format_bytes(bytes), "memory guard enabled");
        builder = builder.with_max_bytes(bytes);
    }
    if let Some(args) = image {
        builder = builder.with_window_radius(args.window_radius);
        if args.intensity {
            builder = builder.with_image_density(ImageDensity::Intensity);
        }
    }
    Ok(builder.build()?)
}

const fn precision(float64: bool) -> Precision {
    if float64 {
        Precision::Float64
    } else {
        Precision::Float32
    }
}

#[instrument(
    name = "cli.run_raw",
    err,
    skip(dadac, args, name),
    fields(path = %args.path.display(), dims = args.dims),
)]
fn run_raw(dadac: &Dadac, args: &RawArgs, name: Option<&str>) -> Result<ExecutionSummary, CliError> {
    let chosen_name = derive_data_source_name(&args.path, name);
    let provider = DenseMatrixProvider::try_from_raw_path(
        chosen_name,
        &args.path,
        args.dims,
        precision(args.float64),
    )?;
    cluster_points(dadac, &provider)
}

#[instrument(
    name = "cli.run_parquet",
    err,
    skip(dadac, args, name),
    fields(path = %args.path.display(), column = %args.column),
)]
fn run_parquet(
    dadac: &Dadac,
    args: &ParquetArgs,
    name: Option<&str>,
) -> Result<ExecutionSummary, CliError> {
    let chosen_name = derive_data_source_name(&args.path, name);
    let provider = DenseMatrixProvider::try_from_parquet_path(chosen_name, &args.path, &args.column)?;
    cluster_points(dadac, &provider)
}

fn cluster_points(
    dadac: &Dadac,
    provider: &DenseMatrixProvider,
) -> Result<ExecutionSummary, CliError> {
    let result = dadac.run(provider)?;
    Ok(ExecutionSummary {
        data_source: provider.name().to_owned(),
        result,
        elapsed: Duration::ZERO,
    })
}

#[instrument(
    name = "cli.run_image",
    err,
    skip(dadac, args, name),
    fields(values = %args.values.display(), rows = args.rows, cols = args.cols),
)]
fn run_image(
    dadac: &Dadac,
    args: &ImageArgs,
    name: Option<&str>,
) -> Result<ExecutionSummary, CliError> {
    let image = RawImage {
        values: args.values.clone(),
        mask: args.mask.clone(),
        rows: args.rows,
        cols: args.cols,
        precision: precision(args.float64),
    };
    let grid = image
        .load()?
        .with_name(derive_data_source_name(&args.values, name));
    let result = dadac.run_image(&grid)?;
    Ok(ExecutionSummary {
        data_source: grid.name().to_owned(),
        result,
        elapsed: Duration::ZERO,
    })
}

pub(super) fn derive_data_source_name(path: &Path, override_name: Option<&str>) -> String {
    if let Some(name) = override_name {
        return name.to_owned();
    }

    path.file_stem()
        .and_then(|value| value.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| "data_source".to_owned())
}

/// Parses a byte count with an optional binary suffix.
///
/// `K`, `M`, `G` and `T` (any case, optionally followed by `B` or `iB`)
/// multiply by successive powers of 1024.
///
/// # Errors
/// Returns a message when the number is missing, not a non-negative
/// integer, the suffix is unknown or the value overflows `u64`.
pub(crate) fn parse_byte_size(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(format!("`{raw}` does not start with a byte count"));
    }
    let value: u64 = digits
        .parse()
        .map_err(|err| format!("`{raw}` is not a valid byte count: {err}"))?;
    let shift = match suffix.to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        "t" | "tb" | "tib" => 40,
        _ => return Err(format!("`{raw}` has an unknown size suffix `{suffix}`")),
    };
    value
        .checked_mul(1_u64 << shift)
        .ok_or_else(|| format!("`{raw}` overflows a 64-bit byte count"))
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    let result = &summary.result;
    let timings = result.timings();
    writeln!(writer, "data source: {}", summary.data_source)?;
    writeln!(writer, "points: {}", result.points().len())?;
    writeln!(writer, "intrinsic dimension: {:.4}", result.intrinsic_dimension())?;
    writeln!(writer, "peaks: {}", result.peak_count())?;
    writeln!(writer, "clusters: {}", result.cluster_count())?;
    writeln!(writer, "halo points: {}", result.halo_count())?;
    writeln!(writer, "excluded points: {}", result.excluded_count())?;
    writeln!(writer, "neighbours: {:.3} ms", duration_ms(timings.neighbours))?;
    writeln!(writer, "density: {:.3} ms", duration_ms(timings.density))?;
    writeln!(writer, "peak discovery: {:.3} ms", duration_ms(timings.peaks))?;
    writeln!(writer, "border detection: {:.3} ms", duration_ms(timings.borders))?;
    writeln!(writer, "merging: {:.3} ms", duration_ms(timings.merging))?;
    writeln!(writer, "total: {:.3} ms", duration_ms(summary.elapsed))?;
    Ok(())
}

/// Exit code for command-line usage errors.
pub const USAGE_EXIT_CODE: u8 = 2;

/// Writes a clap parse failure to `writer` and returns the exit code it maps
/// to: `0` for help and version output, [`USAGE_EXIT_CODE`] otherwise.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_parse_error(error: &clap::Error, mut writer: impl Write) -> io::Result<u8> {
    write!(writer, "{error}")?;
    writer.flush()?;
    Ok(if error.use_stderr() { USAGE_EXIT_CODE } else { 0 })
}
