//! Command-line interface orchestration for dadac.
//!
//! The `run` command loads a raw or Parquet point cloud, or a raw image with
//! its mask, clusters it and optionally writes the point-info and border
//! files.

mod commands;
mod output;

pub use commands::{
    Cli, CliError, Command, ExecutionSummary, ImageArgs, ParquetArgs, RawArgs, RunCommand,
    RunSource, USAGE_EXIT_CODE, render_parse_error, render_summary, run_cli,
};
pub use output::{write_borders, write_point_info};

#[cfg(test)]
mod tests;
