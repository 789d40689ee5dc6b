//! CLI entry point for dadac.
//!
//! Parses command-line arguments with clap, runs the clustering pipeline,
//! renders the summary to stdout and maps errors to exit codes. Logging is
//! initialised first so every later step can emit structured diagnostics.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use dadac_cli::{
    cli::{Cli, CliError, render_parse_error, render_summary, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

/// Execute the parsed command, render the summary and flush the output stream.
fn try_main(cli: Cli) -> Result<()> {
    let summary = run_cli(cli).context("failed to execute command")?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    render_summary(&summary, &mut writer).context("failed to render summary")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let rendered = if err.use_stderr() {
                render_parse_error(&err, io::stderr().lock())
            } else {
                render_parse_error(&err, io::stdout().lock())
            };
            return match rendered {
                Ok(code) => ExitCode::from(code),
                Err(write_err) => {
                    report_parse_output_error(&write_err);
                    ExitCode::FAILURE
                }
            };
        }
    };

    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main(cli) {
        let cli_error = err.downcast_ref::<CliError>();
        let core = cli_error.and_then(CliError::core);
        let code_field = core.map(|core| field::display(core.code().as_str()));
        let data_source_code_field = core
            .and_then(|core| core.data_source_code())
            .map(|code| field::display(code.as_str()));

        error!(
            error = %format!("{err:#}"),
            code = code_field,
            data_source_code = data_source_code_field,
            "command execution failed"
        );
        return ExitCode::from(cli_error.map_or(1, CliError::exit_code));
    }

    ExitCode::SUCCESS
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialised"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialise logging: {err}");
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialised"
)]
fn report_parse_output_error(err: &io::Error) {
    eprintln!("failed to write command-line usage: {err}");
}
