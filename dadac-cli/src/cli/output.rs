//! Point-info and border file writers.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use dadac_core::{BorderStore, ClusteringResult};
use tracing::{debug, instrument};

use super::commands::CliError;

/// Writes one tab-terminated line per point:
/// `kstar`, cluster index (`-1` when unassigned), `log_rho` with eleven
/// decimals and `1` for cluster centers, `0` otherwise.
///
/// # Errors
/// Returns [`io::Error`] if writing fails.
pub fn write_point_info(result: &ClusteringResult, mut writer: impl Write) -> io::Result<()> {
    for record in result.points() {
        writeln!(
            writer,
            "{}\t{}\t{:.11}\t{}\t",
            record.kstar,
            record.cluster_index(),
            record.log_rho,
            u8::from(record.is_center),
        )?;
    }
    Ok(())
}

/// Writes one line per cluster listing its saddle points in cluster order,
/// each followed by a space. The diagonal entry is the cluster's center.
///
/// # Errors
/// Returns [`io::Error`] if writing fails.
pub fn write_borders(result: &ClusteringResult, mut writer: impl Write) -> io::Result<()> {
    let store = result.border_store();
    for cluster in 0..store.cluster_count() {
        let mut entries = store.neighbours(cluster);
        if let Some(center) = store.get(cluster, cluster) {
            entries.push((cluster, center));
        }
        entries.sort_by_key(|&(other, _)| other);
        for (_, border) in entries {
            write!(writer, "{} ", border.point)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[instrument(name = "cli.write_points", err, skip(result), fields(path = %path.display()))]
pub(super) fn write_point_file(result: &ClusteringResult, path: &Path) -> Result<(), CliError> {
    write_file(path, |writer| write_point_info(result, writer))
}

#[instrument(name = "cli.write_borders", err, skip(result), fields(path = %path.display()))]
pub(super) fn write_border_file(result: &ClusteringResult, path: &Path) -> Result<(), CliError> {
    write_file(path, |writer| write_borders(result, writer))
}

fn write_file(
    path: &Path,
    render: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<(), CliError> {
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    render(&mut writer).map_err(io_error)?;
    writer.flush().map_err(io_error)?;
    debug!("output written");
    Ok(())
}
