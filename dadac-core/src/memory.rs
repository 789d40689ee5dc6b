//! Memory estimation for the clustering pipeline.
//!
//! Provides a conservative estimate of the point-state working set so callers
//! can reject oversized inputs before any allocation, plus the sizing rule
//! used to choose between dense and sparse border tables.

use std::mem::size_of;

use crate::{borders::Border, neighbourhood::Neighbour, point::PointInfo};

const SAFETY_MULTIPLIER_NUMERATOR: u64 = 3;
const SAFETY_MULTIPLIER_DENOMINATOR: u64 = 2;

/// Per-point scalars beyond [`PointInfo`]: labels, halo flags, sort order
/// and row offsets.
const PER_POINT_EXTRA_BYTES: u64 = 40;

/// Returns a conservative estimate of peak memory (in bytes) needed to
/// cluster `point_count` points with `neighbours` entries per row.
///
/// The estimate covers the neighbour rows, the per-point records and the
/// per-point bookkeeping of the heuristics, scaled by 1.5. Border tables are
/// sized separately by [`dense_border_bytes`] once the peak count is known.
///
/// # Examples
///
/// ```
/// use dadac_core::estimate_peak_bytes;
///
/// let bytes = estimate_peak_bytes(1_000, 50);
/// assert!(bytes > 0, "estimate must be positive for non-empty inputs");
/// assert_eq!(estimate_peak_bytes(0, 50), 0);
/// ```
#[must_use]
pub fn estimate_peak_bytes(point_count: usize, neighbours: usize) -> u64 {
    if point_count == 0 {
        return 0;
    }

    let n = point_count as u64;
    let k = neighbours as u64;

    let rows = n.saturating_mul(k.saturating_mul(size_of::<Neighbour>() as u64));
    let offsets = n.saturating_add(1).saturating_mul(size_of::<usize>() as u64);
    let records = n.saturating_mul(size_of::<PointInfo>() as u64);
    let bookkeeping = n.saturating_mul(PER_POINT_EXTRA_BYTES);

    rows.saturating_add(offsets)
        .saturating_add(records)
        .saturating_add(bookkeeping)
        .saturating_mul(SAFETY_MULTIPLIER_NUMERATOR)
        .saturating_div(SAFETY_MULTIPLIER_DENOMINATOR)
}

/// Bytes occupied by a dense `clusters × clusters` border table.
///
/// # Examples
///
/// ```
/// use dadac_core::dense_border_bytes;
///
/// assert_eq!(dense_border_bytes(0), 0);
/// assert!(dense_border_bytes(20) > dense_border_bytes(10));
/// ```
#[must_use]
pub fn dense_border_bytes(clusters: usize) -> u64 {
    let c = clusters as u64;
    c.saturating_mul(c)
        .saturating_mul(size_of::<Option<Border>>() as u64)
}

/// Formats a byte count as a human-readable string using binary units.
///
/// # Examples
///
/// ```
/// use dadac_core::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1_073_741_824), "1.0 GiB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    const TIB: u64 = 1024 * GIB;

    if bytes >= TIB {
        format!("{:.1} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::small(100, 5)]
    #[case::image(1_000_000, 9)]
    #[case::cloud(2_000, 200)]
    fn estimate_returns_positive_for_non_empty(#[case] point_count: usize, #[case] k: usize) {
        assert!(estimate_peak_bytes(point_count, k) > 0);
    }

    #[rstest]
    #[case::neighbours(1_000, 50, 1_000, 100)]
    #[case::points(1_000, 50, 2_000, 50)]
    fn estimate_grows_with_inputs(
        #[case] n_small: usize,
        #[case] k_small: usize,
        #[case] n_large: usize,
        #[case] k_large: usize,
    ) {
        let small = estimate_peak_bytes(n_small, k_small);
        let large = estimate_peak_bytes(n_large, k_large);
        assert!(large > small, "expected {large} > {small}");
    }

    #[test]
    fn estimate_covers_neighbour_rows() {
        let rows = 1_000 * 50 * size_of::<Neighbour>() as u64;
        assert!(estimate_peak_bytes(1_000, 50) > rows);
    }

    #[test]
    fn estimate_huge_inputs_saturate() {
        assert!(estimate_peak_bytes(usize::MAX, usize::MAX) > 0);
    }

    #[test]
    fn dense_borders_grow_quadratically() {
        assert_eq!(dense_border_bytes(20), 4 * dense_border_bytes(10));
    }

    #[rstest]
    #[case::zero(0, "0 B")]
    #[case::just_below_kib(1023, "1023 B")]
    #[case::one_and_half_kib(1536, "1.5 KiB")]
    #[case::one_mib(1_048_576, "1.0 MiB")]
    #[case::one_tib(1_099_511_627_776, "1.0 TiB")]
    fn format_bytes_uses_binary_units(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_bytes(bytes), expected);
    }
}
