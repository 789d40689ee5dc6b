//! Per-point neighbour lists and the providers that produce them.
//!
//! Every row lists a point's nearest neighbours by ascending squared
//! distance, starting with the point itself at distance zero. Rows are
//! validated once on construction and stored contiguously so later stages can
//! borrow them as slices.

mod exact;

use std::{cmp::Ordering, collections::HashSet, sync::Arc};

use rayon::prelude::*;
use tracing::{debug, instrument};

pub use self::exact::ExactNeighbours;
use crate::{
    datasource::DataSource,
    error::{DadacError, DataSourceError, NeighbourhoodFault, Result},
};

/// A neighbour entry: the neighbour's index and its squared distance.
///
/// # Examples
/// ```
/// use dadac_core::Neighbour;
///
/// let neighbour = Neighbour::new(3, 0.25);
/// assert_eq!(neighbour.index, 3);
/// assert!(neighbour < Neighbour::new(1, 0.5));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    /// Index of the neighbour within the input.
    pub index: usize,
    /// Squared distance between the query point and [`Neighbour::index`].
    pub sq_distance: f64,
}

impl Neighbour {
    /// Creates a neighbour entry.
    #[must_use]
    pub const fn new(index: usize, sq_distance: f64) -> Self {
        Self { index, sq_distance }
    }
}

impl Eq for Neighbour {}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sq_distance
            .total_cmp(&other.sq_distance)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Capability yielding the nearest neighbours of a point.
///
/// Rows must start with `(point, 0.0)` and list the remaining neighbours by
/// ascending squared distance. Point-cloud providers return exactly `k`
/// entries; grid providers may return fewer when masking leaves a point
/// isolated.
pub trait NeighbourProvider {
    /// Number of points the provider covers.
    fn len(&self) -> usize;

    /// Returns whether the provider covers no points.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable name used in errors and logs.
    fn name(&self) -> &str;

    /// Returns up to `k` neighbours of `point`, itself included.
    ///
    /// # Errors
    /// Returns a [`DataSourceError`] when the underlying data cannot be read.
    fn find_neighbours(&self, point: usize, k: usize) -> Result<Vec<Neighbour>, DataSourceError>;
}

/// Whether every row must hold exactly `k` entries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RowLength {
    Exact(usize),
    AtMost(usize),
}

impl RowLength {
    const fn limit(self) -> usize {
        match self {
            Self::Exact(k) | Self::AtMost(k) => k,
        }
    }
}

/// Validated neighbour rows for every point, stored contiguously.
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbourhoods {
    offsets: Vec<usize>,
    entries: Vec<Neighbour>,
    k: usize,
}

impl Neighbourhoods {
    /// Builds neighbourhoods from caller-supplied rows of exactly `k`
    /// entries each.
    ///
    /// # Errors
    /// Returns [`DadacError::InconsistentNeighbourhood`] when a row does not
    /// start with the point itself, is not sorted, references an unknown or
    /// repeated point, or holds the wrong number of entries.
    ///
    /// # Examples
    /// ```
    /// use dadac_core::{Neighbour, Neighbourhoods};
    ///
    /// let rows = vec![
    ///     vec![Neighbour::new(0, 0.0), Neighbour::new(1, 1.0)],
    ///     vec![Neighbour::new(1, 0.0), Neighbour::new(0, 1.0)],
    /// ];
    /// let neighbourhoods = Neighbourhoods::try_from_rows(rows, 2)?;
    /// assert_eq!(neighbourhoods.len(), 2);
    /// assert_eq!(neighbourhoods.row(1)[1].index, 0);
    /// # Ok::<(), dadac_core::DadacError>(())
    /// ```
    pub fn try_from_rows(rows: Vec<Vec<Neighbour>>, k: usize) -> Result<Self> {
        Self::from_validated_rows(rows, RowLength::Exact(k))
    }

    /// Collects `k` neighbours per point from `provider` in parallel.
    ///
    /// # Errors
    /// Returns [`DadacError::DataSource`] when the provider fails and
    /// [`DadacError::InconsistentNeighbourhood`] when a row is malformed.
    pub fn from_provider<P>(provider: &P, k: usize) -> Result<Self>
    where
        P: NeighbourProvider + Sync + ?Sized,
    {
        Self::collect(provider, RowLength::Exact(k))
    }

    /// Computes exact `k`-nearest neighbourhoods of a [`DataSource`] by brute
    /// force.
    ///
    /// # Errors
    /// See [`Self::from_provider`].
    pub fn exact<D>(source: &D, k: usize) -> Result<Self>
    where
        D: DataSource + Sync + ?Sized,
    {
        Self::from_provider(&ExactNeighbours::new(source), k)
    }

    #[instrument(
        name = "core.neighbours",
        skip(provider),
        fields(points = provider.len(), neighbours = rows.limit()),
    )]
    pub(crate) fn collect<P>(provider: &P, rows: RowLength) -> Result<Self>
    where
        P: NeighbourProvider + Sync + ?Sized,
    {
        let name: Arc<str> = Arc::from(provider.name());
        let limit = rows.limit();
        let collected = (0..provider.len())
            .into_par_iter()
            .map(|point| {
                provider
                    .find_neighbours(point, limit)
                    .map_err(|error| DadacError::DataSource {
                        data_source: Arc::clone(&name),
                        error,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let neighbourhoods = Self::from_validated_rows(collected, rows)?;
        debug!(entries = neighbourhoods.entries.len(), "neighbourhoods ready");
        Ok(neighbourhoods)
    }

    pub(crate) fn from_validated_rows(rows: Vec<Vec<Neighbour>>, length: RowLength) -> Result<Self> {
        let count = rows.len();
        rows.iter()
            .enumerate()
            .try_for_each(|(point, row)| {
                validate_row(point, row, count, length)
                    .map_err(|fault| DadacError::InconsistentNeighbourhood { point, fault })
            })?;

        let mut offsets = Vec::with_capacity(count + 1);
        let mut entries = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        offsets.push(0);
        for row in rows {
            entries.extend(row);
            offsets.push(entries.len());
        }
        Ok(Self {
            offsets,
            entries,
            k: length.limit(),
        })
    }

    /// Number of points covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Returns whether no points are covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries per row, self included.
    #[rustfmt::skip]
    #[must_use]
    pub fn k(&self) -> usize { self.k }

    /// Returns the row for `point`.
    ///
    /// # Panics
    /// Panics when `point >= self.len()`.
    #[must_use]
    pub fn row(&self, point: usize) -> &[Neighbour] {
        &self.entries[self.offsets[point]..self.offsets[point + 1]]
    }

    /// Iterates over all rows in point order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[Neighbour]> + '_ {
        self.offsets
            .windows(2)
            .map(|bounds| &self.entries[bounds[0]..bounds[1]])
    }
}

fn validate_row(
    point: usize,
    row: &[Neighbour],
    count: usize,
    length: RowLength,
) -> Result<(), NeighbourhoodFault> {
    match length {
        RowLength::Exact(expected) if row.len() != expected => {
            return Err(NeighbourhoodFault::WrongLength {
                expected,
                got: row.len(),
            });
        }
        RowLength::AtMost(limit) if row.len() > limit => {
            return Err(NeighbourhoodFault::WrongLength {
                expected: limit,
                got: row.len(),
            });
        }
        _ => {}
    }

    let first = row.first().ok_or(NeighbourhoodFault::MissingSelf)?;
    if first.index != point {
        return Err(NeighbourhoodFault::MissingSelf);
    }
    if first.sq_distance != 0.0 {
        return Err(NeighbourhoodFault::NonZeroSelfDistance);
    }

    let mut seen = HashSet::with_capacity(row.len());
    let mut previous = 0.0_f64;
    for (position, neighbour) in row.iter().enumerate() {
        if !neighbour.sq_distance.is_finite() || neighbour.sq_distance < 0.0 {
            return Err(NeighbourhoodFault::InvalidDistance { position });
        }
        if neighbour.sq_distance < previous {
            return Err(NeighbourhoodFault::Unsorted { position });
        }
        if neighbour.index >= count {
            return Err(NeighbourhoodFault::OutOfRange {
                neighbour: neighbour.index,
            });
        }
        if !seen.insert(neighbour.index) {
            return Err(NeighbourhoodFault::Duplicate {
                neighbour: neighbour.index,
            });
        }
        previous = neighbour.sq_distance;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{neighbourhoods_for, row};
    use rstest::rstest;

    fn line(count: usize) -> Vec<Vec<f64>> {
        (0..count).map(|i| vec![i as f64]).collect()
    }

    #[test]
    fn exact_rows_start_with_self_and_ascend() {
        let neighbourhoods = neighbourhoods_for(line(6), 3);

        assert_eq!(neighbourhoods.len(), 6);
        for (point, entries) in neighbourhoods.rows().enumerate() {
            assert_eq!(entries.len(), 3);
            assert_eq!(entries[0], Neighbour::new(point, 0.0));
            assert!(entries.windows(2).all(|pair| pair[0].sq_distance <= pair[1].sq_distance));
        }
    }

    #[test]
    fn exact_rows_break_ties_by_index() {
        let neighbourhoods = neighbourhoods_for(line(5), 3);

        assert_eq!(
            neighbourhoods.row(2),
            row(&[(2, 0.0), (1, 1.0), (3, 1.0)]).as_slice()
        );
    }

    #[test]
    fn duplicates_keep_self_first() {
        let neighbourhoods = neighbourhoods_for(vec![vec![0.0], vec![0.0], vec![5.0]], 2);

        assert_eq!(neighbourhoods.row(1), row(&[(1, 0.0), (0, 0.0)]).as_slice());
    }

    #[rstest]
    #[case::missing_self(row(&[(1, 0.0), (0, 1.0), (2, 1.0)]), NeighbourhoodFault::MissingSelf)]
    #[case::self_distance(row(&[(0, 0.5), (1, 1.0), (2, 1.0)]), NeighbourhoodFault::NonZeroSelfDistance)]
    #[case::unsorted(row(&[(0, 0.0), (1, 2.0), (2, 1.0)]), NeighbourhoodFault::Unsorted { position: 2 })]
    #[case::nan(row(&[(0, 0.0), (1, f64::NAN), (2, 1.0)]), NeighbourhoodFault::InvalidDistance { position: 1 })]
    #[case::out_of_range(row(&[(0, 0.0), (7, 1.0), (2, 1.0)]), NeighbourhoodFault::OutOfRange { neighbour: 7 })]
    #[case::duplicate(row(&[(0, 0.0), (1, 1.0), (1, 1.0)]), NeighbourhoodFault::Duplicate { neighbour: 1 })]
    fn try_from_rows_rejects_faulty_first_row(
        #[case] first: Vec<Neighbour>,
        #[case] expected: NeighbourhoodFault,
    ) {
        let mut rows = vec![first];
        rows.push(row(&[(1, 0.0), (0, 1.0), (2, 1.0)]));
        rows.push(row(&[(2, 0.0), (1, 1.0), (0, 4.0)]));
        let err = Neighbourhoods::try_from_rows(rows, 3).expect_err("row must be rejected");

        assert_eq!(
            err,
            DadacError::InconsistentNeighbourhood {
                point: 0,
                fault: expected
            }
        );
    }

    #[test]
    fn try_from_rows_rejects_wrong_length() {
        let rows = vec![
            row(&[(0, 0.0), (1, 1.0)]),
            row(&[(1, 0.0)]),
        ];

        let err = Neighbourhoods::try_from_rows(rows, 2).expect_err("short row must fail");

        assert_eq!(
            err,
            DadacError::InconsistentNeighbourhood {
                point: 1,
                fault: NeighbourhoodFault::WrongLength {
                    expected: 2,
                    got: 1
                }
            }
        );
    }

    #[test]
    fn variable_rows_accept_short_rows() {
        let rows = vec![row(&[(0, 0.0), (1, 1.0)]), row(&[(1, 0.0)])];

        let neighbourhoods = Neighbourhoods::from_validated_rows(rows, RowLength::AtMost(3))
            .expect("short rows are allowed");

        assert_eq!(neighbourhoods.row(1).len(), 1);
        assert_eq!(neighbourhoods.k(), 3);
    }
}
