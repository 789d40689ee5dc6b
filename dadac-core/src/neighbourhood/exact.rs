//! Brute-force exact nearest neighbour search.

use std::cmp::Ordering;

use super::{Neighbour, NeighbourProvider};
use crate::{datasource::DataSource, error::DataSourceError};

/// [`NeighbourProvider`] computing exact neighbours of a [`DataSource`] by
/// scanning every candidate.
///
/// Ties on distance resolve to the lower index, except that the query point
/// always comes first.
///
/// # Examples
/// ```
/// use dadac_core::{DataSource, DataSourceError, ExactNeighbours, NeighbourProvider};
///
/// struct Line(Vec<f64>);
///
/// impl DataSource for Line {
///     fn len(&self) -> usize { self.0.len() }
///     fn name(&self) -> &str { "line" }
///     fn squared_distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError> {
///         let a = self.0.get(i).ok_or(DataSourceError::OutOfBounds { index: i })?;
///         let b = self.0.get(j).ok_or(DataSourceError::OutOfBounds { index: j })?;
///         Ok((a - b) * (a - b))
///     }
/// }
///
/// let line = Line(vec![0.0, 1.0, 3.0]);
/// let provider = ExactNeighbours::new(&line);
/// let row = provider.find_neighbours(2, 2)?;
/// assert_eq!(row[0].index, 2);
/// assert_eq!(row[1].index, 1);
/// # Ok::<(), DataSourceError>(())
/// ```
#[derive(Debug)]
pub struct ExactNeighbours<'a, D: ?Sized> {
    source: &'a D,
    candidates: Vec<usize>,
}

impl<'a, D: DataSource + ?Sized> ExactNeighbours<'a, D> {
    /// Wraps `source`.
    #[must_use]
    pub fn new(source: &'a D) -> Self {
        Self {
            source,
            candidates: (0..source.len()).collect(),
        }
    }
}

impl<D: DataSource + ?Sized> NeighbourProvider for ExactNeighbours<'_, D> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn name(&self) -> &str {
        self.source.name()
    }

    fn find_neighbours(&self, point: usize, k: usize) -> Result<Vec<Neighbour>, DataSourceError> {
        if point >= self.candidates.len() {
            return Err(DataSourceError::OutOfBounds { index: point });
        }
        let distances = self
            .source
            .batch_squared_distances(point, &self.candidates)?;
        let mut row: Vec<Neighbour> = self
            .candidates
            .iter()
            .zip(distances)
            .map(|(&index, sq_distance)| {
                let distance = if index == point { 0.0 } else { sq_distance };
                Neighbour::new(index, distance)
            })
            .collect();

        let by_rank = |left: &Neighbour, right: &Neighbour| rank(point, left, right);
        let keep = k.min(row.len());
        if keep > 0 && keep < row.len() {
            row.select_nth_unstable_by(keep - 1, by_rank);
            row.truncate(keep);
        }
        row.sort_unstable_by(by_rank);
        row.truncate(keep);
        Ok(row)
    }
}

fn rank(point: usize, left: &Neighbour, right: &Neighbour) -> Ordering {
    left.sq_distance
        .total_cmp(&right.sq_distance)
        .then_with(|| (left.index != point).cmp(&(right.index != point)))
        .then(left.index.cmp(&right.index))
}
