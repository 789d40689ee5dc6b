//! Data source abstractions for point-cloud clustering.

use crate::error::DataSourceError;

/// Abstraction over a collection of points that can yield pairwise squared
/// distances.
///
/// Density estimation only ever needs squared Euclidean distances, so sources
/// report those directly and skip the square root.
///
/// # Examples
/// ```
/// use dadac_core::{DataSource, DataSourceError};
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
/// let src = Line(vec![1.0, 2.0, 4.0]);
/// assert_eq!(src.len(), 3);
/// assert_eq!(src.squared_distance(0, 2)?, 9.0);
///
/// let batched = src.batch_squared_distances(0, &[1, 2])?;
/// assert_eq!(batched, [1.0, 9.0]);
/// # Ok::<(), DataSourceError>(())
/// ```
pub trait DataSource {
    /// Returns number of points in the source.
    fn len(&self) -> usize;

    /// Returns whether the source contains no points.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a human-readable name.
    fn name(&self) -> &str;

    /// Returns the number of coordinates per point, when the source knows it.
    fn dimensions(&self) -> Option<usize> {
        None
    }

    /// Computes the squared distance between two points.
    fn squared_distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError>;

    /// Computes the squared distances from `query` to every entry in
    /// `candidates`.
    ///
    /// The default implementation calls [`DataSource::squared_distance`]
    /// repeatedly. Dense sources override it with a row-slice kernel.
    ///
    /// # Errors
    /// Returns any [`DataSourceError`] surfaced by
    /// [`DataSource::squared_distance`]. Implementations must return
    /// [`DataSourceError::OutOfBounds`] for invalid indices.
    fn batch_squared_distances(
        &self,
        query: usize,
        candidates: &[usize],
    ) -> Result<Vec<f64>, DataSourceError> {
        candidates
            .iter()
            .map(|&candidate| self.squared_distance(query, candidate))
            .collect()
    }
}
