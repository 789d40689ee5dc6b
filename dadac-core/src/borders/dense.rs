//! Dense `C x C` border table.

use super::{Border, BorderStore};

/// Border records in a flat row-major table.
///
/// Each pair is stored once, in the cell `(min, max)`.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseBorders {
    clusters: usize,
    cells: Vec<Option<Border>>,
}

impl DenseBorders {
    /// Empty table for `clusters` clusters.
    #[must_use]
    pub fn new(clusters: usize) -> Self {
        Self {
            clusters,
            cells: vec![None; clusters.saturating_mul(clusters)],
        }
    }

    fn cell(&self, a: usize, b: usize) -> Option<usize> {
        let (low, high) = (a.min(b), a.max(b));
        (high < self.clusters).then(|| low * self.clusters + high)
    }
}

impl BorderStore for DenseBorders {
    #[rustfmt::skip]
    fn cluster_count(&self) -> usize { self.clusters }

    fn get(&self, a: usize, b: usize) -> Option<Border> {
        self.cell(a, b).and_then(|cell| self.cells[cell])
    }

    fn set(&mut self, a: usize, b: usize, border: Option<Border>) {
        if let Some(cell) = self.cell(a, b) {
            self.cells[cell] = border;
        }
    }

    fn neighbours(&self, a: usize) -> Vec<(usize, Border)> {
        (0..self.clusters)
            .filter(|&other| other != a)
            .filter_map(|other| self.get(a, other).map(|border| (other, border)))
            .collect()
    }

    fn iter_pairs(&self) -> Vec<(usize, usize, Border)> {
        (0..self.clusters)
            .flat_map(|a| {
                (a + 1..self.clusters)
                    .filter_map(move |b| self.get(a, b).map(|border| (a, b, border)))
            })
            .collect()
    }
}
