//! Seeded synthetic data sets for clustering tests and benchmarks.

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng, rngs::SmallRng, seq::SliceRandom};

/// Points drawn from isotropic Gaussian blobs, with the blob of every point.
#[derive(Clone, Debug, PartialEq)]
pub struct Blobs {
    /// Row-major coordinates.
    pub points: Vec<Vec<f64>>,
    /// Index of the blob each point was drawn from.
    pub labels: Vec<usize>,
}

/// Draws `per_blob` points around every center with standard deviation
/// `sigma`, blob by blob.
///
/// # Examples
/// ```
/// use dadac_test_support::synthetic::gaussian_blobs;
///
/// let blobs = gaussian_blobs(&[vec![0.0, 0.0], vec![10.0, 0.0]], 50, 1.0, 7);
/// assert_eq!(blobs.points.len(), 100);
/// assert_eq!(blobs.labels[99], 1);
/// assert_eq!(blobs, gaussian_blobs(&[vec![0.0, 0.0], vec![10.0, 0.0]], 50, 1.0, 7));
/// ```
#[must_use]
pub fn gaussian_blobs(centers: &[Vec<f64>], per_blob: usize, sigma: f64, seed: u64) -> Blobs {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(centers.len() * per_blob);
    let mut labels = Vec::with_capacity(centers.len() * per_blob);
    for (label, center) in centers.iter().enumerate() {
        for _ in 0..per_blob {
            points.push(
                center
                    .iter()
                    .map(|&coordinate| coordinate + sigma * standard_normal(&mut rng))
                    .collect(),
            );
            labels.push(label);
        }
    }
    Blobs { points, labels }
}

/// Box-Muller draw from the standard normal distribution.
pub fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// Points of a `side x side` square lattice with the given spacing, in
/// row-major order.
///
/// # Examples
/// ```
/// use dadac_test_support::synthetic::lattice;
///
/// let grid = lattice(3, 0.5);
/// assert_eq!(grid.len(), 9);
/// assert_eq!(grid[4], vec![0.5, 0.5]);
/// ```
#[must_use]
pub fn lattice(side: usize, spacing: f64) -> Vec<Vec<f64>> {
    (0..side)
        .flat_map(|row| (0..side).map(move |col| vec![row as f64 * spacing, col as f64 * spacing]))
        .collect()
}

/// A seeded permutation of `0..len`.
#[must_use]
pub fn permutation(len: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(&mut SmallRng::seed_from_u64(seed));
    order
}

/// A binary image holding filled disks.
#[derive(Clone, Debug, PartialEq)]
pub struct DiskImage {
    /// Row count.
    pub rows: usize,
    /// Column count.
    pub cols: usize,
    /// `1.0` inside a disk, `0.0` elsewhere.
    pub values: Vec<f64>,
    /// Non-zero inside a disk.
    pub mask: Vec<i32>,
}

impl DiskImage {
    /// Index of the disk holding `pixel`, if any.
    #[must_use]
    pub fn disk_of(&self, pixel: usize, centers: &[(usize, usize)], radius: usize) -> Option<usize> {
        let (row, col) = (pixel / self.cols, pixel % self.cols);
        centers
            .iter()
            .position(|&(r, c)| inside(row, col, r, c, radius))
    }
}

fn inside(row: usize, col: usize, center_row: usize, center_col: usize, radius: usize) -> bool {
    let dr = row.abs_diff(center_row);
    let dc = col.abs_diff(center_col);
    dr * dr + dc * dc <= radius * radius
}

/// Draws disks of `radius` pixels at `centers` (row, column); everything
/// else is masked.
///
/// # Examples
/// ```
/// use dadac_test_support::synthetic::disk_image;
///
/// let image = disk_image(20, 20, 3, &[(5, 5)]);
/// assert_eq!(image.mask[5 * 20 + 5], 1);
/// assert_eq!(image.mask[0], 0);
/// ```
#[must_use]
pub fn disk_image(rows: usize, cols: usize, radius: usize, centers: &[(usize, usize)]) -> DiskImage {
    let mask: Vec<i32> = (0..rows * cols)
        .map(|pixel| {
            let (row, col) = (pixel / cols, pixel % cols);
            i32::from(
                centers
                    .iter()
                    .any(|&(r, c)| inside(row, col, r, c, radius)),
            )
        })
        .collect();
    let values = mask.iter().map(|&valid| f64::from(valid)).collect();
    DiskImage {
        rows,
        cols,
        values,
        mask,
    }
}
