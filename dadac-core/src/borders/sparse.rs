//! Sparse per-cluster border maps.

use std::collections::BTreeMap;

use super::{Border, BorderStore};

/// Border records keyed by neighbouring cluster.
///
/// Each pair is stored in both directions so `neighbours` is a single map
/// walk.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseBorders {
    maps: Vec<BTreeMap<usize, Border>>,
}

impl SparseBorders {
    /// Empty maps for `clusters` clusters.
    #[must_use]
    pub fn new(clusters: usize) -> Self {
        Self {
            maps: vec![BTreeMap::new(); clusters],
        }
    }
}

impl BorderStore for SparseBorders {
    fn cluster_count(&self) -> usize {
        self.maps.len()
    }

    fn get(&self, a: usize, b: usize) -> Option<Border> {
        self.maps.get(a).and_then(|map| map.get(&b)).copied()
    }

    fn set(&mut self, a: usize, b: usize, border: Option<Border>) {
        if a.max(b) >= self.maps.len() {
            return;
        }
        for (from, to) in [(a, b), (b, a)] {
            let map = &mut self.maps[from];
            match border {
                Some(record) => {
                    map.insert(to, record);
                }
                None => {
                    map.remove(&to);
                }
            }
        }
    }

    fn neighbours(&self, a: usize) -> Vec<(usize, Border)> {
        self.maps.get(a).map_or_else(Vec::new, |map| {
            map.iter()
                .filter(|&(&other, _)| other != a)
                .map(|(&other, &border)| (other, border))
                .collect()
        })
    }

    fn iter_pairs(&self) -> Vec<(usize, usize, Border)> {
        self.maps
            .iter()
            .enumerate()
            .flat_map(|(a, map)| {
                map.range(a + 1..)
                    .map(move |(&b, &border)| (a, b, border))
            })
            .collect()
    }
}
