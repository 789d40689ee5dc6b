//! Cluster union-find used while merging peaks.
//!
//! Each component remembers which original cluster id survives it, so the
//! final relabelling does not depend on which root the ranks happened to pick.

#[derive(Clone, Debug)]
pub(super) struct ClusterSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
    survivor: Vec<usize>,
}

impl ClusterSets {
    pub(super) fn new(clusters: usize) -> Self {
        Self {
            parent: (0..clusters).collect(),
            rank: vec![0; clusters],
            survivor: (0..clusters).collect(),
        }
    }

    pub(super) fn find(&mut self, mut cluster: usize) -> usize {
        let mut root = cluster;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[cluster] != cluster {
            let parent = self.parent[cluster];
            self.parent[cluster] = root;
            cluster = parent;
        }

        root
    }

    /// Cluster id standing for the component holding `cluster`.
    pub(super) fn survivor(&mut self, cluster: usize) -> usize {
        let root = self.find(cluster);
        self.survivor[root]
    }

    /// Joins the components of `keep` and `gone`; `keep` survives.
    pub(super) fn merge_into(&mut self, keep: usize, gone: usize) {
        let mut left = self.find(keep);
        let mut right = self.find(gone);
        if left == right {
            return;
        }
        let survivor = self.survivor[left];
        let left_rank = self.rank[left];
        let right_rank = self.rank[right];
        if left_rank < right_rank {
            std::mem::swap(&mut left, &mut right);
        }
        self.parent[right] = left;
        if left_rank == right_rank {
            self.rank[left] = left_rank.saturating_add(1);
        }
        self.survivor[left] = survivor;
    }
}
