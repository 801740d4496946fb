//! Maximum spanning trees over small weighted graphs.

/// Disjoint-set forest with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    /// Creates `size` singleton sets.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    /// Returns the representative of `idx`'s set.
    pub fn find(&mut self, idx: usize) -> usize {
        if self.parent[idx] != idx {
            let root = self.find(self.parent[idx]);
            self.parent[idx] = root;
        }
        self.parent[idx]
    }

    /// Merges the sets of `left` and `right`.
    ///
    /// Returns false if they were already in the same set.
    pub fn union(&mut self, left: usize, right: usize) -> bool {
        let left_root = self.find(left);
        let right_root = self.find(right);
        if left_root == right_root {
            return false;
        }
        match self.rank[left_root].cmp(&self.rank[right_root]) {
            std::cmp::Ordering::Less => self.parent[left_root] = right_root,
            std::cmp::Ordering::Greater => self.parent[right_root] = left_root,
            std::cmp::Ordering::Equal => {
                self.parent[right_root] = left_root;
                self.rank[left_root] += 1;
            }
        }
        true
    }
}

/// An undirected weighted edge between two node indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedEdge {
    /// First endpoint.
    pub a: usize,
    /// Second endpoint.
    pub b: usize,
    /// Edge weight; higher is preferred.
    pub weight: f64,
}

impl WeightedEdge {
    /// Creates an edge.
    #[must_use]
    pub fn new(a: usize, b: usize, weight: f64) -> Self {
        Self { a, b, weight }
    }
}

/// Kruskal's algorithm, keeping the heaviest edges.
///
/// Edges are considered by descending weight; equal weights keep their
/// input order, so the result is deterministic for a given edge list. For a
/// disconnected graph the result is a spanning forest.
#[must_use]
pub fn maximum_spanning_tree(node_count: usize, edges: &[WeightedEdge]) -> Vec<WeightedEdge> {
    let mut sorted: Vec<&WeightedEdge> = edges
        .iter()
        .filter(|e| e.a < node_count && e.b < node_count)
        .collect();
    sorted.sort_by(|x, y| y.weight.total_cmp(&x.weight));

    let mut sets = UnionFind::new(node_count);
    let mut tree = Vec::with_capacity(node_count.saturating_sub(1));
    for edge in sorted {
        if sets.union(edge.a, edge.b) {
            tree.push(*edge);
            if tree.len() + 1 == node_count {
                break;
            }
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_find() {
        let mut sets = UnionFind::new(4);
        assert!(sets.union(0, 1));
        assert!(sets.union(2, 3));
        assert!(!sets.union(1, 0));
        assert_ne!(sets.find(0), sets.find(2));
        assert!(sets.union(1, 3));
        assert_eq!(sets.find(0), sets.find(2));
    }

    #[test]
    fn test_keeps_heaviest_edges() {
        let edges = [
            WeightedEdge::new(0, 1, 0.9),
            WeightedEdge::new(0, 2, 0.1),
            WeightedEdge::new(1, 2, 0.5),
            WeightedEdge::new(2, 3, 0.3),
            WeightedEdge::new(1, 3, 0.2),
        ];
        let tree = maximum_spanning_tree(4, &edges);
        let weights: Vec<f64> = tree.iter().map(|e| e.weight).collect();
        assert_eq!(weights, vec![0.9, 0.5, 0.3]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let edges = [
            WeightedEdge::new(0, 1, 0.5),
            WeightedEdge::new(1, 2, 0.5),
            WeightedEdge::new(0, 2, 0.5),
        ];
        let tree = maximum_spanning_tree(3, &edges);
        assert_eq!(tree, vec![edges[0], edges[1]]);
    }

    #[test]
    fn test_forest_and_trivial_graphs() {
        assert!(maximum_spanning_tree(0, &[]).is_empty());
        assert!(maximum_spanning_tree(1, &[]).is_empty());
        let tree = maximum_spanning_tree(4, &[WeightedEdge::new(0, 1, 1.0)]);
        assert_eq!(tree.len(), 1);
    }
}
