//! Orienting undirected trees.

/// Orients the undirected `edges` away from `root` with a depth-first walk.
///
/// Returns `(parent, child)` pairs in discovery order. Neighbours are
/// visited in the order their edges appear in `edges`, so the output is
/// deterministic. Nodes unreachable from `root` are left out.
#[must_use]
pub fn orient_from(root: usize, node_count: usize, edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    if root >= node_count {
        return Vec::new();
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(a, b) in edges {
        if a < node_count && b < node_count && a != b {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
    }

    let mut visited = vec![false; node_count];
    let mut oriented = Vec::with_capacity(node_count.saturating_sub(1));
    // (node, next neighbour to look at)
    let mut stack = vec![(root, 0usize)];
    visited[root] = true;

    while let Some((node, next)) = stack.pop() {
        let Some(&neighbour) = adjacency[node].get(next) else {
            continue;
        };
        stack.push((node, next + 1));
        if !visited[neighbour] {
            visited[neighbour] = true;
            oriented.push((node, neighbour));
            stack.push((neighbour, 0));
        }
    }
    oriented
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orients_away_from_root() {
        // 0 - 1 - 2
        //     |
        //     3
        let edges = [(0, 1), (2, 1), (1, 3)];
        assert_eq!(orient_from(0, 4, &edges), vec![(0, 1), (1, 2), (1, 3)]);
        assert_eq!(orient_from(2, 4, &edges), vec![(2, 1), (1, 0), (1, 3)]);
    }

    #[test]
    fn test_depth_first_order() {
        // 0 - 1 - 3, 0 - 2
        let edges = [(0, 1), (0, 2), (1, 3)];
        assert_eq!(orient_from(0, 4, &edges), vec![(0, 1), (1, 3), (0, 2)]);
    }

    #[test]
    fn test_unreachable_nodes_are_skipped() {
        assert!(orient_from(0, 3, &[(1, 2)]).is_empty());
        assert!(orient_from(5, 3, &[(0, 1)]).is_empty());
    }
}
