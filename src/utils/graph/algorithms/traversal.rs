//! Graph traversal algorithms.
//!
//! - [`dfs`] - lazy depth-first pre-order iterator, used for reachability
//! - [`postorder`] / [`reverse_postorder`] - collected orders, used to give loop
//!   discovery a deterministic, dominance-compatible order

use crate::utils::graph::{BlockIndex, Successors};

/// Depth-first search iterator over blocks reachable from a start block.
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<BlockIndex>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> DfsIterator<'g, G> {
    fn new(graph: &'g G, start: BlockIndex) -> Self {
        let node_count = graph.node_count();
        if start.index() >= node_count {
            return DfsIterator {
                graph,
                stack: Vec::new(),
                visited: Vec::new(),
            };
        }

        let mut visited = vec![false; node_count];
        visited[start.index()] = true;

        DfsIterator {
            graph,
            stack: vec![start],
            visited,
        }
    }
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = BlockIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        let successors: Vec<BlockIndex> = self.graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if succ.index() < self.visited.len() && !self.visited[succ.index()] {
                self.visited[succ.index()] = true;
                self.stack.push(succ);
            }
        }

        Some(node)
    }
}

/// Returns a depth-first pre-order iterator starting from `start`.
///
/// Each reachable block is yielded exactly once. An out-of-range start yields
/// nothing.
pub fn dfs<G: Successors>(graph: &G, start: BlockIndex) -> DfsIterator<'_, G> {
    DfsIterator::new(graph, start)
}

/// Computes the post-order of the blocks reachable from `start`.
#[allow(clippy::items_after_statements)]
pub fn postorder<G: Successors>(graph: &G, start: BlockIndex) -> Vec<BlockIndex> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut stack = vec![(start, State::Enter)];
    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push((node, State::Exit));

                let successors: Vec<BlockIndex> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if succ.index() < node_count && !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}

/// Computes the reverse post-order of the blocks reachable from `start`.
///
/// In reverse post-order every block appears before its successors, back edges
/// excepted; in particular a loop header precedes every block of its body.
pub fn reverse_postorder<G: Successors>(graph: &G, start: BlockIndex) -> Vec<BlockIndex> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::traits::tests::TestGraph;

    fn ids(raw: &[usize]) -> Vec<BlockIndex> {
        raw.iter().copied().map(BlockIndex::new).collect()
    }

    #[test]
    fn test_dfs_skips_unreachable() {
        let graph = TestGraph::new(4, &[(0, 1), (1, 2), (3, 2)]);
        let visited: Vec<_> = dfs(&graph, BlockIndex::new(0)).collect();
        assert_eq!(visited, ids(&[0, 1, 2]));
    }

    #[test]
    fn test_dfs_handles_cycles() {
        let graph = TestGraph::new(3, &[(0, 1), (1, 2), (2, 1)]);
        assert_eq!(dfs(&graph, BlockIndex::new(0)).count(), 3);
    }

    #[test]
    fn test_reverse_postorder_header_first() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let graph = TestGraph::new(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        assert_eq!(reverse_postorder(&graph, BlockIndex::new(0)), ids(&[0, 1, 2, 3]));
        assert_eq!(postorder(&graph, BlockIndex::new(0)), ids(&[3, 2, 1, 0]));
    }

    #[test]
    fn test_invalid_start() {
        let graph = TestGraph::new(2, &[(0, 1)]);
        assert_eq!(dfs(&graph, BlockIndex::new(5)).count(), 0);
        assert!(postorder(&graph, BlockIndex::new(5)).is_empty());
    }
}
