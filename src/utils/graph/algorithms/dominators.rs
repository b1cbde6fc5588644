//! Dominator tree computation using the Lengauer-Tarjan algorithm.
//!
//! A block `d` **dominates** a block `n` if every path from the entry to `n`
//! passes through `d`. The immediate dominator of `n` is the closest strict
//! dominator; making it each block's parent yields the dominator tree.
//!
//! The loop unroller relies on three dominance queries: locating the loop
//! pre-header (the header predecessor the header does *not* dominate), the tail
//! (the predecessor it does dominate), and checking that the induction update
//! executes on every iteration.
//!
//! Blocks that are unreachable from the entry have no immediate dominator.
//! They dominate nothing and are dominated by nothing, which keeps queries on a
//! graph with stale dead blocks well-defined.

use crate::utils::graph::{BlockIndex, RootedGraph, Successors};

const UNDEFINED: usize = usize::MAX;

/// Result of dominator tree computation.
///
/// # Examples
///
/// ```rust,ignore
/// let dom_tree = compute_dominators(&graph, entry);
/// assert!(dom_tree.dominates(entry, exit));
/// assert_eq!(dom_tree.immediate_dominator(b), Some(a));
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// The entry (root) block.
    entry: BlockIndex,
    /// Immediate dominator per block slot; `UNDEFINED` for unreachable slots,
    /// the entry maps to itself.
    idom: Vec<usize>,
}

impl DominatorTree {
    /// Returns the entry block of the dominator tree.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> BlockIndex {
        self.entry
    }

    /// Returns `true` if `node` was reached from the entry during computation.
    #[inline]
    #[must_use]
    pub fn is_reachable(&self, node: BlockIndex) -> bool {
        self.idom
            .get(node.index())
            .is_some_and(|&idom| idom != UNDEFINED)
    }

    /// Returns the immediate dominator of a block.
    ///
    /// `None` for the entry and for unreachable blocks.
    #[must_use]
    pub fn immediate_dominator(&self, node: BlockIndex) -> Option<BlockIndex> {
        if node == self.entry || !self.is_reachable(node) {
            None
        } else {
            Some(BlockIndex::new(self.idom[node.index()]))
        }
    }

    /// Checks if block `a` dominates block `b`.
    ///
    /// A reachable block dominates itself. Unreachable blocks never take part in
    /// a dominance relation.
    ///
    /// # Complexity
    ///
    /// O(depth of `b` in the dominator tree).
    #[must_use]
    pub fn dominates(&self, a: BlockIndex, b: BlockIndex) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        if a == b {
            return true;
        }

        let mut current = b;
        while current != self.entry {
            let idom = BlockIndex::new(self.idom[current.index()]);
            if idom == a {
                return true;
            }
            current = idom;
        }

        false
    }

    /// Checks if `a` dominates `b` and `a != b`.
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: BlockIndex, b: BlockIndex) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns the depth of a reachable block in the dominator tree.
    ///
    /// The entry has depth 0; unreachable blocks report `None`.
    #[must_use]
    pub fn depth(&self, node: BlockIndex) -> Option<usize> {
        if !self.is_reachable(node) {
            return None;
        }
        let mut depth = 0;
        let mut current = node;
        while current != self.entry {
            current = BlockIndex::new(self.idom[current.index()]);
            depth += 1;
        }
        Some(depth)
    }

    /// Returns the number of block slots covered by this tree.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }
}

/// Computes the dominator tree for the blocks reachable from `entry`.
///
/// # Complexity
///
/// - Time: O(E α(V)) where α is the inverse Ackermann function
/// - Space: O(V + E)
pub fn compute_dominators<G>(graph: &G, entry: BlockIndex) -> DominatorTree
where
    G: Successors,
{
    let node_count = graph.node_count();
    if node_count == 0 || entry.index() >= node_count {
        return DominatorTree {
            entry,
            idom: vec![UNDEFINED; node_count],
        };
    }

    let mut lt = LengauerTarjan::new(graph, entry);
    lt.compute();

    DominatorTree {
        entry,
        idom: lt.idom,
    }
}

/// Convenience wrapper computing dominators from the graph's own entry.
pub fn compute_dominators_rooted<G>(graph: &G) -> DominatorTree
where
    G: RootedGraph,
{
    compute_dominators(graph, graph.entry())
}

/// Working state of the Lengauer-Tarjan algorithm, indexed by block slot.
struct LengauerTarjan {
    entry: usize,
    /// Successor lists snapshotted from the graph.
    succs: Vec<Vec<usize>>,
    /// Predecessor lists derived from `succs`; restricted to reachable sources
    /// during the semidominator step.
    preds: Vec<Vec<usize>>,
    /// DFS number, 0 meaning "not visited".
    dfnum: Vec<usize>,
    /// Block with each DFS number (`vertex[dfnum - 1]`).
    vertex: Vec<usize>,
    parent: Vec<usize>,
    semi: Vec<usize>,
    idom: Vec<usize>,
    ancestor: Vec<usize>,
    best: Vec<usize>,
    bucket: Vec<Vec<usize>>,
    visited: usize,
}

impl LengauerTarjan {
    fn new<G: Successors>(graph: &G, entry: BlockIndex) -> Self {
        let n = graph.node_count();
        let mut succs = vec![Vec::new(); n];
        let mut preds = vec![Vec::new(); n];
        for node in graph.node_ids() {
            for succ in graph.successors(node) {
                if succ.index() < n {
                    succs[node.index()].push(succ.index());
                    preds[succ.index()].push(node.index());
                }
            }
        }

        Self {
            entry: entry.index(),
            succs,
            preds,
            dfnum: vec![0; n],
            vertex: Vec::with_capacity(n),
            parent: vec![UNDEFINED; n],
            semi: (0..n).collect(),
            idom: vec![UNDEFINED; n],
            ancestor: vec![UNDEFINED; n],
            best: (0..n).collect(),
            bucket: vec![Vec::new(); n],
            visited: 0,
        }
    }

    fn compute(&mut self) {
        self.number_blocks();

        for i in (1..self.visited).rev() {
            let w = self.vertex[i];
            let parent_w = self.parent[w];

            let preds = std::mem::take(&mut self.preds[w]);
            for &v in &preds {
                if self.dfnum[v] == 0 {
                    continue;
                }
                let u = self.eval(v);
                if self.dfnum[self.semi[u]] < self.dfnum[self.semi[w]] {
                    self.semi[w] = self.semi[u];
                }
            }
            self.preds[w] = preds;

            let semi_w = self.semi[w];
            self.bucket[semi_w].push(w);
            self.ancestor[w] = parent_w;

            for v in std::mem::take(&mut self.bucket[parent_w]) {
                let u = self.eval(v);
                self.idom[v] = if self.semi[u] == self.semi[v] {
                    parent_w
                } else {
                    u
                };
            }
        }

        for i in 1..self.visited {
            let w = self.vertex[i];
            if self.idom[w] != self.semi[w] {
                self.idom[w] = self.idom[self.idom[w]];
            }
        }

        self.idom[self.entry] = self.entry;
    }

    /// Iterative DFS assigning preorder numbers and the spanning-tree parent.
    fn number_blocks(&mut self) {
        let mut stack = vec![(self.entry, UNDEFINED)];

        while let Some((node, parent)) = stack.pop() {
            if self.dfnum[node] != 0 {
                continue;
            }

            self.visited += 1;
            self.dfnum[node] = self.visited;
            self.vertex.push(node);
            self.parent[node] = parent;

            for &succ in self.succs[node].iter().rev() {
                if self.dfnum[succ] == 0 {
                    stack.push((succ, node));
                }
            }
        }
    }

    fn eval(&mut self, v: usize) -> usize {
        if self.ancestor[v] == UNDEFINED {
            return v;
        }
        self.compress(v);
        self.best[v]
    }

    /// Path compression, iterative to keep deep loop nests off the call stack.
    fn compress(&mut self, v: usize) {
        let mut path = Vec::new();
        let mut current = v;
        while self.ancestor[self.ancestor[current]] != UNDEFINED {
            path.push(current);
            current = self.ancestor[current];
        }

        while let Some(node) = path.pop() {
            let anc = self.ancestor[node];
            if self.dfnum[self.semi[self.best[anc]]] < self.dfnum[self.semi[self.best[node]]] {
                self.best[node] = self.best[anc];
            }
            self.ancestor[node] = self.ancestor[anc];
        }
    }
}
