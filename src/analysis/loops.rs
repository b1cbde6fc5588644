//! Natural loop analysis.
//!
//! A natural loop is identified by a back edge `n -> h` where the header `h`
//! dominates `n`. Its body is `h` plus every block that reaches `n` without
//! passing through `h`. Back edges sharing a header are merged into one loop.
//!
//! ```text
//!     [pre-header]
//!          |
//!          v
//!     [header] <------+
//!          |          |
//!          v          |
//!     [body ...]      |
//!          |          |
//!          v          |
//!     [tail] ---------+
//!          |
//!          v
//!     [exit]
//! ```
//!
//! Loops are numbered in discovery order: the reverse post-order position of
//! their header. That number is stable for one analysis result and is what
//! callers key per-loop caches on.
//!
//! ```rust,ignore
//! use dfg_unroll::analysis::NaturalLoops;
//! use dfg_unroll::utils::graph::algorithms::compute_dominators_rooted;
//!
//! let dominators = compute_dominators_rooted(&graph);
//! let loops = NaturalLoops::compute(&graph, &dominators);
//! for natural_loop in loops.iter() {
//!     println!("loop {} at {} with {} blocks", natural_loop.index(), natural_loop.header(), natural_loop.size());
//! }
//! ```

use std::collections::HashMap;

use crate::utils::{
    graph::{
        algorithms::{reverse_postorder, DominatorTree},
        BlockIndex, RootedGraph,
    },
    BitSet,
};

/// One natural loop.
#[derive(Debug, Clone)]
pub struct NaturalLoop {
    index: usize,
    header: BlockIndex,
    /// Header first, then the remaining members in ascending block order.
    blocks: Vec<BlockIndex>,
    members: BitSet,
    /// Sources of the back edges into the header.
    back_edge_sources: Vec<BlockIndex>,
    /// Index of the innermost loop strictly enclosing this one.
    outer: Option<usize>,
    inner: Vec<usize>,
}

impl NaturalLoop {
    /// Returns the stable index of this loop within its [`NaturalLoops`].
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the loop header.
    #[must_use]
    pub fn header(&self) -> BlockIndex {
        self.header
    }

    /// Returns the number of blocks in the loop, header included.
    #[must_use]
    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the `i`th member block. Index 0 is the header.
    #[must_use]
    pub fn at(&self, i: usize) -> Option<BlockIndex> {
        self.blocks.get(i).copied()
    }

    /// Returns all member blocks, header first.
    #[must_use]
    pub fn blocks(&self) -> &[BlockIndex] {
        &self.blocks
    }

    /// Returns true if `block` belongs to this loop.
    #[must_use]
    pub fn contains(&self, block: BlockIndex) -> bool {
        self.members.contains(block.index())
    }

    /// Returns the blocks with a back edge to the header.
    #[must_use]
    pub fn back_edge_sources(&self) -> &[BlockIndex] {
        &self.back_edge_sources
    }
}

/// All natural loops of a graph, with their nesting relation.
#[derive(Debug, Clone, Default)]
pub struct NaturalLoops {
    loops: Vec<NaturalLoop>,
    /// Innermost loop containing each block slot.
    innermost: Vec<Option<usize>>,
}

impl NaturalLoops {
    /// Detects every natural loop of `graph`.
    ///
    /// Only blocks reachable from the entry take part; unreachable blocks are
    /// never members of a loop.
    ///
    /// # Arguments
    ///
    /// * `graph` - The control flow graph
    /// * `dominators` - A dominator tree computed for the current shape of `graph`
    #[must_use]
    pub fn compute<G: RootedGraph>(graph: &G, dominators: &DominatorTree) -> Self {
        let block_count = graph.node_count();
        let order = reverse_postorder(graph, graph.entry());

        // Predecessors are derived from successor edges here so that a stale
        // predecessor cache in the graph can never skew loop bodies.
        let mut predecessors: Vec<Vec<BlockIndex>> = vec![Vec::new(); block_count];
        for &block in &order {
            for succ in graph.successors(block) {
                if succ.index() < block_count && !predecessors[succ.index()].contains(&block) {
                    predecessors[succ.index()].push(block);
                }
            }
        }

        let mut by_header: HashMap<BlockIndex, (BitSet, Vec<BlockIndex>)> = HashMap::new();
        for &block in &order {
            for succ in graph.successors(block) {
                if !dominators.dominates(succ, block) {
                    continue;
                }
                let (members, sources) = by_header.entry(succ).or_insert_with(|| {
                    let mut members = BitSet::new(block_count);
                    members.insert(succ.index());
                    (members, Vec::new())
                });
                if !sources.contains(&block) {
                    sources.push(block);
                }
                expand_body(&predecessors, members, succ, block);
            }
        }

        let mut loops = Vec::with_capacity(by_header.len());
        for &header in &order {
            let Some((members, back_edge_sources)) = by_header.remove(&header) else {
                continue;
            };
            let mut blocks = vec![header];
            blocks.extend(
                members
                    .iter()
                    .map(BlockIndex::new)
                    .filter(|&block| block != header),
            );
            loops.push(NaturalLoop {
                index: loops.len(),
                header,
                blocks,
                members,
                back_edge_sources,
                outer: None,
                inner: Vec::new(),
            });
        }

        compute_nesting(&mut loops);

        let mut innermost: Vec<Option<usize>> = vec![None; block_count];
        for natural_loop in &loops {
            for &block in &natural_loop.blocks {
                let slot = &mut innermost[block.index()];
                match *slot {
                    Some(current) if loops[current].size() <= natural_loop.size() => {}
                    _ => *slot = Some(natural_loop.index),
                }
            }
        }

        NaturalLoops { loops, innermost }
    }

    /// Returns the number of loops.
    #[must_use]
    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    /// Returns true if the graph has no loops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Returns the loop with the given index.
    #[must_use]
    pub fn loop_at(&self, index: usize) -> Option<&NaturalLoop> {
        self.loops.get(index)
    }

    /// Iterates over all loops in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &NaturalLoop> {
        self.loops.iter()
    }

    /// Returns the loop whose header is `header`.
    #[must_use]
    pub fn loop_for_header(&self, header: BlockIndex) -> Option<&NaturalLoop> {
        self.loops.iter().find(|l| l.header == header)
    }

    /// Returns the innermost loop containing `block`.
    #[must_use]
    pub fn innermost_loop_of(&self, block: BlockIndex) -> Option<&NaturalLoop> {
        self.innermost
            .get(block.index())
            .copied()
            .flatten()
            .map(|index| &self.loops[index])
    }

    /// Returns the innermost loop that strictly encloses `natural_loop`.
    #[must_use]
    pub fn innermost_outer_loop(&self, natural_loop: &NaturalLoop) -> Option<&NaturalLoop> {
        natural_loop.outer.map(|index| &self.loops[index])
    }

    /// Returns true if another loop is nested inside `natural_loop`.
    #[must_use]
    pub fn has_inner_loops(&self, natural_loop: &NaturalLoop) -> bool {
        !natural_loop.inner.is_empty()
    }
}

/// Adds every block that reaches `source` without passing through `header`.
fn expand_body(
    predecessors: &[Vec<BlockIndex>],
    members: &mut BitSet,
    header: BlockIndex,
    source: BlockIndex,
) {
    let mut worklist = vec![source];
    while let Some(block) = worklist.pop() {
        if block == header || !members.insert(block.index()) {
            continue;
        }
        worklist.extend(predecessors[block.index()].iter().copied());
    }
}

/// Links every loop to the smallest other loop containing its header.
fn compute_nesting(loops: &mut [NaturalLoop]) {
    for i in 0..loops.len() {
        let header = loops[i].header;
        loops[i].outer = (0..loops.len())
            .filter(|&j| j != i && loops[j].contains(header))
            .min_by_key(|&j| (loops[j].size(), j));
    }
    for i in 0..loops.len() {
        if let Some(outer) = loops[i].outer {
            loops[outer].inner.push(i);
        }
    }
}
