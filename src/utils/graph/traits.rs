//! Trait definitions for control flow graph abstractions.
//!
//! Graph algorithms in this crate are written against these traits rather than
//! against [`crate::ir::Graph`] directly, so the dominator computation and the
//! natural loop analysis can be exercised on small hand-built graphs in tests.
//!
//! - [`GraphBase`] - block count and block iteration
//! - [`Successors`] - forward edge traversal
//! - [`Predecessors`] - backward edge traversal
//! - [`RootedGraph`] - graphs with a designated entry block

use crate::utils::graph::BlockIndex;

/// Base trait providing core graph properties.
pub trait GraphBase {
    /// Returns the number of block slots in the graph.
    ///
    /// Slots that no longer hold a live block still count; algorithms size their
    /// per-block tables with this value.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all live block identifiers, in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = BlockIndex>;
}

/// Trait for graphs that support forward edge traversal.
pub trait Successors: GraphBase {
    /// Returns an iterator over the successor blocks of `node`.
    ///
    /// A block that branches to the same target twice yields that target twice.
    fn successors(&self, node: BlockIndex) -> impl Iterator<Item = BlockIndex>;
}

/// Trait for graphs that support backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Returns an iterator over the predecessor blocks of `node`.
    fn predecessors(&self, node: BlockIndex) -> impl Iterator<Item = BlockIndex>;
}

/// Trait for graphs with a designated entry (root) block.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry block of the graph.
    fn entry(&self) -> BlockIndex;
}
