//! Block identifiers for control flow graphs.
//!
//! This module provides [`BlockIndex`], the strongly-typed identifier shared by
//! the graph algorithms in [`crate::utils::graph`] and the IR in [`crate::ir`].
//! Block indices are stable for the lifetime of a graph: killing a block leaves
//! an empty slot rather than renumbering its neighbours.

use std::fmt;

/// A strongly-typed identifier for a basic block within a control flow graph.
///
/// `BlockIndex` wraps a `usize` slot index. Indices are assigned sequentially
/// as blocks are appended and are never reused, which lets analyses keep
/// per-block tables as plain vectors indexed by [`BlockIndex::index`].
///
/// # Examples
///
/// ```rust
/// use dfg_unroll::utils::graph::BlockIndex;
///
/// let header = BlockIndex::new(1);
/// assert_eq!(header.index(), 1);
/// assert_eq!(header.to_string(), "#1");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockIndex(pub(crate) usize);

impl BlockIndex {
    /// Creates a new `BlockIndex` from a raw slot index.
    ///
    /// # Arguments
    ///
    /// * `index` - The raw block slot (0-based)
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        BlockIndex(index)
    }

    /// Returns the raw slot index of this block.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for BlockIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockIndex({})", self.0)
    }
}

impl fmt::Display for BlockIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for BlockIndex {
    #[inline]
    fn from(index: usize) -> Self {
        BlockIndex(index)
    }
}

impl From<BlockIndex> for usize {
    #[inline]
    fn from(block: BlockIndex) -> Self {
        block.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_block_index_roundtrip() {
        let block = BlockIndex::new(42);
        assert_eq!(block.index(), 42);

        let raw: usize = block.into();
        assert_eq!(raw, 42);
        assert_eq!(BlockIndex::from(raw), block);
    }

    #[test]
    fn test_block_index_ordering_and_hash() {
        let mut blocks = vec![BlockIndex::new(3), BlockIndex::new(1), BlockIndex::new(2)];
        blocks.sort();
        assert_eq!(
            blocks,
            vec![BlockIndex::new(1), BlockIndex::new(2), BlockIndex::new(3)]
        );

        let set: HashSet<_> = [BlockIndex::new(1), BlockIndex::new(1)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_block_index_formatting() {
        let block = BlockIndex::new(7);
        assert_eq!(format!("{block:?}"), "BlockIndex(7)");
        assert_eq!(format!("{block}"), "#7");
    }
}
