//! Basic blocks.

use bitflags::bitflags;

use crate::{
    ir::{NodeIndex, Operand},
    utils::graph::BlockIndex,
};

bitflags! {
    /// Per-block state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlockFlags: u8 {
        /// Reachable from the entry as of the last reachability computation.
        const REACHABLE = 0x01;
        /// Visited by the abstract interpreter.
        const CFA_VISITED = 0x02;
        /// Inserted to split a critical edge; holds nothing but a `Jump`.
        const SYNTHETIC_EDGE_PAD = 0x04;
        /// A duplicate of existing code, ignored by code-size estimation.
        const EXCLUDED_FROM_CODE_SIZE = 0x08;
    }
}

/// A map from local slot to the node holding its value at one program point.
///
/// Used for the live-variable snapshots at block entry and exit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operands {
    slots: Vec<Option<NodeIndex>>,
}

impl Operands {
    /// Creates an empty map sized for `num_locals` slots.
    #[must_use]
    pub fn new(num_locals: usize) -> Self {
        Operands {
            slots: vec![None; num_locals],
        }
    }

    /// Returns the node recorded for `operand`.
    #[must_use]
    pub fn get(&self, operand: Operand) -> Option<NodeIndex> {
        self.slots.get(operand.index()).copied().flatten()
    }

    /// Records `node` for `operand`, growing the map if needed.
    pub fn set(&mut self, operand: Operand, node: Option<NodeIndex>) {
        if operand.index() >= self.slots.len() {
            self.slots.resize(operand.index() + 1, None);
        }
        self.slots[operand.index()] = node;
    }

    /// Iterates over the recorded `(operand, node)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Operand, NodeIndex)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.map(|node| (Operand(u32::try_from(i).unwrap_or(u32::MAX)), node))
        })
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no slot is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Forgets every recorded node.
    pub fn clear(&mut self) {
        self.slots.fill(None);
    }
}

/// A basic block: phis, then an ordered node list ending in a terminal.
///
/// Successors are not stored here; they are read from the terminal node's
/// payload (see [`crate::ir::Graph::successors`]). Predecessors are a derived
/// cache rebuilt by [`crate::ir::Graph::reset_reachability`] and are stale
/// between a structural edit and the next recomputation.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub(crate) index: BlockIndex,
    pub(crate) phis: Vec<NodeIndex>,
    pub(crate) nodes: Vec<NodeIndex>,
    pub(crate) predecessors: Vec<BlockIndex>,
    /// State bits.
    pub flags: BlockFlags,
    /// Profiled execution frequency.
    pub execution_count: f64,
    /// Node holding each local's value at block entry.
    pub variables_at_head: Operands,
    /// Node holding each local's value at block exit.
    pub variables_at_tail: Operands,
}

impl BasicBlock {
    pub(crate) fn new(index: BlockIndex, num_locals: usize, execution_count: f64) -> Self {
        BasicBlock {
            index,
            phis: Vec::new(),
            nodes: Vec::new(),
            predecessors: Vec::new(),
            flags: BlockFlags::empty(),
            execution_count,
            variables_at_head: Operands::new(num_locals),
            variables_at_tail: Operands::new(num_locals),
        }
    }

    /// Returns this block's index.
    #[must_use]
    pub fn index(&self) -> BlockIndex {
        self.index
    }

    /// Returns the phi nodes at block entry.
    #[must_use]
    pub fn phis(&self) -> &[NodeIndex] {
        &self.phis
    }

    /// Returns the ordinary nodes, terminal last.
    #[must_use]
    pub fn nodes(&self) -> &[NodeIndex] {
        &self.nodes
    }

    /// Returns the predecessor cache.
    #[must_use]
    pub fn predecessors(&self) -> &[BlockIndex] {
        &self.predecessors
    }

    /// Returns the last node, which is the terminal in a well-formed block.
    #[must_use]
    pub fn last(&self) -> Option<NodeIndex> {
        self.nodes.last().copied()
    }

    /// Returns true if the block is a critical-edge pad.
    #[must_use]
    pub fn is_edge_pad(&self) -> bool {
        self.flags.contains(BlockFlags::SYNTHETIC_EDGE_PAD)
    }

    /// Returns true if the last reachability computation reached this block.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.flags.contains(BlockFlags::REACHABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operands_grow_and_iterate() {
        let mut operands = Operands::new(2);
        assert!(operands.is_empty());

        operands.set(Operand(1), Some(NodeIndex::new(10)));
        operands.set(Operand(4), Some(NodeIndex::new(11)));
        assert_eq!(operands.len(), 5);
        assert_eq!(operands.get(Operand(4)), Some(NodeIndex::new(11)));
        assert_eq!(operands.get(Operand(9)), None);

        let pairs: Vec<_> = operands.iter().collect();
        assert_eq!(
            pairs,
            vec![
                (Operand(1), NodeIndex::new(10)),
                (Operand(4), NodeIndex::new(11))
            ]
        );

        operands.clear();
        assert!(operands.is_empty());
    }

    #[test]
    fn test_block_flags() {
        let mut block = BasicBlock::new(BlockIndex::new(0), 1, 1.0);
        assert!(!block.is_reachable());
        block.flags |= BlockFlags::REACHABLE | BlockFlags::SYNTHETIC_EDGE_PAD;
        assert!(block.is_reachable());
        assert!(block.is_edge_pad());
        assert_eq!(block.last(), None);
    }
}
