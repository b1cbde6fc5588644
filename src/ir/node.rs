//! IR nodes.

use crate::{
    ir::{
        AuxHandle, BranchData, CallVarargsData, CodeOrigin, Constant, Edge, LoadVarargsData,
        NodeKind, Operand, SpeculatedType, SwitchData,
    },
    utils::graph::BlockIndex,
};

/// The operands of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Children {
    /// Up to three operands stored inline; unused slots hold [`Edge::EMPTY`].
    Fixed([Edge; 3]),
    /// A range of the graph's variadic child list.
    VarArgs {
        /// Position of the first operand in the variadic child list.
        first: usize,
        /// Number of operands.
        count: usize,
    },
}

impl Children {
    /// No operands.
    pub const NONE: Children = Children::Fixed([Edge::EMPTY; 3]);

    /// One inline operand.
    #[must_use]
    pub const fn one(child1: Edge) -> Self {
        Children::Fixed([child1, Edge::EMPTY, Edge::EMPTY])
    }

    /// Two inline operands.
    #[must_use]
    pub const fn two(child1: Edge, child2: Edge) -> Self {
        Children::Fixed([child1, child2, Edge::EMPTY])
    }

    /// Three inline operands.
    #[must_use]
    pub const fn three(child1: Edge, child2: Edge, child3: Edge) -> Self {
        Children::Fixed([child1, child2, child3])
    }
}

impl Default for Children {
    fn default() -> Self {
        Children::NONE
    }
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NodeData {
    /// No payload.
    #[default]
    None,
    /// The value of a constant node.
    Constant(Constant),
    /// The local slot accessed by a local or hint node.
    Local(Operand),
    /// Named property identifier of a `GetById` / `PutById`.
    Property(u32),
    /// Target of a `Jump`.
    Jump(BlockIndex),
    /// Targets of a `Branch`.
    Branch(AuxHandle<BranchData>),
    /// Case table of a `Switch`.
    Switch(AuxHandle<SwitchData>),
    /// Layout of a `CallVarargs`.
    CallVarargs(AuxHandle<CallVarargsData>),
    /// Layout of a `LoadVarargs`, `VarargsLength` or `ForwardVarargs`.
    LoadVarargs(AuxHandle<LoadVarargsData>),
}

/// A single IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The operation performed.
    pub kind: NodeKind,
    /// Operand edges.
    pub children: Children,
    /// Provenance.
    pub origin: CodeOrigin,
    /// Value prediction.
    pub prediction: SpeculatedType,
    /// Kind-specific payload.
    pub data: NodeData,
}

impl Node {
    /// Creates a node without operands or payload.
    #[must_use]
    pub fn new(kind: NodeKind, origin: CodeOrigin) -> Self {
        Node {
            kind,
            children: Children::NONE,
            origin,
            prediction: SpeculatedType::empty(),
            data: NodeData::None,
        }
    }

    /// Returns true if the operands live in the graph's variadic child list.
    #[must_use]
    pub fn has_var_args(&self) -> bool {
        matches!(self.children, Children::VarArgs { .. })
    }

    /// Returns the `i`th inline operand, or an empty edge.
    #[must_use]
    pub fn child(&self, i: usize) -> Edge {
        match self.children {
            Children::Fixed(edges) => edges.get(i).copied().unwrap_or(Edge::EMPTY),
            Children::VarArgs { .. } => Edge::EMPTY,
        }
    }

    /// Returns the first inline operand.
    #[must_use]
    pub fn child1(&self) -> Edge {
        self.child(0)
    }

    /// Returns the second inline operand.
    #[must_use]
    pub fn child2(&self) -> Edge {
        self.child(1)
    }

    /// Returns the third inline operand.
    #[must_use]
    pub fn child3(&self) -> Edge {
        self.child(2)
    }

    /// Returns the local slot of a local-access or hint node.
    #[must_use]
    pub fn operand(&self) -> Option<Operand> {
        match self.data {
            NodeData::Local(operand) => Some(operand),
            _ => None,
        }
    }

    /// Returns the value of a constant node.
    #[must_use]
    pub fn constant(&self) -> Option<Constant> {
        match self.data {
            NodeData::Constant(constant) if self.kind.is_constant() => Some(constant),
            _ => None,
        }
    }

    /// Returns the value of an int32 constant node.
    #[must_use]
    pub fn as_int32_constant(&self) -> Option<i32> {
        self.constant().and_then(Constant::as_int32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::NodeIndex;

    #[test]
    fn test_fixed_children() {
        let mut node = Node::new(NodeKind::ArithAdd, CodeOrigin::new(0));
        node.children = Children::two(
            Edge::int32(NodeIndex::new(1)),
            Edge::int32(NodeIndex::new(2)),
        );

        assert_eq!(node.child1().node(), Some(NodeIndex::new(1)));
        assert_eq!(node.child2().node(), Some(NodeIndex::new(2)));
        assert!(!node.child3().is_set());
        assert!(!node.child(5).is_set());
        assert!(!node.has_var_args());
    }

    #[test]
    fn test_constant_accessors() {
        let mut node = Node::new(NodeKind::JSConstant, CodeOrigin::default());
        node.data = NodeData::Constant(Constant::Int32(4));
        assert_eq!(node.as_int32_constant(), Some(4));

        node.kind = NodeKind::ArithAdd;
        assert_eq!(node.constant(), None);
    }

    #[test]
    fn test_var_args_have_no_inline_children() {
        let mut node = Node::new(NodeKind::Call, CodeOrigin::default());
        node.children = Children::VarArgs { first: 0, count: 2 };
        assert!(node.has_var_args());
        assert!(!node.child1().is_set());
    }
}
