//! Identifiers and small value types shared across the IR.

use std::fmt;

use bitflags::bitflags;

/// Index of a node in the graph's node arena.
///
/// Nodes are never removed from the arena, so a `NodeIndex` stays valid for
/// the lifetime of its graph even after the owning block is killed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    /// Creates a node index from a raw arena position.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeIndex(index)
    }

    /// Returns the raw arena position.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIndex({})", self.0)
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A local variable slot of the function being compiled.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Operand(pub u32);

impl Operand {
    /// Returns the slot as a table index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loc{}", self.0)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loc{}", self.0)
    }
}

/// Provenance of a node: the bytecode instruction it was generated from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CodeOrigin {
    /// Bytecode index of the originating instruction.
    pub bytecode_index: u32,
}

impl CodeOrigin {
    /// Creates an origin at the given bytecode index.
    #[must_use]
    pub const fn new(bytecode_index: u32) -> Self {
        Self { bytecode_index }
    }
}

impl fmt::Display for CodeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bc#{}", self.bytecode_index)
    }
}

bitflags! {
    /// Value-profile prediction attached to a node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpeculatedType: u16 {
        /// A 32-bit integer.
        const INT32 = 0x0001;
        /// A double that is not representable as an int32.
        const DOUBLE = 0x0002;
        /// `true` or `false`.
        const BOOLEAN = 0x0004;
        /// A string.
        const STRING = 0x0008;
        /// An array object.
        const ARRAY = 0x0010;
        /// Any other object.
        const OBJECT = 0x0020;
        /// `undefined` or `null`.
        const OTHER = 0x0040;
        /// Any number.
        const NUMBER = Self::INT32.bits() | Self::DOUBLE.bits();
    }
}

/// How a node consumes one of its operands.
///
/// The use kind records what the consumer has speculated about the operand;
/// the loop unroller only recognizes induction patterns whose arithmetic and
/// comparisons use [`UseKind::Int32`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UseKind {
    /// No speculation.
    #[default]
    Untyped,
    /// The operand is speculated to be an int32.
    Int32,
    /// The operand is speculated to be a number.
    Number,
    /// The operand is speculated to be a boolean.
    Boolean,
    /// The operand is speculated to be an array.
    Array,
    /// The operand is known to be a heap cell.
    Cell,
}

/// A reference from a node to one of its operands.
///
/// An edge may be empty, which is how absent fixed-arity children are stored.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Edge {
    node: Option<NodeIndex>,
    use_kind: UseKind,
}

impl Edge {
    /// The empty edge.
    pub const EMPTY: Edge = Edge {
        node: None,
        use_kind: UseKind::Untyped,
    };

    /// Creates an edge to `node` with the given use kind.
    #[must_use]
    pub const fn new(node: NodeIndex, use_kind: UseKind) -> Self {
        Edge {
            node: Some(node),
            use_kind,
        }
    }

    /// Creates an untyped edge to `node`.
    #[must_use]
    pub const fn untyped(node: NodeIndex) -> Self {
        Edge::new(node, UseKind::Untyped)
    }

    /// Creates an int32 edge to `node`.
    #[must_use]
    pub const fn int32(node: NodeIndex) -> Self {
        Edge::new(node, UseKind::Int32)
    }

    /// Returns the referenced node, if any.
    #[must_use]
    pub const fn node(self) -> Option<NodeIndex> {
        self.node
    }

    /// Returns the use kind.
    #[must_use]
    pub const fn use_kind(self) -> UseKind {
        self.use_kind
    }

    /// Returns true if the edge references a node.
    #[must_use]
    pub const fn is_set(self) -> bool {
        self.node.is_some()
    }

    /// Returns the same edge pointing at `node`, keeping the use kind.
    #[must_use]
    pub const fn with_node(self, node: NodeIndex) -> Self {
        Edge {
            node: Some(node),
            use_kind: self.use_kind,
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.node, self.use_kind) {
            (None, _) => write!(f, "-"),
            (Some(node), UseKind::Untyped) => write!(f, "{node}"),
            (Some(node), use_kind) => write!(f, "{use_kind:?}:{node}"),
        }
    }
}

/// A compile-time constant value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    /// A 32-bit integer.
    Int32(i32),
    /// A double.
    Double(f64),
    /// A boolean.
    Boolean(bool),
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
}

impl Constant {
    /// Returns the value if this is an int32 constant.
    #[must_use]
    pub const fn as_int32(self) -> Option<i32> {
        match self {
            Constant::Int32(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true for int32 and double constants.
    #[must_use]
    pub const fn is_number(self) -> bool {
        matches!(self, Constant::Int32(_) | Constant::Double(_))
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int32(value) => write!(f, "Int32: {value}"),
            Constant::Double(value) => write!(f, "Double: {value}"),
            Constant::Boolean(value) => write!(f, "{value}"),
            Constant::Undefined => write!(f, "undefined"),
            Constant::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_accessors() {
        let edge = Edge::int32(NodeIndex::new(4));
        assert!(edge.is_set());
        assert_eq!(edge.node(), Some(NodeIndex::new(4)));
        assert_eq!(edge.use_kind(), UseKind::Int32);

        let moved = edge.with_node(NodeIndex::new(9));
        assert_eq!(moved.node(), Some(NodeIndex::new(9)));
        assert_eq!(moved.use_kind(), UseKind::Int32);

        assert!(!Edge::EMPTY.is_set());
        assert_eq!(Edge::default(), Edge::EMPTY);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(NodeIndex::new(3).to_string(), "@3");
        assert_eq!(Operand(2).to_string(), "loc2");
        assert_eq!(CodeOrigin::new(17).to_string(), "bc#17");
        assert_eq!(Edge::int32(NodeIndex::new(1)).to_string(), "Int32:@1");
        assert_eq!(Edge::untyped(NodeIndex::new(1)).to_string(), "@1");
        assert_eq!(Edge::EMPTY.to_string(), "-");
        assert_eq!(Constant::Int32(-4).to_string(), "Int32: -4");
    }

    #[test]
    fn test_speculated_type_unions() {
        assert!(SpeculatedType::NUMBER.contains(SpeculatedType::INT32));
        assert!(!SpeculatedType::NUMBER.contains(SpeculatedType::BOOLEAN));
        assert!(SpeculatedType::default().is_empty());
    }

    #[test]
    fn test_constant_queries() {
        assert_eq!(Constant::Int32(5).as_int32(), Some(5));
        assert_eq!(Constant::Double(5.0).as_int32(), None);
        assert!(Constant::Double(0.5).is_number());
        assert!(!Constant::Null.is_number());
    }
}
