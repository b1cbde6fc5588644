//! Node kinds and their static classification.
//!
//! Every question the optimizer asks about an operation, such as how to clone
//! it, whether it generates code, or whether it touches array memory, is
//! answered here by an exhaustive `match`. Adding a kind without deciding how
//! it clones is a compile error rather than a silent default.

use strum::{EnumCount, EnumIter};

/// The shape of an out-of-line auxiliary record that must be deep-copied when
/// its node is cloned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxDataShape {
    /// Taken / not-taken targets of a two-way branch.
    BranchTargets,
    /// Case table and fall-through target of a switch.
    SwitchTable,
    /// Argument layout of a varargs call.
    CallVarargs,
    /// Source, destination and limits of a varargs load.
    LoadVarargs,
}

/// How a node of a given kind is duplicated by [`crate::compiler::CloneHelper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloneStrategy {
    /// A shallow copy with rewritten operands is a faithful clone.
    Common,
    /// As [`CloneStrategy::Common`], plus a deep copy of the auxiliary record
    /// into a freshly allocated slot.
    Special(AuxDataShape),
    /// Created once per cloned block before ordinary nodes are cloned
    /// (block-entry phis); never cloned on its own.
    PreCloned,
    /// Not safe to duplicate. Any loop containing it is left alone.
    Unsupported,
}

/// The operation performed by a node.
///
/// This is a representative subset of a mid-tier JIT's opcode set: enough to
/// express counted loops over locals and arrays, the auxiliary-data shapes that
/// need special cloning, and a few kinds the unroller must refuse to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, strum::Display)]
pub enum NodeKind {
    // Constants
    /// A constant of any type.
    JSConstant,
    /// A constant in double representation.
    DoubleConstant,
    /// A constant in int52 representation.
    Int52Constant,

    // Locals
    /// Reads a local slot. In threaded form `child1` is the block's phi for
    /// the slot when the read is the first access in the block.
    GetLocal,
    /// Writes `child1` to a local slot.
    SetLocal,
    /// Merges the values of a local slot flowing in from predecessors.
    Phi,
    /// Forces a local slot to be stored before an exit.
    Flush,
    /// Keeps a local slot alive without reading it.
    PhantomLocal,

    // Bookkeeping
    /// Marks a point where exiting to the baseline tier is allowed.
    ExitOK,
    /// A point where watchpoint invalidation may take effect.
    InvalidationPoint,
    /// Marks the top of a loop body for OSR entry.
    LoopHint,
    /// Counts loop iterations for tier-up.
    CheckTierUpInLoop,
    /// Profiling counter increment.
    CountExecution,
    /// Records that a bytecode local now holds `child1` for OSR exit.
    MovHint,
    /// Records that a bytecode local is dead for OSR exit.
    ZombieHint,
    /// Keeps its children alive.
    Phantom,
    /// Type-checks its children.
    Check,

    // Arithmetic
    /// `child1 + child2`.
    ArithAdd,
    /// `child1 - child2`.
    ArithSub,
    /// `child1 * child2`.
    ArithMul,
    /// `child1 / child2`.
    ArithDiv,
    /// `child1 % child2`.
    ArithMod,
    /// `-child1`.
    ArithNegate,
    /// `child1 & child2`.
    BitAnd,
    /// `child1 | child2`.
    BitOr,
    /// `child1 ^ child2`.
    BitXor,
    /// `child1 << child2`.
    BitLShift,
    /// `child1 >> child2`.
    BitRShift,
    /// `child1 >>> child2`.
    BitURShift,
    /// Converts `child1` to an int32.
    ValueToInt32,
    /// Converts `child1` to double representation.
    DoubleRep,
    /// Converts `child1` to int52 representation.
    Int52Rep,
    /// Boxes `child1` into a generic value.
    ValueRep,
    /// Generic `+` on boxed values.
    ValueAdd,

    // Comparison
    /// `child1 < child2`.
    CompareLess,
    /// `child1 <= child2`.
    CompareLessEq,
    /// `child1 > child2`.
    CompareGreater,
    /// `child1 >= child2`.
    CompareGreaterEq,
    /// `child1 == child2`.
    CompareEq,
    /// `child1 === child2`.
    CompareStrictEq,
    /// `!child1`.
    LogicalNot,

    // Memory
    /// `child1[child2]`.
    GetByVal,
    /// `child1[child2] = child3`.
    PutByVal,
    /// `child1[child2] = child3`, defining the property.
    PutByValDirect,
    /// `child1.length` for an array.
    GetArrayLength,
    /// Named property load from `child1`.
    GetById,
    /// Named property store of `child2` into `child1`.
    PutById,
    /// Allocates an array from its variadic children.
    NewArray,

    // Calls
    /// Calls its first variadic child with the remaining ones as arguments.
    Call,
    /// Calls `child1` with `child2` as `this` and the arguments spread from `child3`.
    CallVarargs,
    /// Copies the arguments spread from `child1` into locals.
    LoadVarargs,
    /// Computes the argument count of a spread of `child1`.
    VarargsLength,
    /// Forwards the caller's arguments into locals.
    ForwardVarargs,

    // Strings
    /// Concatenates two or three strings into a rope.
    MakeRope,
    /// Generic string concatenation.
    StrCat,
    /// Converts `child1` to a string.
    ToString,

    // Allocation
    /// Creates a closure over the scope `child1`.
    CreateClosure,
    /// Creates an activation object for the scope `child1`.
    CreateActivation,
    /// An allocation sunk by escape analysis.
    PhantomNewObject,

    // Terminals
    /// Unconditional jump.
    Jump,
    /// Two-way branch on `child1`.
    Branch,
    /// Multi-way branch on `child1`.
    Switch,
    /// Returns `child1`.
    Return,
    /// Throws `child1`.
    Throw,
    /// Marks code that cannot be reached.
    Unreachable,
}

impl NodeKind {
    /// Returns the cloning strategy for this kind.
    #[must_use]
    pub const fn clone_strategy(self) -> CloneStrategy {
        use NodeKind::*;
        match self {
            Phi => CloneStrategy::PreCloned,
            Branch => CloneStrategy::Special(AuxDataShape::BranchTargets),
            Switch => CloneStrategy::Special(AuxDataShape::SwitchTable),
            CallVarargs => CloneStrategy::Special(AuxDataShape::CallVarargs),
            LoadVarargs | VarargsLength => CloneStrategy::Special(AuxDataShape::LoadVarargs),
            CreateClosure | CreateActivation | ForwardVarargs | PhantomNewObject => {
                CloneStrategy::Unsupported
            }
            JSConstant | DoubleConstant | Int52Constant | GetLocal | SetLocal | Flush
            | PhantomLocal | ExitOK | InvalidationPoint | LoopHint | CheckTierUpInLoop
            | CountExecution | MovHint | ZombieHint | Phantom | Check | ArithAdd | ArithSub
            | ArithMul | ArithDiv | ArithMod | ArithNegate | BitAnd | BitOr | BitXor
            | BitLShift | BitRShift | BitURShift | ValueToInt32 | DoubleRep | Int52Rep
            | ValueRep | ValueAdd | CompareLess | CompareLessEq | CompareGreater
            | CompareGreaterEq | CompareEq | CompareStrictEq | LogicalNot | GetByVal
            | PutByVal | PutByValDirect | GetArrayLength | GetById | PutById | NewArray | Call
            | MakeRope | StrCat | ToString | Jump | Return | Throw | Unreachable => {
                CloneStrategy::Common
            }
        }
    }

    /// Returns true if nodes of this kind keep their children in the graph's
    /// variadic child list.
    #[must_use]
    pub const fn has_var_args(self) -> bool {
        matches!(self, NodeKind::NewArray | NodeKind::Call)
    }

    /// Returns true if this kind ends a basic block.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeKind::Jump
                | NodeKind::Branch
                | NodeKind::Switch
                | NodeKind::Return
                | NodeKind::Throw
                | NodeKind::Unreachable
        )
    }

    /// Returns true for the constant kinds.
    #[must_use]
    pub const fn is_constant(self) -> bool {
        matches!(
            self,
            NodeKind::JSConstant | NodeKind::DoubleConstant | NodeKind::Int52Constant
        )
    }

    /// Returns true for kinds that carry a local slot in their data.
    #[must_use]
    pub const fn has_operand(self) -> bool {
        matches!(
            self,
            NodeKind::GetLocal
                | NodeKind::SetLocal
                | NodeKind::Phi
                | NodeKind::Flush
                | NodeKind::PhantomLocal
                | NodeKind::MovHint
                | NodeKind::ZombieHint
        )
    }

    /// Bookkeeping markers that generate no code unless they carry operands.
    #[must_use]
    pub const fn is_bookkeeping(self) -> bool {
        matches!(
            self,
            NodeKind::ExitOK
                | NodeKind::InvalidationPoint
                | NodeKind::LoopHint
                | NodeKind::CheckTierUpInLoop
                | NodeKind::CountExecution
        )
    }

    /// Metadata kinds that never generate code.
    #[must_use]
    pub const fn is_zero_cost(self) -> bool {
        matches!(
            self,
            NodeKind::Phi
                | NodeKind::MovHint
                | NodeKind::ZombieHint
                | NodeKind::Phantom
                | NodeKind::PhantomLocal
                | NodeKind::Flush
                | NodeKind::PhantomNewObject
        )
    }

    /// Arithmetic, bit operations, representation conversions and numeric
    /// constants.
    ///
    /// A generic `JSConstant` counts as numeric only when its value is a
    /// number, which needs the node's payload; the loop unroller's body scan
    /// checks that separately.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            NodeKind::DoubleConstant
                | NodeKind::Int52Constant
                | NodeKind::ArithAdd
                | NodeKind::ArithSub
                | NodeKind::ArithMul
                | NodeKind::ArithDiv
                | NodeKind::ArithMod
                | NodeKind::ArithNegate
                | NodeKind::BitAnd
                | NodeKind::BitOr
                | NodeKind::BitXor
                | NodeKind::BitLShift
                | NodeKind::BitRShift
                | NodeKind::BitURShift
                | NodeKind::ValueToInt32
                | NodeKind::DoubleRep
                | NodeKind::Int52Rep
                | NodeKind::ValueRep
        )
    }

    /// Reads or writes of a local slot.
    #[must_use]
    pub const fn is_local_access(self) -> bool {
        matches!(self, NodeKind::GetLocal | NodeKind::SetLocal)
    }

    /// Array element stores.
    #[must_use]
    pub const fn is_array_store(self) -> bool {
        matches!(self, NodeKind::PutByVal | NodeKind::PutByValDirect)
    }

    /// Array element loads.
    #[must_use]
    pub const fn is_array_load(self) -> bool {
        matches!(self, NodeKind::GetByVal)
    }

    /// Kinds that regress when duplicated and are never unrolled.
    #[must_use]
    pub const fn is_unroll_denylisted(self) -> bool {
        matches!(self, NodeKind::MakeRope | NodeKind::StrCat)
    }

    /// Comparisons the induction-variable matcher understands.
    #[must_use]
    pub const fn is_induction_compare(self) -> bool {
        matches!(
            self,
            NodeKind::CompareLess
                | NodeKind::CompareLessEq
                | NodeKind::CompareGreater
                | NodeKind::CompareGreaterEq
                | NodeKind::CompareEq
        )
    }

    /// Updates the induction-variable matcher understands.
    #[must_use]
    pub const fn is_induction_update(self) -> bool {
        matches!(
            self,
            NodeKind::ArithAdd | NodeKind::ArithSub | NodeKind::ArithMul | NodeKind::ArithDiv
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_clone_strategies() {
        assert_eq!(NodeKind::ArithAdd.clone_strategy(), CloneStrategy::Common);
        assert_eq!(NodeKind::Phi.clone_strategy(), CloneStrategy::PreCloned);
        assert_eq!(
            NodeKind::Branch.clone_strategy(),
            CloneStrategy::Special(AuxDataShape::BranchTargets)
        );
        assert_eq!(
            NodeKind::VarargsLength.clone_strategy(),
            CloneStrategy::Special(AuxDataShape::LoadVarargs)
        );
        assert_eq!(
            NodeKind::CreateClosure.clone_strategy(),
            CloneStrategy::Unsupported
        );
    }

    #[test]
    fn test_terminals_are_cloneable() {
        for kind in NodeKind::iter().filter(|k| k.is_terminal()) {
            assert!(
                !matches!(
                    kind.clone_strategy(),
                    CloneStrategy::Unsupported | CloneStrategy::PreCloned
                ),
                "{kind} must be cloneable"
            );
        }
    }

    #[test]
    fn test_classifications_are_disjoint() {
        for kind in NodeKind::iter() {
            assert!(!(kind.is_array_store() && kind.is_array_load()));
            assert!(!(kind.is_numeric() && kind.is_local_access()));
            assert!(!(kind.is_zero_cost() && kind.is_bookkeeping()));
        }
        assert!(NodeKind::COUNT > 60);
    }

    #[test]
    fn test_display_is_variant_name() {
        assert_eq!(NodeKind::GetByVal.to_string(), "GetByVal");
        assert_eq!(NodeKind::CompareLessEq.to_string(), "CompareLessEq");
    }
}
