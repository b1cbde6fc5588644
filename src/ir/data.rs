//! Out-of-line auxiliary records and the arenas that own them.
//!
//! Terminal and call nodes keep their larger payloads (branch targets, switch
//! case tables, varargs layouts) in graph-owned arenas and refer to them through
//! a typed [`AuxHandle`]. Each record belongs to exactly one node: cloning a
//! node allocates a fresh record, so rewriting the successors of a cloned
//! branch can never redirect the original.

use std::{fmt, hash::Hash, marker::PhantomData};

use crate::{ir::Operand, utils::graph::BlockIndex};

/// A typed index into an [`AuxArena`].
pub struct AuxHandle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AuxHandle<T> {
    const fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Returns the raw arena position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

impl<T> Clone for AuxHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AuxHandle<T> {}

impl<T> PartialEq for AuxHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for AuxHandle<T> {}

impl<T> Hash for AuxHandle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for AuxHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuxHandle({})", self.index)
    }
}

/// Append-only storage for one kind of auxiliary record.
#[derive(Debug, Clone)]
pub struct AuxArena<T> {
    items: Vec<T>,
}

impl<T> Default for AuxArena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> AuxArena<T> {
    /// Stores a record and returns its handle.
    pub fn add(&mut self, item: T) -> AuxHandle<T> {
        self.items.push(item);
        AuxHandle::new(self.items.len() - 1)
    }

    /// Returns the record behind `handle`.
    #[must_use]
    pub fn get(&self, handle: AuxHandle<T>) -> Option<&T> {
        self.items.get(handle.index)
    }

    /// Returns the record behind `handle` mutably.
    pub fn get_mut(&mut self, handle: AuxHandle<T>) -> Option<&mut T> {
        self.items.get_mut(handle.index)
    }

    /// Returns the number of records ever allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no record was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A control-flow target with its profiled execution count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchTarget {
    /// Destination block.
    pub block: BlockIndex,
    /// How often the edge was taken, if profiled.
    pub count: f64,
}

impl BranchTarget {
    /// Creates an unprofiled target.
    #[must_use]
    pub const fn new(block: BlockIndex) -> Self {
        Self { block, count: 0.0 }
    }
}

/// Targets of a two-way [`crate::ir::NodeKind::Branch`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchData {
    /// Target when the condition is truthy.
    pub taken: BranchTarget,
    /// Target when the condition is falsy.
    pub not_taken: BranchTarget,
}

impl BranchData {
    /// Creates branch data from two unprofiled targets.
    #[must_use]
    pub const fn new(taken: BlockIndex, not_taken: BlockIndex) -> Self {
        Self {
            taken: BranchTarget::new(taken),
            not_taken: BranchTarget::new(not_taken),
        }
    }
}

/// One `case` of a [`SwitchData`] table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchCase {
    /// Int32 value selecting this case.
    pub value: i32,
    /// Destination of the case.
    pub target: BranchTarget,
}

/// Case table of a [`crate::ir::NodeKind::Switch`] on an int32 scrutinee.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchData {
    /// Cases in table order.
    pub cases: Vec<SwitchCase>,
    /// Destination when no case matches.
    pub fall_through: BranchTarget,
}

/// Layout of a [`crate::ir::NodeKind::CallVarargs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallVarargsData {
    /// Number of leading spread elements to skip.
    pub first_vararg_offset: u32,
}

/// Layout of a varargs load ([`crate::ir::NodeKind::LoadVarargs`],
/// [`crate::ir::NodeKind::VarargsLength`] and
/// [`crate::ir::NodeKind::ForwardVarargs`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadVarargsData {
    /// First local receiving an argument.
    pub start: Operand,
    /// Local receiving the argument count.
    pub count: Operand,
    /// Number of leading spread elements to skip.
    pub offset: u32,
    /// Arguments always materialized, padding with `undefined`.
    pub mandatory_minimum: u32,
    /// Maximum number of arguments loaded.
    pub limit: u32,
}
