//! # dfg-unroll Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dfg-unroll library. Import this module to get quick access to the essential
//! types for building graphs and running the unroller.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dfg-unroll operations
pub use crate::Error;

/// The result type used throughout dfg-unroll
pub use crate::Result;

// ================================================================================================
// Graph IR
// ================================================================================================

/// The graph and its building blocks
pub use crate::ir::{
    BasicBlock, BlockFlags, Children, Constant, Edge, Graph, GraphForm, Node, NodeData, NodeIndex,
    NodeKind, Operand, UseKind,
};

/// Graph construction and checking
pub use crate::ir::{validate, GraphBuilder};

/// Reference execution
pub use crate::ir::{Execution, Interpreter, Value};

// ================================================================================================
// Analyses
// ================================================================================================

/// Natural loops
pub use crate::analysis::{NaturalLoop, NaturalLoops};

/// Block identifiers
pub use crate::utils::graph::BlockIndex;

/// Stable function identity
pub use crate::utils::FunctionHash;

// ================================================================================================
// Compiler
// ================================================================================================

/// The phase trait and the scheduler
pub use crate::compiler::{PassScheduler, Phase};

/// Loop unrolling
pub use crate::compiler::{
    CloneHelper, FunctionAllowList, LoopShapeData, LoopUnrollingPhase, Rejection, UnrollConfig,
};

/// Diagnostics
pub use crate::compiler::{EventKind, EventLog};
