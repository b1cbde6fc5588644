//! The data-flow-graph intermediate representation.
//!
//! A [`Graph`] owns basic blocks, nodes and out-of-line auxiliary records.
//! Nodes are addressed by [`NodeIndex`] into an append-only arena; blocks by
//! stable [`crate::utils::graph::BlockIndex`] slots. Control flow is carried by
//! each block's terminal node: successors are read from, and written through,
//! the terminal's payload.
//!
//! # Architecture
//!
//! - [`types`](NodeIndex) - indices, edges, predictions and constants
//! - [`NodeKind`] - the operation vocabulary and its cloning classification
//! - [`Node`] / [`BasicBlock`] / [`Graph`] - the containers
//! - [`GraphBuilder`] - ergonomic construction
//! - [`validate`] - structural well-formedness checks
//! - [`Interpreter`] - a reference evaluator used to check transformations
//!
//! # Local variables
//!
//! Locals are accessed through `GetLocal` / `SetLocal` nodes naming an
//! [`Operand`]. In [`GraphForm::ThreadedCps`] each block additionally carries
//! phis for the locals it reads before writing; see [`Graph::thread_locals`].

mod block;
mod builder;
mod cps;
mod data;
mod dump;
mod graph;
mod interpreter;
mod node;
mod ops;
mod types;
mod validate;

pub use block::{BasicBlock, BlockFlags, Operands};
pub use builder::GraphBuilder;
pub use data::{
    AuxArena, AuxHandle, BranchData, BranchTarget, CallVarargsData, LoadVarargsData, SwitchCase,
    SwitchData,
};
pub use graph::{Graph, GraphForm};
pub use interpreter::{
    Execution, Interpreter, MemoryAccess, MemoryEvent, Value, DEFAULT_STEP_BUDGET,
};
pub use node::{Children, Node, NodeData};
pub use ops::{AuxDataShape, CloneStrategy, NodeKind};
pub use types::{CodeOrigin, Constant, Edge, NodeIndex, Operand, SpeculatedType, UseKind};
pub use validate::validate;
