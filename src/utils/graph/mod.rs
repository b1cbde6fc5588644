//! Generic control flow graph infrastructure.
//!
//! The algorithms here only see blocks and edges: anything implementing
//! [`GraphBase`], [`Successors`] and [`Predecessors`] can be traversed, have
//! its dominator tree computed, and have its natural loops detected by
//! [`crate::analysis::NaturalLoops`].

pub mod algorithms;
mod index;
pub(crate) mod traits;

pub use index::BlockIndex;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
