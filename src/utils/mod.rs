//! Shared utilities.
//!
//! - [`graph`] - block identifiers, graph traits, dominators and traversals
//! - [`BitSet`] - compact per-block membership sets
//! - [`CheckedInt32`] - overflow-flagged arithmetic for compile-time loop simulation
//! - [`FunctionHash`] - stable function identity used by allow-lists
//! - [`escape_dot`] / [`dot_label`] - Graphviz output helpers

mod bitset;
mod dot;
pub mod graph;
mod hash;
mod math;

pub use bitset::BitSet;
pub use dot::{dot_label, escape_dot};
pub use hash::FunctionHash;
pub use math::CheckedInt32;
