//! Control-flow analyses over [`crate::ir::Graph`].
//!
//! These build on the generic graph algorithms in [`crate::utils::graph`]:
//!
//! - [`loops`] - Natural loop detection and the loop nesting forest
//!
//! Dominators come from [`crate::utils::graph::algorithms::compute_dominators`];
//! both results are cached on the graph and invalidated by structural edits.
//!
//! # Usage
//!
//! ```rust,ignore
//! let loops = graph.natural_loops();
//! for natural_loop in loops.iter() {
//!     let depth = std::iter::successors(Some(natural_loop), |l| loops.innermost_outer_loop(l)).count();
//!     println!("loop at {} (depth {depth})", natural_loop.header());
//! }
//! ```

pub mod loops;

pub use loops::{NaturalLoop, NaturalLoops};
