// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # dfg-unroll
//!
//! Loop unrolling for the data-flow graph of a mid-tier JIT compiler.
//!
//! The crate contains a small but complete compiler IR (blocks, nodes,
//! locals threaded through phis, out-of-line branch and call records), the
//! control-flow analyses a loop optimizer needs, a structural cloning
//! facility, and the unrolling phase itself. A reference interpreter executes
//! graphs so that transformations can be checked for equivalence.
//!
//! ## Features
//!
//! - **Full unrolling** of counted loops whose trip count is a compile-time
//!   constant, turning the loop into straight-line code
//! - **Partial unrolling** of loops with run-time bounds, repeating the body
//!   inside the loop while keeping every exit test
//! - **Deep structural cloning** of graph regions with memoization and
//!   per-copy auxiliary records
//! - **Profitability rules** based on body size, numeric density and memory
//!   behavior, tunable through [`compiler::UnrollConfig`]
//! - **Structured diagnostics** through a thread-safe [`compiler::EventLog`]
//! - **Parallel batch compilation** of independent graphs with
//!   [`compiler::PassScheduler`]
//!
//! ## Quick Start
//!
//! ```rust
//! use dfg_unroll::prelude::*;
//!
//! // i = 0; do { i = i + 1 } while (i < 4); return i
//! let mut b = GraphBuilder::new(1).name("count");
//! let entry = b.block();
//! let header = b.block();
//! let exit = b.block();
//! let i = Operand(0);
//!
//! b.switch_to(entry);
//! let zero = b.int32(0);
//! b.set_local(i, Edge::int32(zero));
//! b.jump(header);
//!
//! b.switch_to(header);
//! let value = b.get_local(i);
//! let one = b.int32(1);
//! let next = b.binary(NodeKind::ArithAdd, Edge::int32(value), Edge::int32(one));
//! b.set_local(i, Edge::int32(next));
//! let four = b.int32(4);
//! let test = b.binary(NodeKind::CompareLess, Edge::int32(next), Edge::int32(four));
//! b.branch(Edge::untyped(test), header, exit);
//!
//! b.switch_to(exit);
//! let result = b.get_local(i);
//! b.ret(Some(Edge::untyped(result)));
//! let mut graph = b.finish()?;
//!
//! let events = EventLog::new();
//! let mut phase = LoopUnrollingPhase::new(UnrollConfig::default());
//! assert!(phase.run(&mut graph, &events)?);
//! assert_eq!(graph.natural_loops().loop_count(), 0);
//! assert_eq!(Interpreter::new(&graph).run()?.return_value, Value::Int32(4));
//! # Ok::<(), dfg_unroll::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`ir`] - Graph, blocks, nodes, builder, validator, interpreter and dumps
//! - [`analysis`] - Natural loops on top of the dominator tree
//! - [`compiler`] - Cloning, the unrolling phase, configuration, events and scheduling
//! - [`utils`] - Graph algorithms, bit sets, checked arithmetic, function identity
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! A loop that cannot or should not be unrolled is not an error; the phase
//! reports a [`compiler::Rejection`] and moves on. An [`Error`] means the
//! compilation of the affected function must be abandoned:
//!
//! ```rust,ignore
//! use dfg_unroll::Error;
//!
//! match phase.run(&mut graph, &events) {
//!     Ok(changed) => println!("changed: {changed}"),
//!     Err(Error::InvariantViolation { message, file, line }) => {
//!         eprintln!("internal error at {file}:{line}: {message}")
//!     }
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench --bench unroll
//! ```
#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust,ignore
/// use dfg_unroll::prelude::*;
///
/// let mut phase = LoopUnrollingPhase::new(UnrollConfig::conservative());
/// ```
pub mod prelude;

/// Natural loop analysis.
pub mod analysis;

/// Cloning, loop unrolling, configuration, events and scheduling.
pub mod compiler;

/// The data-flow graph IR.
pub mod ir;

/// Shared utilities and generic graph algorithms.
pub mod utils;

/// `dfg-unroll` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust,ignore
/// use dfg_unroll::{ir::{Graph, GraphBuilder}, Result};
///
/// fn build() -> Result<Graph> {
///     GraphBuilder::new(1).finish()
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dfg-unroll` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust,ignore
/// use dfg_unroll::{compiler::FunctionAllowList, Error};
///
/// match FunctionAllowList::from_file("allow.txt") {
///     Ok(list) => println!("{} functions allowed", list.len()),
///     Err(Error::Config(message)) => println!("bad allow-list: {message}"),
///     Err(e) => println!("Error: {e}"),
/// }
/// ```
pub use error::Error;
