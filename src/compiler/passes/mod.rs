//! Built-in graph transformation phases.
//!
//! Each phase implements [`Phase`](crate::compiler::Phase) and records what it
//! did in the shared [`EventLog`](crate::compiler::EventLog).
//!
//! | Phase | Description |
//! |-------|-------------|
//! | [`LoopUnrollingPhase`] | Fully unrolls small counted loops and partially unrolls loops with run-time bounds |

mod unroll;

pub use unroll::{
    BodyStats, InductionVariable, LoopShapeData, LoopUnrollingPhase, Rejection, ValueSource,
};
