//! Graph transformations and the infrastructure that drives them.
//!
//! This module sits on top of the IR ([`crate::ir`]) and its analyses
//! ([`crate::analysis`]):
//!
//! - [`CloneHelper`] - deep structural cloning of graph regions
//! - [`LoopUnrollingPhase`] - the loop unroller
//! - [`UnrollConfig`] - tuning knobs and the function allow-list
//! - [`EventLog`] - change tracking and diagnostics
//! - [`PassScheduler`] - runs phases over batches of graphs in parallel
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Compiler Pipeline                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  PassScheduler               Parallel batch execution (rayon)    │
//! │    ├─ one task per graph      (graphs are never shared)          │
//! │    ├─ fresh phase instances   (per-compilation state)            │
//! │    └─ validation after change                                    │
//! │                                                                  │
//! │  Phase trait                 Interface for all phases            │
//! │    ├─ run()                   Per-graph transformation           │
//! │    └─ name() / description()                                     │
//! │                                                                  │
//! │  LoopUnrollingPhase          Candidate loops, innermost first    │
//! │    ├─ shape                   pre-header, tail, exit             │
//! │    ├─ induction               pattern match, trip count          │
//! │    ├─ profitability           body scan, size and mix rules      │
//! │    └─ CloneHelper             copies, stitching, pruning         │
//! │                                                                  │
//! │  EventLog                    Change tracking and diagnostics     │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use dfg_unroll::compiler::{EventLog, LoopUnrollingPhase, PassScheduler, UnrollConfig};
//!
//! let scheduler = PassScheduler::default()
//!     .with_phase(|| Box::new(LoopUnrollingPhase::new(UnrollConfig::default())));
//! let events = EventLog::new();
//! let results = scheduler.run(&mut graphs, &events);
//! println!("{}", events.summary());
//! ```

mod clone;
mod config;
mod events;
mod pass;
mod passes;
mod scheduler;

pub use clone::CloneHelper;
pub use config::{FunctionAllowList, UnrollConfig};
pub use events::{DerivedStats, Event, EventBuilder, EventKind, EventLog};
pub use pass::Phase;
pub use passes::{
    BodyStats, InductionVariable, LoopShapeData, LoopUnrollingPhase, Rejection, ValueSource,
};
pub use scheduler::PassScheduler;
