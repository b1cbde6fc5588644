//! Loop unrolling.
//!
//! Replaces small counted loops by straight-line copies of their body (full
//! unrolling) or by a loop whose body is repeated a few times per iteration
//! (partial unrolling).
//!
//! # Algorithm
//!
//! Candidate loops are visited innermost first. For each candidate:
//!
//! 1. Locate the pre-header and the tail ([`shape`]). The tail must be the
//!    only back-edge source and the only exit, ending in a branch.
//! 2. Match the exit test against the induction pattern and, for constant
//!    init and bound, simulate the loop to get its trip count ([`induction`]).
//! 3. Prove the body cloneable and measure it ([`profitability`]).
//! 4. Decide whether the copies pay for themselves.
//! 5. Clone the body with [`CloneHelper`], stitching the copies together by
//!    rewriting the tail of each copy, and prune what became unreachable.
//!
//! After a successful unroll the loop forest is recomputed and candidates are
//! enumerated again, until nothing more is unrolled or the per-compilation
//! budget is spent.
//!
//! # Full unrolling
//!
//! A loop that runs `k` times becomes `k` copies of the body chained by
//! jumps; the original body is the first copy.
//!
//! ```text
//! pre -> [body] -> [body'] -> [body''] -> [body'''] -> next
//! ```
//!
//! # Partial unrolling
//!
//! With an unknown trip count the body is repeated `partial_unroll_copies`
//! times inside the loop. Every copy keeps its exit test.
//!
//! ```text
//! pre -> [body] -> [body'] --+
//!          ^  |        |     |
//!          |  v        v     |
//!          | next     next   |
//!          +-----------------+
//! ```

mod induction;
mod profitability;
mod rejection;
mod shape;

pub use induction::{InductionVariable, ValueSource};
pub use profitability::BodyStats;
pub use rejection::Rejection;
pub use shape::LoopShapeData;

use std::collections::{HashMap, HashSet};

use crate::{
    analysis::{NaturalLoop, NaturalLoops},
    compiler::{CloneHelper, EventKind, EventLog, Phase, UnrollConfig},
    ir::Graph,
    utils::graph::BlockIndex,
    Result,
};

/// The loop unrolling phase.
///
/// One instance serves one compilation: it remembers which headers it has
/// unrolled or rejected so that no loop is transformed or analyzed twice, and
/// it enforces [`UnrollConfig::max_unrolled_loops`] across all loops of the
/// graph.
///
/// # Example
///
/// ```rust,ignore
/// use dfg_unroll::compiler::{EventLog, LoopUnrollingPhase, Phase, UnrollConfig};
///
/// let mut phase = LoopUnrollingPhase::new(UnrollConfig::default());
/// let events = EventLog::new();
/// if phase.run(&mut graph, &events)? {
///     println!("{}", events.summary());
/// }
/// ```
pub struct LoopUnrollingPhase {
    config: UnrollConfig,
    unrolled: HashSet<BlockIndex>,
    rejected: HashSet<BlockIndex>,
}

impl LoopUnrollingPhase {
    /// Creates the phase for one compilation.
    #[must_use]
    pub fn new(config: UnrollConfig) -> Self {
        Self {
            config,
            unrolled: HashSet::new(),
            rejected: HashSet::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &UnrollConfig {
        &self.config
    }

    /// Returns the number of loops unrolled so far.
    #[must_use]
    pub fn unrolled_count(&self) -> usize {
        self.unrolled.len()
    }

    /// Returns true if the loop headed by `header` was unrolled.
    #[must_use]
    pub fn was_unrolled(&self, header: BlockIndex) -> bool {
        self.unrolled.contains(&header)
    }

    /// Returns the headers of the loops still eligible, deepest first.
    ///
    /// Loops at the same depth keep their discovery order. Loops already
    /// unrolled or rejected are skipped, as are loops containing other loops
    /// when [`UnrollConfig::innermost_only`] is set.
    #[must_use]
    pub fn candidates(&self, graph: &Graph) -> Vec<BlockIndex> {
        let loops = graph.natural_loops();
        let mut depths = HashMap::new();
        let mut candidates: Vec<(BlockIndex, usize)> = loops
            .iter()
            .filter(|natural_loop| {
                let header = natural_loop.header();
                !self.unrolled.contains(&header) && !self.rejected.contains(&header)
            })
            .filter(|natural_loop| !self.config.innermost_only || !loops.has_inner_loops(natural_loop))
            .map(|natural_loop| (natural_loop.header(), loop_depth(loops, natural_loop, &mut depths)))
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        candidates.into_iter().map(|(header, _)| header).collect()
    }

    /// Runs every check on a loop without changing the graph.
    ///
    /// # Errors
    ///
    /// Returns the first [`Rejection`] in pipeline order.
    pub fn analyze(
        &self,
        graph: &Graph,
        natural_loop: &NaturalLoop,
    ) -> std::result::Result<LoopShapeData, Rejection> {
        let header = natural_loop.header();
        let pre_header = shape::locate_pre_header(graph, natural_loop)?;
        let tail = shape::locate_tail(graph, natural_loop)?;

        let (induction, inverse_condition) = induction::identify_induction_variable(
            graph,
            natural_loop,
            pre_header,
            tail.tail,
            tail.in_loop_slot == 1,
        )?;
        let iteration_count =
            induction.trip_count(inverse_condition, self.config.max_iteration_count)?;

        let body = profitability::check_body_unrollable(graph, natural_loop, &self.config)?;
        profitability::compute_profitability(&body, iteration_count.is_some(), &self.config)?;

        Ok(LoopShapeData {
            header,
            pre_header,
            tail: tail.tail,
            next: tail.next,
            in_loop_slot: tail.in_loop_slot,
            inverse_condition,
            induction,
            iteration_count,
            body,
        })
    }

    /// Rewrites the graph according to an accepted shape.
    ///
    /// # Returns
    ///
    /// The blocks that became unreachable and were removed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if cloning fails; the graph
    /// is left partially rewritten.
    pub fn unroll(&self, graph: &mut Graph, shape: &LoopShapeData) -> Result<Vec<BlockIndex>> {
        let full = shape.is_full_unroll();
        let copies = match shape.iteration_count {
            Some(count) => count.saturating_sub(1) as usize,
            None => self.config.partial_unroll_copies.saturating_sub(1),
        };
        let (header, tail, next) = (shape.header, shape.tail, shape.next);
        let (in_loop_slot, exit_slot) = (shape.in_loop_slot, shape.exit_slot());

        let mut helper = CloneHelper::new(graph);
        // Copies are generated last-to-first so each can point at its successor.
        let mut following = if full { next } else { header };
        for _ in 0..copies {
            helper.clear();
            let target = following;
            let mut stitch = |graph: &mut Graph, source: BlockIndex, clone: BlockIndex| -> Result<bool> {
                if source != tail {
                    return Ok(false);
                }
                if full {
                    graph.convert_to_jump(clone, target)?;
                } else {
                    graph.set_successor(clone, in_loop_slot, target)?;
                    graph.set_successor(clone, exit_slot, next)?;
                }
                Ok(true)
            };
            following = helper.clone_block(header, &mut stitch)?;
        }

        if full {
            helper.graph_mut().convert_to_jump(tail, following)?;
        } else {
            helper.graph_mut().set_successor(tail, in_loop_slot, following)?;
        }
        Ok(helper.finalize())
    }

    fn record_unroll(&self, graph: &Graph, shape: &LoopShapeData, events: &EventLog) {
        let function = graph.function();
        let message = match shape.iteration_count {
            Some(count) => format!(
                "{} iterations of {} nodes flattened",
                count, shape.body.material
            ),
            None => format!(
                "body of {} nodes repeated {} times",
                shape.body.material, self.config.partial_unroll_copies
            ),
        };
        let kind = if shape.is_full_unroll() {
            EventKind::LoopUnrolled
        } else {
            EventKind::LoopPartiallyUnrolled
        };
        events
            .record(kind)
            .at(function, shape.header)
            .pass(self.name())
            .message(message);
    }

    fn record_rejection(
        &self,
        graph: &Graph,
        header: BlockIndex,
        rejection: Rejection,
        events: &EventLog,
    ) {
        if self.config.verbose {
            events
                .record(EventKind::LoopRejected)
                .at(graph.function(), header)
                .pass(self.name())
                .message(format!("{}: {}", rejection.check(), rejection));
        }
    }

    fn dump(&self, graph: &Graph, label: &str, events: &EventLog) {
        if self.config.dump_graph {
            events
                .record(EventKind::Info)
                .function(graph.function())
                .pass(self.name())
                .message(format!("{label}:\n{graph}"));
        }
    }

    /// Finds the next loop to unroll, recording rejections along the way.
    fn select(&mut self, graph: &Graph, events: &EventLog) -> Option<LoopShapeData> {
        for header in self.candidates(graph) {
            let Some(natural_loop) = graph.natural_loops().loop_for_header(header) else {
                continue;
            };
            match self.analyze(graph, natural_loop) {
                Ok(shape) => return Some(shape),
                Err(rejection) => {
                    self.rejected.insert(header);
                    self.record_rejection(graph, header, rejection, events);
                }
            }
        }
        None
    }
}

/// Nesting depth of a loop: 1 for outermost loops.
fn loop_depth(
    loops: &NaturalLoops,
    natural_loop: &NaturalLoop,
    memo: &mut HashMap<usize, usize>,
) -> usize {
    if let Some(&depth) = memo.get(&natural_loop.index()) {
        return depth;
    }
    let depth = match loops.innermost_outer_loop(natural_loop) {
        Some(outer) => 1 + loop_depth(loops, outer, memo),
        None => 1,
    };
    memo.insert(natural_loop.index(), depth);
    depth
}

impl Phase for LoopUnrollingPhase {
    fn name(&self) -> &'static str {
        "loop-unrolling"
    }

    fn description(&self) -> &'static str {
        "Unrolls small counted loops by cloning their bodies"
    }

    fn run(&mut self, graph: &mut Graph, events: &EventLog) -> Result<bool> {
        if !self.config.is_function_allowed(graph.function()) {
            self.record_rejection(graph, graph.entry(), Rejection::FunctionNotAllowed, events);
            return Ok(false);
        }

        graph.reset_reachability();
        self.dump(graph, "before loop unrolling", events);

        let mut changed = false;
        while self.unrolled.len() < self.config.max_unrolled_loops {
            let Some(shape) = self.select(graph, events) else {
                break;
            };
            let removed = self.unroll(graph, &shape)?;
            self.unrolled.insert(shape.header);
            changed = true;

            self.record_unroll(graph, &shape, events);
            for block in removed {
                events
                    .record(EventKind::BlockRemoved)
                    .at(graph.function(), block)
                    .pass(self.name())
                    .message("unreachable after unrolling");
            }
        }

        if changed {
            graph.thread_locals();
            self.dump(graph, "after loop unrolling", events);
        }
        Ok(changed)
    }
}
