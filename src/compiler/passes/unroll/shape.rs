//! Locating the structural parts of a candidate loop.
//!
//! A loop is only unrolled when it has the shape produced by bytecode
//! `for`/`while` loops after loop rotation: one block entering the header from
//! outside, one back edge, and a single exit at the bottom of the body.
//!
//! ```text
//!   [pre-header]
//!        |
//!        v
//!   [header] <-----+
//!        |         |
//!       ...        |
//!        |         |
//!     [tail] ------+   in-loop edge
//!        |
//!        v             out-of-loop edge
//!     [next]
//! ```
//!
//! Critical-edge pads are looked through in both directions, so a back edge
//! split by a pad still has the block before the pad as its tail.

use crate::{
    analysis::NaturalLoop,
    compiler::passes::unroll::{BodyStats, InductionVariable, Rejection},
    ir::{Graph, NodeKind},
    utils::graph::BlockIndex,
};

/// Everything the unroller learned about a loop it decided to transform.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopShapeData {
    /// The loop header.
    pub header: BlockIndex,
    /// The only block entering the loop from outside.
    pub pre_header: BlockIndex,
    /// The only back-edge source and the only exiting block.
    pub tail: BlockIndex,
    /// The tail's successor outside the loop.
    pub next: BlockIndex,
    /// Successor slot of the tail's branch that stays in the loop.
    pub in_loop_slot: usize,
    /// The loop continues while the induction comparison is false.
    pub inverse_condition: bool,
    /// The variable that controls the loop.
    pub induction: InductionVariable,
    /// Number of times the body runs, when init and bound are constants.
    pub iteration_count: Option<u32>,
    /// Size and mix of the body.
    pub body: BodyStats,
}

impl LoopShapeData {
    /// Returns true if the loop will be removed entirely.
    #[must_use]
    pub fn is_full_unroll(&self) -> bool {
        self.iteration_count.is_some()
    }

    /// Successor slot of the tail's branch that leaves the loop.
    #[must_use]
    pub fn exit_slot(&self) -> usize {
        1 - self.in_loop_slot
    }
}

/// The bottom of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TailShape {
    pub tail: BlockIndex,
    pub next: BlockIndex,
    pub in_loop_slot: usize,
}

/// Follows `block` back through edge pads to the block that branched to it.
fn skip_pads_backward(graph: &Graph, mut block: BlockIndex) -> BlockIndex {
    for _ in 0..graph.block_count() {
        match graph.block(block) {
            Some(b) if b.is_edge_pad() => match b.predecessors() {
                [single] => block = *single,
                _ => break,
            },
            _ => break,
        }
    }
    block
}

fn resolved_predecessors(
    graph: &Graph,
    header: BlockIndex,
    in_loop: bool,
) -> Vec<BlockIndex> {
    let dominators = graph.dominators();
    let mut resolved = Vec::new();
    for &pred in graph.predecessors(header) {
        if dominators.dominates(header, pred) != in_loop {
            continue;
        }
        let block = skip_pads_backward(graph, pred);
        if !resolved.contains(&block) {
            resolved.push(block);
        }
    }
    resolved
}

/// Finds the single predecessor of the header that is not dominated by it.
pub(super) fn locate_pre_header(
    graph: &Graph,
    natural_loop: &NaturalLoop,
) -> Result<BlockIndex, Rejection> {
    match resolved_predecessors(graph, natural_loop.header(), false).as_slice() {
        [pre_header] => Ok(*pre_header),
        other => Err(Rejection::NoPreHeader { found: other.len() }),
    }
}

/// Finds the back-edge source and checks it is the loop's only exit.
pub(super) fn locate_tail(
    graph: &Graph,
    natural_loop: &NaturalLoop,
) -> Result<TailShape, Rejection> {
    let tail = match resolved_predecessors(graph, natural_loop.header(), true).as_slice() {
        [tail] => *tail,
        other => return Err(Rejection::NoUniqueTail { found: other.len() }),
    };

    for &block in natural_loop.blocks() {
        if block != tail && graph.successors(block).any(|s| !natural_loop.contains(s)) {
            return Err(Rejection::MultipleExits { block });
        }
    }

    let is_branch = graph
        .terminal(tail)
        .is_some_and(|terminal| graph.node(terminal).kind == NodeKind::Branch);
    if !is_branch {
        return Err(Rejection::TailNotBranch);
    }

    let (Some(taken), Some(not_taken)) = (graph.successor(tail, 0), graph.successor(tail, 1))
    else {
        return Err(Rejection::TailNotBranch);
    };
    match (natural_loop.contains(taken), natural_loop.contains(not_taken)) {
        (true, false) => Ok(TailShape {
            tail,
            next: not_taken,
            in_loop_slot: 0,
        }),
        (false, true) => Ok(TailShape {
            tail,
            next: taken,
            in_loop_slot: 1,
        }),
        _ => Err(Rejection::TailNotBranch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{Edge, GraphBuilder, NodeKind, Operand},
        test::{
            counted_loop, diamond_update_loop, padded_loop, runtime_bound_loop, two_back_edge_loop,
            two_entry_loop,
        },
    };

    fn only_loop(graph: &Graph) -> NaturalLoop {
        let loops = graph.natural_loops();
        assert_eq!(loops.loop_count(), 1);
        loops.loop_at(0).unwrap().clone()
    }

    #[test]
    fn test_single_block_loop() {
        let fixture = counted_loop(0, 4, 1);
        let natural_loop = only_loop(&fixture.graph);

        assert_eq!(
            locate_pre_header(&fixture.graph, &natural_loop),
            Ok(fixture.entry)
        );
        assert_eq!(
            locate_tail(&fixture.graph, &natural_loop),
            Ok(TailShape {
                tail: fixture.header,
                next: fixture.exit,
                in_loop_slot: 0,
            })
        );
    }

    #[test]
    fn test_pads_are_transparent() {
        let fixture = padded_loop();
        let natural_loop = only_loop(&fixture.graph);

        assert_eq!(
            locate_pre_header(&fixture.graph, &natural_loop),
            Ok(fixture.entry)
        );
        let shape = locate_tail(&fixture.graph, &natural_loop).unwrap();
        assert_eq!(shape.tail, fixture.header);
        assert_eq!(shape.in_loop_slot, 1);
        assert_eq!(shape.next, fixture.exit);
    }

    #[test]
    fn test_two_entries_have_no_pre_header() {
        let fixture = two_entry_loop();
        let natural_loop = only_loop(&fixture.graph);
        assert_eq!(natural_loop.header(), fixture.header);
        assert_eq!(
            locate_pre_header(&fixture.graph, &natural_loop),
            Err(Rejection::NoPreHeader { found: 2 })
        );
    }

    #[test]
    fn test_diamond_tail() {
        let fixture = diamond_update_loop();
        let natural_loop = only_loop(&fixture.graph);
        assert_eq!(natural_loop.header(), fixture.header);
        assert_eq!(
            locate_pre_header(&fixture.graph, &natural_loop),
            Ok(fixture.entry)
        );
        let shape = locate_tail(&fixture.graph, &natural_loop).unwrap();
        assert_eq!(shape.tail, fixture.tail);
        assert_eq!(shape.next, fixture.exit);
    }

    #[test]
    fn test_runtime_bound_shape() {
        let fixture = runtime_bound_loop();
        let natural_loop = only_loop(&fixture.graph);
        let shape = locate_tail(&fixture.graph, &natural_loop).unwrap();
        assert_eq!(shape.tail, fixture.header);
        assert_eq!(shape.next, fixture.exit);
    }

    #[test]
    fn test_two_back_edges() {
        let fixture = two_back_edge_loop();
        let natural_loop = only_loop(&fixture.graph);
        assert_eq!(
            locate_tail(&fixture.graph, &natural_loop),
            Err(Rejection::NoUniqueTail { found: 2 })
        );
    }

    #[test]
    fn test_early_exit() {
        // header: if (c) goto exit; body: loop back or exit
        let mut b = GraphBuilder::new(1);
        let entry = b.block();
        let header = b.block();
        let body = b.block();
        let exit = b.block();

        b.switch_to(entry);
        let zero = b.int32(0);
        b.set_local(Operand(0), Edge::int32(zero));
        b.jump(header);

        b.switch_to(header);
        let i = b.get_local(Operand(0));
        b.branch(Edge::untyped(i), exit, body);

        b.switch_to(body);
        let j = b.get_local(Operand(0));
        b.branch(Edge::untyped(j), header, exit);

        b.switch_to(exit);
        b.ret(None);
        let graph = b.finish().unwrap();

        let natural_loop = only_loop(&graph);
        assert_eq!(
            locate_tail(&graph, &natural_loop),
            Err(Rejection::MultipleExits { block: header })
        );
    }

    #[test]
    fn test_tail_must_branch_out() {
        // A loop whose bottom jumps back unconditionally: no exit at all.
        let mut b = GraphBuilder::new(0);
        let entry = b.block();
        let header = b.block();
        b.switch_to(entry);
        b.jump(header);
        b.switch_to(header);
        b.node(NodeKind::LoopHint, crate::ir::Children::NONE, crate::ir::NodeData::None);
        b.jump(header);
        let graph = b.finish().unwrap();

        let natural_loop = only_loop(&graph);
        assert_eq!(
            locate_tail(&graph, &natural_loop),
            Err(Rejection::TailNotBranch)
        );
    }
}
