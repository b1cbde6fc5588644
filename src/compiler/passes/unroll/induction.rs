//! Induction-variable recognition and trip-count simulation.
//!
//! The matcher accepts loops whose exit test, in the tail, has the shape
//!
//! ```text
//! compare(update(GetLocal(var), Int32 step), bound)
//! ```
//!
//! optionally wrapped in a `LogicalNot`, with `var` stored once before the
//! loop and once (with the update) inside it. When both the initial value and
//! the bound are int32 constants the loop is run symbolically to find its
//! trip count.

use crate::{
    analysis::NaturalLoop,
    compiler::passes::unroll::Rejection,
    ir::{Edge, Graph, NodeData, NodeIndex, NodeKind, Operand, UseKind},
    utils::{graph::BlockIndex, CheckedInt32},
};

/// Where the initial value or the bound of an induction variable comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// A compile-time int32 constant.
    Constant(i32),
    /// A value only known at run time.
    Node(NodeIndex),
}

impl ValueSource {
    fn of(graph: &Graph, node: NodeIndex) -> Self {
        match graph.node(node).as_int32_constant() {
            Some(value) => ValueSource::Constant(value),
            None => ValueSource::Node(node),
        }
    }

    /// Returns the constant value, if known.
    #[must_use]
    pub fn constant(self) -> Option<i32> {
        match self {
            ValueSource::Constant(value) => Some(value),
            ValueSource::Node(_) => None,
        }
    }
}

/// A recognised loop-control variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InductionVariable {
    /// The local slot holding the variable.
    pub operand: Operand,
    /// The update node stored back to the slot each iteration.
    pub update: NodeIndex,
    /// The update operation.
    pub update_kind: NodeKind,
    /// The constant operand of the update.
    pub step: i32,
    /// The comparison that controls the loop.
    pub compare: NodeKind,
    /// The value stored before the loop.
    pub initial: ValueSource,
    /// The value compared against.
    pub bound: ValueSource,
}

impl InductionVariable {
    fn apply(&self, value: CheckedInt32) -> CheckedInt32 {
        let step = CheckedInt32::new(self.step);
        match self.update_kind {
            NodeKind::ArithAdd => value.add(step),
            NodeKind::ArithSub => value.sub(step),
            NodeKind::ArithMul => value.mul(step),
            _ => value.div(step),
        }
    }

    fn test(&self, value: i32, bound: i32) -> bool {
        match self.compare {
            NodeKind::CompareLess => value < bound,
            NodeKind::CompareLessEq => value <= bound,
            NodeKind::CompareGreater => value > bound,
            NodeKind::CompareGreaterEq => value >= bound,
            _ => value == bound,
        }
    }

    /// Computes how many times the body runs.
    ///
    /// The test sits at the bottom of the loop, so the body runs once before
    /// the first comparison and a count is never zero.
    ///
    /// # Arguments
    ///
    /// * `inverse_condition` - The loop continues while the comparison is false.
    /// * `limit` - The largest acceptable trip count.
    ///
    /// # Returns
    ///
    /// `None` when the initial value or the bound is not a constant.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] if the variable overflows or the count exceeds
    /// `limit`.
    pub fn trip_count(&self, inverse_condition: bool, limit: u32) -> Result<Option<u32>, Rejection> {
        let (Some(initial), Some(bound)) = (self.initial.constant(), self.bound.constant()) else {
            return Ok(None);
        };

        let mut value = CheckedInt32::new(initial);
        let mut count: u32 = 0;
        loop {
            count += 1;
            if count > limit {
                return Err(Rejection::TooManyIterations { limit });
            }
            value = self.apply(value);
            let Some(current) = value.value() else {
                return Err(Rejection::IterationOverflow);
            };
            if self.test(current, bound) == inverse_condition {
                break;
            }
        }

        Ok(Some(count))
    }
}

fn int32_child(graph: &Graph, edge: Edge) -> Option<NodeIndex> {
    if edge.use_kind() != UseKind::Int32 {
        return None;
    }
    edge.node().filter(|&node| graph.try_node(node).is_some())
}

fn stores_to(graph: &Graph, block: BlockIndex, operand: Operand) -> Vec<NodeIndex> {
    graph
        .block(block)
        .map(|b| {
            b.nodes()
                .iter()
                .copied()
                .filter(|&node| {
                    let n = graph.node(node);
                    n.kind == NodeKind::SetLocal && n.operand() == Some(operand)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Matches the loop's exit test against the induction pattern.
///
/// # Arguments
///
/// * `graph` - The graph owning the loop.
/// * `natural_loop` - The candidate loop.
/// * `pre_header` - The block entering the loop.
/// * `tail` - The exiting block, ending in a branch.
/// * `inverse_condition` - Whether the in-loop edge is the not-taken edge.
///
/// # Returns
///
/// The variable and the final inverse flag (a `LogicalNot` around the
/// comparison flips it).
pub(super) fn identify_induction_variable(
    graph: &Graph,
    natural_loop: &NaturalLoop,
    pre_header: BlockIndex,
    tail: BlockIndex,
    mut inverse_condition: bool,
) -> Result<(InductionVariable, bool), Rejection> {
    let branch = graph.terminal(tail).ok_or(Rejection::TailNotBranch)?;
    let mut condition = graph
        .node(branch)
        .child1()
        .node()
        .ok_or(Rejection::NoInductionVariable)?;
    if graph.node(condition).kind == NodeKind::LogicalNot {
        inverse_condition = !inverse_condition;
        condition = graph
            .node(condition)
            .child1()
            .node()
            .ok_or(Rejection::NoInductionVariable)?;
    }

    let compare = graph.node(condition);
    if !compare.kind.is_induction_compare() {
        return Err(Rejection::NoInductionVariable);
    }
    let update = int32_child(graph, compare.child1()).ok_or(Rejection::NoInductionVariable)?;
    let bound = int32_child(graph, compare.child2()).ok_or(Rejection::NoInductionVariable)?;

    let update_node = graph.node(update);
    if !update_node.kind.is_induction_update() {
        return Err(Rejection::NoInductionVariable);
    }
    let read = int32_child(graph, update_node.child1()).ok_or(Rejection::NoInductionVariable)?;
    let step = int32_child(graph, update_node.child2())
        .and_then(|node| graph.node(node).as_int32_constant())
        .ok_or(Rejection::NoInductionVariable)?;

    let read_node = graph.node(read);
    let operand = match (read_node.kind, read_node.data) {
        (NodeKind::GetLocal, NodeData::Local(operand)) => operand,
        _ => return Err(Rejection::NoInductionVariable),
    };

    let initial_stores = stores_to(graph, pre_header, operand);
    let [initial_store] = initial_stores.as_slice() else {
        return Err(Rejection::AmbiguousInitialValue {
            stores: initial_stores.len(),
        });
    };
    let initial = graph
        .node(*initial_store)
        .child1()
        .node()
        .map(|node| ValueSource::of(graph, node))
        .ok_or(Rejection::NoInductionVariable)?;

    let mut body_stores = Vec::new();
    for &block in natural_loop.blocks() {
        body_stores.extend(stores_to(graph, block, operand));
    }
    // The store's value is the compare's operand, and operands are
    // block-local, so a matching store sits in the tail and runs on every
    // iteration. A second store, possibly skipped, is caught by the count.
    let [update_store] = body_stores.as_slice() else {
        return Err(Rejection::AmbiguousUpdate {
            stores: body_stores.len(),
        });
    };
    if graph.node(*update_store).child1().node() != Some(update) {
        return Err(Rejection::AmbiguousUpdate { stores: 1 });
    }

    let variable = InductionVariable {
        operand,
        update,
        update_kind: update_node.kind,
        step,
        compare: compare.kind,
        initial,
        bound: ValueSource::of(graph, bound),
    };
    Ok((variable, inverse_condition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{counted_loop, diamond_update_loop, padded_loop, runtime_bound_loop};

    fn variable(kind: NodeKind, step: i32, compare: NodeKind, initial: i32, bound: i32) -> InductionVariable {
        InductionVariable {
            operand: Operand(0),
            update: NodeIndex::new(0),
            update_kind: kind,
            step,
            compare,
            initial: ValueSource::Constant(initial),
            bound: ValueSource::Constant(bound),
        }
    }

    fn identify(graph: &Graph, pre_header: BlockIndex, tail: BlockIndex, inverse: bool) -> Result<(InductionVariable, bool), Rejection> {
        let natural_loop = graph.natural_loops().loop_at(0).unwrap().clone();
        identify_induction_variable(graph, &natural_loop, pre_header, tail, inverse)
    }

    #[test]
    fn test_trip_counts() {
        let up = variable(NodeKind::ArithAdd, 1, NodeKind::CompareLess, 0, 4);
        assert_eq!(up.trip_count(false, 16), Ok(Some(4)));

        let down = variable(NodeKind::ArithSub, 2, NodeKind::CompareGreater, 10, 0);
        assert_eq!(down.trip_count(false, 16), Ok(Some(5)));

        let doubling = variable(NodeKind::ArithMul, 2, NodeKind::CompareLessEq, 1, 64);
        assert_eq!(doubling.trip_count(false, 16), Ok(Some(7)));

        // Bottom-tested: the body runs once even if the test fails at once.
        let once = variable(NodeKind::ArithAdd, 1, NodeKind::CompareLess, 10, 4);
        assert_eq!(once.trip_count(false, 16), Ok(Some(1)));

        // i != 8 written as !(i == 8)
        let until = variable(NodeKind::ArithAdd, 2, NodeKind::CompareEq, 0, 8);
        assert_eq!(until.trip_count(true, 16), Ok(Some(4)));
    }

    #[test]
    fn test_trip_count_rejections() {
        let long = variable(NodeKind::ArithAdd, 1, NodeKind::CompareLess, 0, 100);
        assert_eq!(
            long.trip_count(false, 16),
            Err(Rejection::TooManyIterations { limit: 16 })
        );

        let overflow = variable(NodeKind::ArithAdd, 1 << 30, NodeKind::CompareGreater, 0, -1);
        assert_eq!(overflow.trip_count(false, 16), Err(Rejection::IterationOverflow));

        let by_zero = variable(NodeKind::ArithDiv, 0, NodeKind::CompareLess, 5, 10);
        assert_eq!(by_zero.trip_count(false, 16), Err(Rejection::IterationOverflow));

        let stuck = variable(NodeKind::ArithAdd, 0, NodeKind::CompareLess, 0, 4);
        assert_eq!(
            stuck.trip_count(false, 16),
            Err(Rejection::TooManyIterations { limit: 16 })
        );
    }

    #[test]
    fn test_runtime_values_have_no_count() {
        let mut runtime = variable(NodeKind::ArithAdd, 1, NodeKind::CompareLess, 0, 4);
        runtime.bound = ValueSource::Node(NodeIndex::new(3));
        assert_eq!(runtime.trip_count(false, 16), Ok(None));
    }

    #[test]
    fn test_identify_counted_loop() {
        let fixture = counted_loop(2, 10, 3);
        let (variable, inverse) =
            identify(&fixture.graph, fixture.entry, fixture.header, false).unwrap();
        assert!(!inverse);
        assert_eq!(variable.operand, Operand(0));
        assert_eq!(variable.update_kind, NodeKind::ArithAdd);
        assert_eq!(variable.step, 3);
        assert_eq!(variable.compare, NodeKind::CompareLess);
        assert_eq!(variable.initial, ValueSource::Constant(2));
        assert_eq!(variable.bound, ValueSource::Constant(10));
        // 5, 8, 11
        assert_eq!(variable.trip_count(inverse, 16), Ok(Some(3)));
    }

    #[test]
    fn test_identify_inverted_exit() {
        let fixture = padded_loop();
        let (variable, inverse) =
            identify(&fixture.graph, fixture.entry, fixture.header, true).unwrap();
        assert!(inverse);
        assert_eq!(variable.compare, NodeKind::CompareGreaterEq);
        assert_eq!(variable.trip_count(inverse, 16), Ok(Some(4)));
    }

    #[test]
    fn test_identify_runtime_bound() {
        let fixture = runtime_bound_loop();
        let (variable, _) =
            identify(&fixture.graph, fixture.entry, fixture.header, false).unwrap();
        assert!(matches!(variable.bound, ValueSource::Node(_)));
        assert_eq!(variable.initial, ValueSource::Constant(0));
    }

    #[test]
    fn test_second_initial_store_rejected() {
        let fixture = crate::test::twice_initialized_loop();
        assert_eq!(
            identify(&fixture.graph, fixture.entry, fixture.header, false),
            Err(Rejection::AmbiguousInitialValue { stores: 2 })
        );
    }

    #[test]
    fn test_skippable_second_update_rejected() {
        let fixture = diamond_update_loop();
        assert_eq!(
            identify(&fixture.graph, fixture.entry, fixture.tail, false),
            Err(Rejection::AmbiguousUpdate { stores: 2 })
        );
    }
}
