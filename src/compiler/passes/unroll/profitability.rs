//! Body scan and the unroll-or-not decision.

use std::collections::{HashMap, HashSet};

use crate::{
    analysis::NaturalLoop,
    compiler::{passes::unroll::Rejection, CloneHelper, UnrollConfig},
    ir::{Children, Graph, Node, NodeKind},
};

/// Minimum material size of a numeric hot loop.
const NUMERIC_LOOP_MIN_SIZE: usize = 160;

/// Share of numeric operations above which a loop counts as numeric.
const NUMERIC_RATIO: f64 = 0.3;

/// Share of local accesses a numeric hot loop must exceed.
const LOCAL_ACCESS_RATIO: f64 = 0.4;

/// Size and operation mix of a loop body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodyStats {
    /// Non-pad blocks in the body.
    pub blocks: usize,
    /// Nodes that generate code.
    pub material: usize,
    /// Array element stores.
    pub array_stores: usize,
    /// Array element loads.
    pub array_loads: usize,
    /// Arithmetic, bit operations, conversions and numeric constants.
    pub numeric: usize,
    /// Reads and writes of locals.
    pub local_accesses: usize,
}

impl BodyStats {
    /// Share of material nodes that are numeric.
    #[must_use]
    pub fn numeric_ratio(&self) -> f64 {
        ratio(self.numeric, self.material)
    }

    /// Share of material nodes that access locals.
    #[must_use]
    pub fn local_access_ratio(&self) -> f64 {
        ratio(self.local_accesses, self.material)
    }

    /// True if the body writes arrays but never reads them.
    #[must_use]
    pub fn is_store_dominated(&self) -> bool {
        self.array_stores > 0 && self.array_loads == 0
    }

    /// True for a single-block body dominated by numeric work on locals,
    /// which stays profitable past the ordinary size limits.
    #[must_use]
    pub fn is_numeric_hot_loop(&self, max_numeric_loop_size: usize) -> bool {
        self.blocks == 1
            && self.numeric_ratio() > NUMERIC_RATIO
            && self.local_access_ratio() > LOCAL_ACCESS_RATIO
            && self.material > NUMERIC_LOOP_MIN_SIZE
            && self.material < max_numeric_loop_size
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn is_material(graph: &Graph, node: &Node) -> bool {
    !node.kind.is_zero_cost() && !(node.kind.is_bookkeeping() && node_has_no_children(graph, node))
}

fn node_has_no_children(graph: &Graph, node: &Node) -> bool {
    match node.children {
        Children::Fixed(edges) => edges.iter().all(|edge| !edge.is_set()),
        Children::VarArgs { first, count } => graph
            .var_arg_children(first, count)
            .iter()
            .all(|edge| !edge.is_set()),
    }
}

fn is_numeric(node: &Node) -> bool {
    node.kind.is_numeric()
        || (node.kind == NodeKind::JSConstant
            && node.constant().is_some_and(|constant| constant.is_number()))
}

/// Checks that every body node can be duplicated and measures the body.
///
/// Scanning stops as soon as the body is larger than any limit that could
/// still accept it.
///
/// # Errors
///
/// Returns a [`Rejection`] for unreachable blocks, denylisted or
/// uncloneable nodes, and oversized bodies.
pub(super) fn check_body_unrollable(
    graph: &Graph,
    natural_loop: &NaturalLoop,
    config: &UnrollConfig,
) -> Result<BodyStats, Rejection> {
    let limit = config
        .max_full_unroll_body_size
        .max(config.max_numeric_loop_size);
    let mut stats = BodyStats::default();
    let mut cache = HashMap::new();
    let mut visiting = HashSet::new();

    for &block in natural_loop.blocks() {
        let Some(body_block) = graph.block(block) else {
            return Err(Rejection::UnreachableBlock { block });
        };
        if body_block.is_edge_pad() {
            continue;
        }
        if !body_block.is_reachable() {
            return Err(Rejection::UnreachableBlock { block });
        }
        stats.blocks += 1;

        for &index in body_block.nodes() {
            let node = graph.node(index);
            if node.kind.is_unroll_denylisted() {
                return Err(Rejection::Denylisted { kind: node.kind });
            }
            if !CloneHelper::is_node_cloneable(graph, &mut cache, &mut visiting, index) {
                return Err(Rejection::Uncloneable { kind: node.kind });
            }

            if is_material(graph, node) {
                stats.material += 1;
                if stats.material > limit {
                    return Err(Rejection::BodyTooLarge {
                        size: stats.material,
                        limit,
                    });
                }
            }
            if node.kind.is_array_store() {
                stats.array_stores += 1;
            }
            if node.kind.is_array_load() {
                stats.array_loads += 1;
            }
            if is_numeric(node) {
                stats.numeric += 1;
            }
            if node.kind.is_local_access() {
                stats.local_accesses += 1;
            }
        }
    }

    Ok(stats)
}

/// Decides whether unrolling a measured body pays off.
///
/// # Arguments
///
/// * `stats` - The body measurements.
/// * `full` - Whether the trip count is known, so the loop is fully unrolled.
/// * `config` - Size limits and partial-unroll settings.
///
/// # Errors
///
/// Returns a [`Rejection`] if partial unrolling is needed but not allowed, the
/// body is too large, or the body only stores to arrays.
pub(super) fn compute_profitability(
    stats: &BodyStats,
    full: bool,
    config: &UnrollConfig,
) -> Result<(), Rejection> {
    if !full
        && (!config.enable_partial_unroll
            || config.require_full_unroll
            || config.partial_unroll_copies < 2)
    {
        return Err(Rejection::PartialUnrollDisabled);
    }

    if stats.is_numeric_hot_loop(config.max_numeric_loop_size) {
        return Ok(());
    }

    let limit = config.body_size_limit(full);
    if stats.material > limit {
        return Err(Rejection::BodyTooLarge {
            size: stats.material,
            limit,
        });
    }
    if stats.is_store_dominated() {
        return Err(Rejection::StoreDominated);
    }
    Ok(())
}
