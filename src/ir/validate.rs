//! Structural validation of graphs.
//!
//! The checks are the structural ones every transformation must preserve:
//!
//! - every live block ends in exactly one terminal, and only the last node is
//!   a terminal;
//! - every successor slot names a live block;
//! - every node is placed at most once, phis only in phi lists;
//! - every operand exists and is defined earlier in the same block (or is one
//!   of the block's phis), except phi operands, which may come from any
//!   live block;
//! - every auxiliary-record handle is in range and matches its node kind.
//!
//! Data-flow properties (types, liveness, the threaded form) are not checked.

use crate::{
    ir::{Children, Graph, NodeData, NodeIndex, NodeKind},
    utils::graph::BlockIndex,
    Result,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Placement {
    Phi(BlockIndex),
    Node(BlockIndex, usize),
}

impl Placement {
    fn block(self) -> BlockIndex {
        match self {
            Placement::Phi(block) | Placement::Node(block, _) => block,
        }
    }
}

/// Checks the structural well-formedness of `graph`.
///
/// # Errors
///
/// Returns [`crate::Error::GraphError`] describing the first problem found.
pub fn validate(graph: &Graph) -> Result<()> {
    if graph.block(graph.entry()).is_none() {
        return Err(graph_error!("graph has no entry block"));
    }

    let placements = place_nodes(graph)?;

    for block in graph.blocks() {
        let index = block.index();
        let Some(&last) = block.nodes().last() else {
            return Err(graph_error!("block {} is empty", index));
        };

        for (position, &node) in block.nodes().iter().enumerate() {
            let kind = graph.node(node).kind;
            if kind.is_terminal() != (node == last) {
                return Err(if node == last {
                    graph_error!("block {} ends in non-terminal {} ({})", index, node, kind)
                } else {
                    graph_error!("terminal {} ({}) in the middle of block {}", node, kind, index)
                });
            }
            check_data(graph, node)?;
            check_children(graph, &placements, node, |child| {
                match placements[child.index()] {
                    Some(Placement::Phi(owner)) => owner == index,
                    Some(Placement::Node(owner, at)) => owner == index && at < position,
                    None => false,
                }
            })?;
        }

        for &phi in block.phis() {
            check_children(graph, &placements, phi, |child| {
                placements[child.index()]
                    .is_some_and(|placement| graph.block(placement.block()).is_some())
            })?;
        }

        if block.is_edge_pad() && block.nodes().len() != 1 {
            return Err(graph_error!("edge pad {} holds more than its jump", index));
        }

        for (slot, target) in (0..graph.successor_count(index)).map(|i| (i, graph.successor(index, i))) {
            match target {
                Some(target) if graph.block(target).is_some() => {}
                Some(target) => {
                    return Err(graph_error!(
                        "block {} successor {} names dead block {}",
                        index,
                        slot,
                        target
                    ))
                }
                None => return Err(graph_error!("block {} successor {} is unset", index, slot)),
            }
        }
    }

    Ok(())
}

/// Maps every placed node to its block and position, rejecting double
/// placement and misplaced phis.
fn place_nodes(graph: &Graph) -> Result<Vec<Option<Placement>>> {
    let mut placements = vec![None; graph.node_count()];
    let mut place = |node: NodeIndex, placement: Placement| -> Result<()> {
        let slot = placements
            .get_mut(node.index())
            .ok_or_else(|| graph_error!("block {} lists unknown node {}", placement.block(), node))?;
        if slot.is_some() {
            return Err(graph_error!("node {} is placed twice", node));
        }
        *slot = Some(placement);
        Ok(())
    };

    for block in graph.blocks() {
        if graph.block(block.index()).map(|b| b.index()) != Some(block.index()) {
            return Err(graph_error!("block {} is stored in the wrong slot", block.index()));
        }
        for &phi in block.phis() {
            place(phi, Placement::Phi(block.index()))?;
        }
        for (position, &node) in block.nodes().iter().enumerate() {
            place(node, Placement::Node(block.index(), position))?;
        }
    }

    for block in graph.blocks() {
        for &phi in block.phis() {
            if graph.node(phi).kind != NodeKind::Phi {
                return Err(graph_error!("phi list of {} holds {}", block.index(), phi));
            }
        }
        for &node in block.nodes() {
            if graph.node(node).kind == NodeKind::Phi {
                return Err(graph_error!("phi {} in the node list of {}", node, block.index()));
            }
        }
    }

    Ok(placements)
}

fn check_children(
    graph: &Graph,
    placements: &[Option<Placement>],
    node: NodeIndex,
    visible: impl Fn(NodeIndex) -> bool,
) -> Result<()> {
    if let Children::VarArgs { first, count } = graph.node(node).children {
        if first.saturating_add(count) > graph.var_arg_child_count() {
            return Err(graph_error!("{} has an out-of-range variadic child list", node));
        }
    }
    for edge in graph.child_edges(node) {
        let Some(child) = edge.node() else {
            continue;
        };
        if child.index() >= placements.len() {
            return Err(graph_error!("{} uses unknown node {}", node, child));
        }
        if !visible(child) {
            return Err(graph_error!("{} uses {} which is not available there", node, child));
        }
    }
    Ok(())
}

fn check_data(graph: &Graph, node: NodeIndex) -> Result<()> {
    let n = graph.node(node);
    let valid = match (n.kind, n.data) {
        (NodeKind::Jump, NodeData::Jump(_)) => true,
        (NodeKind::Branch, NodeData::Branch(handle)) => graph.branch_data(handle).is_some(),
        (NodeKind::Switch, NodeData::Switch(handle)) => graph.switch_data(handle).is_some(),
        (NodeKind::CallVarargs, NodeData::CallVarargs(handle)) => {
            graph.call_varargs_data(handle).is_some()
        }
        (
            NodeKind::LoadVarargs | NodeKind::VarargsLength | NodeKind::ForwardVarargs,
            NodeData::LoadVarargs(handle),
        ) => graph.load_varargs_data(handle).is_some(),
        (NodeKind::Jump | NodeKind::Branch | NodeKind::Switch | NodeKind::CallVarargs, _)
        | (NodeKind::LoadVarargs | NodeKind::VarargsLength, _) => false,
        (kind, NodeData::Local(_)) => kind.has_operand(),
        (kind, _) if kind.has_operand() => false,
        (kind, NodeData::Constant(_)) => kind.is_constant(),
        (_, NodeData::Jump(_) | NodeData::Branch(_) | NodeData::Switch(_))
        | (_, NodeData::CallVarargs(_) | NodeData::LoadVarargs(_)) => false,
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(graph_error!("{} ({}) carries mismatched data {:?}", node, n.kind, n.data))
    }
}
