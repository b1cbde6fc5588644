//! Deep structural cloning of graph regions.
//!
//! [`CloneHelper`] copies the blocks reachable from a starting block, with
//! their phis and nodes, into fresh blocks of the same graph. Every reference
//! inside the cloned region is rewritten to point at the copy: node operands
//! through the node map, successor edges through the block map. A caller
//! supplied hook decides, block by block, whether successors are cloned too
//! or redirected somewhere else, which is how a loop body is copied without
//! copying everything after it.
//!
//! Cloning is a two-step protocol:
//!
//! 1. Before touching the graph, prove every node of the region cloneable
//!    with [`CloneHelper::is_node_cloneable`].
//! 2. Clone with [`CloneHelper::clone_block`], then commit with
//!    [`CloneHelper::finalize`].
//!
//! A node that reaches step 2 without passing step 1 is an internal error.
//!
//! # Example
//!
//! ```rust,ignore
//! use dfg_unroll::compiler::CloneHelper;
//!
//! let mut helper = CloneHelper::new(&mut graph);
//! let copy = helper.clone_block(header, &mut |graph, source, clone| {
//!     if source != tail {
//!         return Ok(false);
//!     }
//!     graph.convert_to_jump(clone, exit)?;
//!     Ok(true)
//! })?;
//! let removed = helper.finalize();
//! ```

use std::collections::{HashMap, HashSet};

use crate::{
    ir::{
        AuxDataShape, BlockFlags, Children, CloneStrategy, Edge, Graph, NodeData, NodeIndex,
        Operands,
    },
    utils::graph::BlockIndex,
    Result,
};

/// A cloning session over one graph.
///
/// The node and block maps memoize clones for the current session; call
/// [`CloneHelper::clear`] to start an independent copy of the same region.
pub struct CloneHelper<'g> {
    graph: &'g mut Graph,
    node_map: HashMap<NodeIndex, NodeIndex>,
    block_map: HashMap<BlockIndex, BlockIndex>,
}

impl<'g> CloneHelper<'g> {
    /// Starts a cloning session.
    pub fn new(graph: &'g mut Graph) -> Self {
        CloneHelper {
            graph,
            node_map: HashMap::new(),
            block_map: HashMap::new(),
        }
    }

    /// Returns the graph being cloned into.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Returns the graph being cloned into, mutably.
    pub fn graph_mut(&mut self) -> &mut Graph {
        self.graph
    }

    /// Returns true if `node` and, transitively, all its operands can be
    /// cloned.
    ///
    /// Phis count as cloneable operands: they are copied with their block
    /// rather than through their users, so their own operands are not
    /// inspected. Nodes with [`CloneStrategy::Unsupported`] never are.
    ///
    /// # Arguments
    ///
    /// * `graph` - The graph owning `node`.
    /// * `cache` - Results memoized for the current scan.
    /// * `visiting` - The nodes on the current recursion path. Reaching one
    ///   of them again means the operand graph has a cycle, which makes the
    ///   node uncloneable.
    /// * `node` - The node to classify.
    pub fn is_node_cloneable(
        graph: &Graph,
        cache: &mut HashMap<NodeIndex, bool>,
        visiting: &mut HashSet<NodeIndex>,
        node: NodeIndex,
    ) -> bool {
        if let Some(&cloneable) = cache.get(&node) {
            return cloneable;
        }

        let cloneable = match graph.node(node).kind.clone_strategy() {
            CloneStrategy::PreCloned => true,
            CloneStrategy::Unsupported => false,
            CloneStrategy::Common | CloneStrategy::Special(_) => {
                if !visiting.insert(node) {
                    debug_assert!(false, "operand cycle through {node}");
                    return false;
                }
                let children: Vec<NodeIndex> =
                    graph.child_edges(node).filter_map(Edge::node).collect();
                let cloneable = children
                    .into_iter()
                    .all(|child| Self::is_node_cloneable(graph, cache, visiting, child));
                visiting.remove(&node);
                cloneable
            }
        };

        cache.insert(node, cloneable);
        cloneable
    }

    /// Clones `node` into `target`, cloning its operands first.
    ///
    /// Returns the existing copy if `node` was already cloned in this
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for phis (which are
    /// cloned with their block), for unsupported nodes, and for auxiliary
    /// records that do not match the node's strategy.
    pub fn clone_node(&mut self, target: BlockIndex, node: NodeIndex) -> Result<NodeIndex> {
        if let Some(&copy) = self.node_map.get(&node) {
            return Ok(copy);
        }

        let source = self.graph.node(node).clone();
        let strategy = source.kind.clone_strategy();
        let shape = match strategy {
            CloneStrategy::PreCloned => {
                return Err(invariant_violation!(
                    "{} ({}) should have been cloned with its block",
                    node,
                    source.kind
                ))
            }
            CloneStrategy::Unsupported => {
                return Err(invariant_violation!(
                    "{} ({}) cannot be cloned",
                    node,
                    source.kind
                ))
            }
            CloneStrategy::Common => None,
            CloneStrategy::Special(shape) => Some(shape),
        };

        let children = match source.children {
            Children::Fixed(edges) => {
                let mut cloned = [Edge::EMPTY; 3];
                for (slot, edge) in cloned.iter_mut().zip(edges) {
                    *slot = self.clone_edge(target, edge)?;
                }
                Children::Fixed(cloned)
            }
            Children::VarArgs { first, count } => {
                let edges = self.graph.var_arg_children(first, count).to_vec();
                let cloned = edges
                    .into_iter()
                    .map(|edge| self.clone_edge(target, edge))
                    .collect::<Result<Vec<_>>>()?;
                let first = self.graph.var_arg_child_count();
                for edge in cloned {
                    self.graph.add_var_arg_child(edge);
                }
                Children::VarArgs { first, count }
            }
        };

        let mut copy = source;
        copy.children = children;
        if let Some(shape) = shape {
            copy.data = self.clone_aux_data(node, shape, copy.data)?;
        }

        let index = self.graph.append_node(target, copy)?;
        self.node_map.insert(node, index);
        Ok(index)
    }

    fn clone_edge(&mut self, target: BlockIndex, edge: Edge) -> Result<Edge> {
        match edge.node() {
            Some(child) => Ok(edge.with_node(self.clone_node(target, child)?)),
            None => Ok(Edge::EMPTY),
        }
    }

    fn clone_aux_data(
        &mut self,
        node: NodeIndex,
        shape: AuxDataShape,
        data: NodeData,
    ) -> Result<NodeData> {
        let graph = &mut *self.graph;
        let cloned = match (shape, data) {
            (AuxDataShape::BranchTargets, NodeData::Branch(handle)) => graph
                .branch_data(handle)
                .cloned()
                .map(|record| NodeData::Branch(graph.add_branch_data(record))),
            (AuxDataShape::SwitchTable, NodeData::Switch(handle)) => graph
                .switch_data(handle)
                .cloned()
                .map(|record| NodeData::Switch(graph.add_switch_data(record))),
            (AuxDataShape::CallVarargs, NodeData::CallVarargs(handle)) => graph
                .call_varargs_data(handle)
                .cloned()
                .map(|record| NodeData::CallVarargs(graph.add_call_varargs_data(record))),
            (AuxDataShape::LoadVarargs, NodeData::LoadVarargs(handle)) => graph
                .load_varargs_data(handle)
                .cloned()
                .map(|record| NodeData::LoadVarargs(graph.add_load_varargs_data(record))),
            _ => None,
        };
        cloned.ok_or_else(|| {
            invariant_violation!("{} has no {:?} record to clone (found {:?})", node, shape, data)
        })
    }

    /// Clones `source` and, unless the hook intervenes, every block reachable
    /// from it.
    ///
    /// The copy inherits the execution count, is flagged as excluded from
    /// code-size estimation, and is part of the graph's pending insertion
    /// batch. Its phis are copied one-for-one without operands, its nodes in
    /// order, and its head/tail snapshots are remapped to the copies.
    ///
    /// `customize_successors` is called with the source and the copy once the
    /// copy's nodes exist. If it returns `true` it has taken care of the
    /// copy's successors; otherwise each successor is cloned in turn and the
    /// copy's successor slot is pointed at it.
    ///
    /// Predecessor lists are not maintained; [`CloneHelper::finalize`]
    /// recomputes them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if `source` is not a live
    /// block, a node cannot be cloned, or a snapshot refers to a node outside
    /// the block. Errors from the hook are passed through.
    pub fn clone_block<F>(&mut self, source: BlockIndex, customize_successors: &mut F) -> Result<BlockIndex>
    where
        F: FnMut(&mut Graph, BlockIndex, BlockIndex) -> Result<bool>,
    {
        if let Some(&copy) = self.block_map.get(&source) {
            return Ok(copy);
        }

        let (execution_count, flags, phis, nodes, head, tail) = {
            let block = self
                .graph
                .block(source)
                .ok_or_else(|| invariant_violation!("cannot clone missing block {}", source))?;
            (
                block.execution_count,
                block.flags,
                block.phis().to_vec(),
                block.nodes().to_vec(),
                block.variables_at_head.clone(),
                block.variables_at_tail.clone(),
            )
        };

        let copy = self.graph.insert_block(execution_count);
        if let Some(block) = self.graph.block_mut(copy) {
            block.flags = (flags & BlockFlags::SYNTHETIC_EDGE_PAD) | BlockFlags::EXCLUDED_FROM_CODE_SIZE;
        }
        self.block_map.insert(source, copy);

        for phi in phis {
            let mut node = self.graph.node(phi).clone();
            node.children = Children::NONE;
            let index = self.graph.append_phi(copy, node)?;
            self.node_map.insert(phi, index);
        }
        for node in nodes {
            self.clone_node(copy, node)?;
        }

        let head = self.remap_operands(source, &head)?;
        let tail = self.remap_operands(source, &tail)?;
        if let Some(block) = self.graph.block_mut(copy) {
            block.variables_at_head = head;
            block.variables_at_tail = tail;
        }

        if !customize_successors(&mut *self.graph, source, copy)? {
            for slot in 0..self.graph.successor_count(source) {
                let successor = self.graph.successor(source, slot).ok_or_else(|| {
                    invariant_violation!("block {} lost successor slot {}", source, slot)
                })?;
                let successor_copy = self.clone_block(successor, customize_successors)?;
                self.graph.set_successor(copy, slot, successor_copy)?;
            }
        }

        Ok(copy)
    }

    fn remap_operands(&self, source: BlockIndex, operands: &Operands) -> Result<Operands> {
        let mut remapped = Operands::new(operands.len());
        for (operand, node) in operands.iter() {
            let copy = self.node_map.get(&node).ok_or_else(|| {
                invariant_violation!(
                    "{} of block {} refers to {} which was not cloned",
                    operand,
                    source,
                    node
                )
            })?;
            remapped.set(operand, Some(*copy));
        }
        Ok(remapped)
    }

    /// Returns the copy of `block` made in this session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if `block` was not cloned.
    pub fn block_clone(&self, block: BlockIndex) -> Result<BlockIndex> {
        self.block_map
            .get(&block)
            .copied()
            .ok_or_else(|| invariant_violation!("block {} was never cloned", block))
    }

    /// Returns the copy of `node` made in this session, if any.
    #[must_use]
    pub fn node_clone(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.node_map.get(&node).copied()
    }

    /// Forgets the clones of the current session.
    pub fn clear(&mut self) {
        self.node_map.clear();
        self.block_map.clear();
    }

    /// Commits the structural edits and prunes what became unreachable.
    ///
    /// Commits the insertion batch (or, if nothing was inserted, still
    /// invalidates the CFG analyses and drops threaded local information),
    /// recomputes reachability and predecessors, and kills unreachable
    /// blocks.
    ///
    /// # Returns
    ///
    /// The blocks that were killed.
    pub fn finalize(&mut self) -> Vec<BlockIndex> {
        if !self.graph.execute_block_insertions() {
            self.graph.invalidate_cfg();
            self.graph.dethread();
        }
        self.graph.reset_reachability();
        self.graph.kill_unreachable_blocks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{
            BlockFlags, CallVarargsData, CodeOrigin, GraphBuilder, GraphForm, LoadVarargsData,
            Node, NodeKind, Operand,
        },
        test::{array_loop, counted_loop},
        Error,
    };

    fn scan(graph: &Graph) -> HashMap<NodeIndex, bool> {
        let mut cache = HashMap::new();
        let mut visiting = HashSet::new();
        for block in graph.blocks() {
            for &node in block.nodes() {
                CloneHelper::is_node_cloneable(graph, &mut cache, &mut visiting, node);
            }
        }
        assert!(visiting.is_empty());
        cache
    }

    #[test]
    fn test_cloneability_closure() {
        let mut b = GraphBuilder::new(1);
        let entry = b.block();
        b.switch_to(entry);
        let x = b.int32(1);
        let closure = b.node(NodeKind::CreateClosure, Children::NONE, NodeData::None);
        let ok = b.binary(NodeKind::ArithAdd, Edge::int32(x), Edge::int32(x));
        let tainted = b.binary(NodeKind::ArithAdd, Edge::int32(ok), Edge::untyped(closure));
        let user = b.set_local(Operand(0), Edge::untyped(tainted));
        b.ret(None);
        let graph = b.finish().unwrap();

        let cache = scan(&graph);
        assert!(cache[&ok]);
        assert!(!cache[&closure]);
        assert!(!cache[&tainted]);
        assert!(!cache[&user]);
    }

    #[test]
    fn test_phis_are_cloneable_operands() {
        let fixture = counted_loop(0, 4, 1);
        let graph = &fixture.graph;
        let cache = scan(graph);
        let header = graph.block(fixture.header).unwrap();
        for &node in header.nodes() {
            assert!(cache[&node], "{} should be cloneable", graph.format_node(node));
        }
    }

    #[test]
    fn test_clone_block_memoizes_and_remaps() {
        let mut fixture = counted_loop(0, 4, 1);
        let header = fixture.header;
        let exit = fixture.exit;
        let original_len = fixture.graph.block(header).unwrap().nodes().len();

        let mut helper = CloneHelper::new(&mut fixture.graph);
        let mut calls = 0;
        let copy = helper
            .clone_block(header, &mut |graph: &mut Graph, source, clone| {
                calls += 1;
                assert_eq!(source, header);
                graph.convert_to_jump(clone, exit)?;
                Ok(true)
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(helper.block_clone(header).unwrap(), copy);
        assert!(helper.block_clone(exit).is_err());

        // Cloning again in the same session returns the memoized copy.
        let again = helper.clone_block(header, &mut |_: &mut Graph, _, _| Ok(true)).unwrap();
        assert_eq!(again, copy);

        let graph = helper.graph();
        let source = graph.block(header).unwrap();
        let cloned = graph.block(copy).unwrap();
        assert!(cloned.flags.contains(BlockFlags::EXCLUDED_FROM_CODE_SIZE));
        assert_eq!(cloned.phis().len(), source.phis().len());
        // The branch became a Phantom and a Jump.
        assert_eq!(cloned.nodes().len(), original_len + 1);

        let phi = source.phis()[0];
        let phi_copy = helper.node_clone(phi).unwrap();
        assert_eq!(cloned.variables_at_head.get(Operand(0)), Some(phi_copy));
        assert_eq!(graph.child_edges(phi_copy).count(), 0);

        // Operands of copies point at copies.
        for &node in cloned.nodes() {
            for edge in graph.child_edges(node) {
                let child = edge.node().unwrap();
                assert!(
                    cloned.nodes().contains(&child) || cloned.phis().contains(&child),
                    "{} escapes the copy",
                    graph.format_node(node)
                );
            }
        }
    }

    #[test]
    fn test_clone_follows_successors_without_hook() {
        let mut fixture = array_loop(4);
        let (header, exit) = (fixture.header, fixture.exit);
        let before = fixture.graph.live_block_count();

        let mut helper = CloneHelper::new(&mut fixture.graph);
        let mut stop_at_exit = |_: &mut Graph, source: BlockIndex, _: BlockIndex| Ok(source == exit);
        let copy = helper.clone_block(header, &mut stop_at_exit).unwrap();

        // header copy, exit copy
        let graph = helper.graph();
        assert_eq!(graph.live_block_count(), before + 2);
        let successors: Vec<_> = graph.successors(copy).collect();
        assert_eq!(successors[0], copy);
        assert_eq!(successors[1], helper.block_clone(exit).unwrap());
    }

    #[test]
    fn test_special_nodes_get_fresh_records() {
        let mut b = GraphBuilder::new(2);
        let entry = b.block();
        let exit = b.block();
        b.switch_to(entry);
        let f = b.get_local(Operand(0));
        let args = b.get_local(Operand(1));
        let call = b.call_varargs(Edge::untyped(f), Edge::untyped(f), Edge::untyped(args));
        let load = b.load_varargs(
            NodeKind::LoadVarargs,
            Edge::untyped(args),
            LoadVarargsData {
                start: Operand(0),
                count: Operand(1),
                offset: 0,
                mandatory_minimum: 0,
                limit: 8,
            },
        );
        let cond = b.int32(1);
        b.branch(Edge::untyped(cond), exit, exit);
        b.switch_to(exit);
        b.ret(None);
        let mut graph = b.finish().unwrap();

        let mut helper = CloneHelper::new(&mut graph);
        let copy = helper.clone_block(entry, &mut |_: &mut Graph, _, _| Ok(true)).unwrap();
        let call_copy = helper.node_clone(call).unwrap();
        let load_copy = helper.node_clone(load).unwrap();
        let graph = helper.graph_mut();

        let (NodeData::CallVarargs(a), NodeData::CallVarargs(b)) =
            (graph.node(call).data, graph.node(call_copy).data)
        else {
            panic!("call lost its record");
        };
        assert_ne!(a, b);
        assert_eq!(graph.call_varargs_data(b), Some(&CallVarargsData { first_vararg_offset: 0 }));
        assert_ne!(graph.node(load).data, graph.node(load_copy).data);

        // Retargeting the copy leaves the original branch alone.
        graph.set_successor(copy, 0, copy).unwrap();
        assert_eq!(graph.successor(entry, 0), Some(exit));
    }

    #[test]
    fn test_unsupported_and_precloned_are_fatal() {
        let mut fixture = counted_loop(0, 4, 1);
        let header = fixture.header;
        let phi = fixture.graph.block(header).unwrap().phis()[0];
        let closure = fixture
            .graph
            .add_node(Node::new(NodeKind::CreateClosure, CodeOrigin::default()));

        let mut helper = CloneHelper::new(&mut fixture.graph);
        assert!(matches!(
            helper.clone_node(header, phi),
            Err(Error::InvariantViolation { .. })
        ));
        assert!(matches!(
            helper.clone_node(header, closure),
            Err(Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_finalize_without_insertions_still_invalidates() {
        let mut fixture = counted_loop(0, 4, 1);
        let (header, exit) = (fixture.header, fixture.exit);
        assert_eq!(fixture.graph.natural_loops().loop_count(), 1);

        let mut helper = CloneHelper::new(&mut fixture.graph);
        helper.graph_mut().convert_to_jump(header, exit).unwrap();
        assert!(helper.finalize().is_empty());

        let graph = &fixture.graph;
        assert_eq!(graph.form(), GraphForm::LoadStore);
        assert_eq!(graph.natural_loops().loop_count(), 0);
        assert_eq!(graph.predecessors(header), &[graph.entry()]);
    }

    #[test]
    fn test_finalize_prunes_unreachable_clones() {
        let mut fixture = counted_loop(0, 4, 1);
        let header = fixture.header;
        let mut helper = CloneHelper::new(&mut fixture.graph);
        let copy = helper.clone_block(header, &mut |_: &mut Graph, _, _| Ok(true)).unwrap();

        // Nothing branches to the copy.
        assert_eq!(helper.finalize(), vec![copy]);
        assert!(fixture.graph.block(copy).is_none());
    }
}
