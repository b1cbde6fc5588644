//! The owning container of blocks, nodes and auxiliary records.

use std::sync::OnceLock;

use crate::{
    analysis::NaturalLoops,
    ir::{
        AuxArena, AuxHandle, BasicBlock, BlockFlags, BranchData, CallVarargsData, Children, Edge,
        LoadVarargsData, Node, NodeData, NodeIndex, NodeKind, SwitchData,
    },
    utils::{
        graph::{
            algorithms::{compute_dominators, dfs, DominatorTree},
            BlockIndex, GraphBase, Predecessors, RootedGraph, Successors,
        },
        FunctionHash,
    },
    Result,
};

/// How local variables are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphForm {
    /// Locals are plain loads and stores; phis carry no data-flow edges.
    LoadStore,
    /// Each block has phis for the locals it reads before writing, linked to
    /// the predecessors' tail values, and `GetLocal` nodes reference them.
    ThreadedCps,
}

/// A function's data-flow graph.
///
/// The graph owns every block, node and auxiliary record. Blocks are addressed
/// by stable [`BlockIndex`] slots: killing a block empties its slot without
/// renumbering. Nodes live in an append-only arena.
///
/// Dominators and natural loops are computed lazily on first use and cached
/// until the next structural edit calls [`Graph::invalidate_cfg`].
///
/// # Block insertion
///
/// Transformations create blocks through [`Graph::insert_block`], which
/// appends the block immediately but records it as pending. A later
/// [`Graph::execute_block_insertions`] commits the batch, invalidating the
/// CFG analyses and dropping threaded local information.
///
/// # Examples
///
/// ```rust,ignore
/// use dfg_unroll::ir::GraphBuilder;
///
/// let graph = GraphBuilder::new(1).finish()?;
/// let dominators = graph.dominators();
/// let loops = graph.natural_loops();
/// ```
#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    function: Option<FunctionHash>,
    num_locals: usize,
    form: GraphForm,
    blocks: Vec<Option<BasicBlock>>,
    nodes: Vec<Node>,
    var_arg_children: Vec<Edge>,
    branch_data: AuxArena<BranchData>,
    switch_data: AuxArena<SwitchData>,
    call_varargs_data: AuxArena<CallVarargsData>,
    load_varargs_data: AuxArena<LoadVarargsData>,
    pending_insertions: usize,
    dominators: OnceLock<DominatorTree>,
    natural_loops: OnceLock<NaturalLoops>,
}

impl Graph {
    /// Creates an empty graph for a function with `num_locals` local slots.
    #[must_use]
    pub fn new(num_locals: usize) -> Self {
        Graph {
            name: String::new(),
            function: None,
            num_locals,
            form: GraphForm::LoadStore,
            blocks: Vec::new(),
            nodes: Vec::new(),
            var_arg_children: Vec::new(),
            branch_data: AuxArena::default(),
            switch_data: AuxArena::default(),
            call_varargs_data: AuxArena::default(),
            load_varargs_data: AuxArena::default(),
            pending_insertions: 0,
            dominators: OnceLock::new(),
            natural_loops: OnceLock::new(),
        }
    }

    /// Returns the function name used in dumps.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the function name used in dumps.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the stable identity of the compiled function, if known.
    #[must_use]
    pub fn function(&self) -> Option<FunctionHash> {
        self.function
    }

    /// Sets the stable identity of the compiled function.
    pub fn set_function(&mut self, function: Option<FunctionHash>) {
        self.function = function;
    }

    /// Returns the number of local slots.
    #[must_use]
    pub fn num_locals(&self) -> usize {
        self.num_locals
    }

    /// Returns how locals are currently represented.
    #[must_use]
    pub fn form(&self) -> GraphForm {
        self.form
    }

    pub(crate) fn set_form(&mut self, form: GraphForm) {
        self.form = form;
    }

    // ---------------------------------------------------------------------------------------------
    // Blocks
    // ---------------------------------------------------------------------------------------------

    /// Returns the entry block, which is always slot 0.
    #[must_use]
    pub fn entry(&self) -> BlockIndex {
        BlockIndex::new(0)
    }

    /// Returns the number of block slots, including killed ones.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of live blocks.
    #[must_use]
    pub fn live_block_count(&self) -> usize {
        self.blocks.iter().flatten().count()
    }

    /// Returns the block in slot `block`, unless it was killed.
    #[must_use]
    pub fn block(&self, block: BlockIndex) -> Option<&BasicBlock> {
        self.blocks.get(block.index()).and_then(Option::as_ref)
    }

    /// Returns the block in slot `block` mutably, unless it was killed.
    pub fn block_mut(&mut self, block: BlockIndex) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(block.index()).and_then(Option::as_mut)
    }

    /// Iterates over the live blocks in slot order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter().flatten()
    }

    /// Iterates over the indices of the live blocks in slot order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockIndex> + '_ {
        self.blocks().map(BasicBlock::index)
    }

    /// Appends a block outside of any insertion batch.
    ///
    /// Used while constructing a graph; transformations use
    /// [`Graph::insert_block`].
    pub fn add_block(&mut self, execution_count: f64) -> BlockIndex {
        let index = BlockIndex::new(self.blocks.len());
        self.blocks.push(Some(BasicBlock::new(
            index,
            self.num_locals,
            execution_count,
        )));
        index
    }

    /// Appends a block as part of the pending insertion batch.
    ///
    /// The block is usable immediately; the batch is committed by
    /// [`Graph::execute_block_insertions`].
    pub fn insert_block(&mut self, execution_count: f64) -> BlockIndex {
        self.pending_insertions += 1;
        self.add_block(execution_count)
    }

    /// Commits the pending insertion batch.
    ///
    /// Returns `false` if nothing was pending. Otherwise the CFG analyses are
    /// invalidated, threaded local information is dropped, and `true` is
    /// returned.
    pub fn execute_block_insertions(&mut self) -> bool {
        if self.pending_insertions == 0 {
            return false;
        }
        self.pending_insertions = 0;
        self.invalidate_cfg();
        self.dethread();
        true
    }

    // ---------------------------------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------------------------------

    /// Returns the number of nodes ever created.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node at `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` was not created by this graph.
    #[must_use]
    pub fn node(&self, node: NodeIndex) -> &Node {
        &self.nodes[node.index()]
    }

    /// Returns the node at `node` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `node` was not created by this graph.
    pub fn node_mut(&mut self, node: NodeIndex) -> &mut Node {
        &mut self.nodes[node.index()]
    }

    /// Returns the node at `node`, or `None` if out of range.
    #[must_use]
    pub fn try_node(&self, node: NodeIndex) -> Option<&Node> {
        self.nodes.get(node.index())
    }

    /// Adds a node to the arena without placing it in a block.
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        self.nodes.push(node);
        NodeIndex::new(self.nodes.len() - 1)
    }

    /// Adds a node and appends it to `block`'s node list.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] if `block` is not a live block.
    pub fn append_node(&mut self, block: BlockIndex, node: Node) -> Result<NodeIndex> {
        if self.block(block).is_none() {
            return Err(graph_error!("cannot append to missing block {}", block));
        }
        let index = self.add_node(node);
        if let Some(target) = self.block_mut(block) {
            target.nodes.push(index);
        }
        Ok(index)
    }

    /// Adds a node and appends it to `block`'s phi list.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] if `block` is not a live block.
    pub fn append_phi(&mut self, block: BlockIndex, node: Node) -> Result<NodeIndex> {
        if self.block(block).is_none() {
            return Err(graph_error!("cannot add a phi to missing block {}", block));
        }
        let index = self.add_node(node);
        if let Some(target) = self.block_mut(block) {
            target.phis.push(index);
        }
        Ok(index)
    }

    /// Appends an edge to the shared variadic child list and returns its position.
    pub fn add_var_arg_child(&mut self, edge: Edge) -> usize {
        self.var_arg_children.push(edge);
        self.var_arg_children.len() - 1
    }

    /// Returns the variadic child list range `first..first + count`.
    #[must_use]
    pub fn var_arg_children(&self, first: usize, count: usize) -> &[Edge] {
        self.var_arg_children
            .get(first..first.saturating_add(count))
            .unwrap_or(&[])
    }

    /// Returns the number of entries in the shared variadic child list.
    #[must_use]
    pub fn var_arg_child_count(&self) -> usize {
        self.var_arg_children.len()
    }

    /// Iterates over the non-empty operand edges of `node`, inline or variadic.
    pub fn child_edges(&self, node: NodeIndex) -> impl Iterator<Item = Edge> + '_ {
        let (fixed, variadic): ([Edge; 3], &[Edge]) = match self.node(node).children {
            Children::Fixed(edges) => (edges, &[][..]),
            Children::VarArgs { first, count } => {
                ([Edge::EMPTY; 3], self.var_arg_children(first, count))
            }
        };
        fixed
            .into_iter()
            .chain(variadic.iter().copied())
            .filter(|edge| edge.is_set())
    }

    // ---------------------------------------------------------------------------------------------
    // Auxiliary records
    // ---------------------------------------------------------------------------------------------

    /// Allocates a fresh branch record.
    pub fn add_branch_data(&mut self, data: BranchData) -> AuxHandle<BranchData> {
        self.branch_data.add(data)
    }

    /// Returns a branch record.
    #[must_use]
    pub fn branch_data(&self, handle: AuxHandle<BranchData>) -> Option<&BranchData> {
        self.branch_data.get(handle)
    }

    /// Returns a branch record mutably.
    pub fn branch_data_mut(&mut self, handle: AuxHandle<BranchData>) -> Option<&mut BranchData> {
        self.branch_data.get_mut(handle)
    }

    /// Allocates a fresh switch record.
    pub fn add_switch_data(&mut self, data: SwitchData) -> AuxHandle<SwitchData> {
        self.switch_data.add(data)
    }

    /// Returns a switch record.
    #[must_use]
    pub fn switch_data(&self, handle: AuxHandle<SwitchData>) -> Option<&SwitchData> {
        self.switch_data.get(handle)
    }

    /// Returns a switch record mutably.
    pub fn switch_data_mut(&mut self, handle: AuxHandle<SwitchData>) -> Option<&mut SwitchData> {
        self.switch_data.get_mut(handle)
    }

    /// Allocates a fresh call-varargs record.
    pub fn add_call_varargs_data(&mut self, data: CallVarargsData) -> AuxHandle<CallVarargsData> {
        self.call_varargs_data.add(data)
    }

    /// Returns a call-varargs record.
    #[must_use]
    pub fn call_varargs_data(&self, handle: AuxHandle<CallVarargsData>) -> Option<&CallVarargsData> {
        self.call_varargs_data.get(handle)
    }

    /// Allocates a fresh load-varargs record.
    pub fn add_load_varargs_data(&mut self, data: LoadVarargsData) -> AuxHandle<LoadVarargsData> {
        self.load_varargs_data.add(data)
    }

    /// Returns a load-varargs record.
    #[must_use]
    pub fn load_varargs_data(&self, handle: AuxHandle<LoadVarargsData>) -> Option<&LoadVarargsData> {
        self.load_varargs_data.get(handle)
    }

    // ---------------------------------------------------------------------------------------------
    // Control flow
    // ---------------------------------------------------------------------------------------------

    /// Returns the terminal node of `block`, if its last node is one.
    #[must_use]
    pub fn terminal(&self, block: BlockIndex) -> Option<NodeIndex> {
        let last = self.block(block)?.last()?;
        self.try_node(last)
            .filter(|node| node.kind.is_terminal())
            .map(|_| last)
    }

    /// Returns the number of successor slots of `block`.
    #[must_use]
    pub fn successor_count(&self, block: BlockIndex) -> usize {
        let Some(terminal) = self.terminal(block) else {
            return 0;
        };
        match self.node(terminal).data {
            NodeData::Jump(_) => 1,
            NodeData::Branch(_) => 2,
            NodeData::Switch(handle) => self
                .switch_data(handle)
                .map_or(0, |data| data.cases.len() + 1),
            _ => 0,
        }
    }

    /// Returns successor slot `i` of `block`.
    ///
    /// Slot order is the jump target; or taken then not-taken; or the switch
    /// cases in table order followed by the fall-through.
    #[must_use]
    pub fn successor(&self, block: BlockIndex, i: usize) -> Option<BlockIndex> {
        let terminal = self.terminal(block)?;
        match self.node(terminal).data {
            NodeData::Jump(target) if i == 0 => Some(target),
            NodeData::Branch(handle) => {
                let data = self.branch_data(handle)?;
                match i {
                    0 => Some(data.taken.block),
                    1 => Some(data.not_taken.block),
                    _ => None,
                }
            }
            NodeData::Switch(handle) => {
                let data = self.switch_data(handle)?;
                if i < data.cases.len() {
                    Some(data.cases[i].target.block)
                } else if i == data.cases.len() {
                    Some(data.fall_through.block)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Iterates over the successors of `block`, in slot order.
    pub fn successors(&self, block: BlockIndex) -> impl Iterator<Item = BlockIndex> + '_ {
        (0..self.successor_count(block)).filter_map(move |i| self.successor(block, i))
    }

    /// Points successor slot `i` of `block` at `target`.
    ///
    /// Writes through the terminal's payload; the predecessor cache is not
    /// updated.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if `block` has no such slot.
    pub fn set_successor(&mut self, block: BlockIndex, i: usize, target: BlockIndex) -> Result<()> {
        let terminal = self
            .terminal(block)
            .ok_or_else(|| invariant_violation!("block {} has no terminal", block))?;
        let data = self.node(terminal).data;
        let slot = match data {
            NodeData::Jump(_) if i == 0 => {
                self.node_mut(terminal).data = NodeData::Jump(target);
                return Ok(());
            }
            NodeData::Branch(handle) => self.branch_data_mut(handle).and_then(|data| match i {
                0 => Some(&mut data.taken.block),
                1 => Some(&mut data.not_taken.block),
                _ => None,
            }),
            NodeData::Switch(handle) => self.switch_data_mut(handle).and_then(|data| {
                let case_count = data.cases.len();
                if i < case_count {
                    Some(&mut data.cases[i].target.block)
                } else if i == case_count {
                    Some(&mut data.fall_through.block)
                } else {
                    None
                }
            }),
            _ => None,
        };
        match slot {
            Some(slot) => {
                *slot = target;
                Ok(())
            }
            None => Err(invariant_violation!(
                "block {} has no successor slot {}",
                block,
                i
            )),
        }
    }

    /// Replaces the terminal of `block` with a `Jump` to `target`.
    ///
    /// The old terminal's condition operand is kept alive by a `Phantom` so
    /// that any checks it performed are not lost.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if `block` has no terminal.
    pub fn convert_to_jump(&mut self, block: BlockIndex, target: BlockIndex) -> Result<()> {
        let terminal = self
            .terminal(block)
            .ok_or_else(|| invariant_violation!("block {} has no terminal", block))?;
        let old = self.node(terminal).clone();
        if old.kind == NodeKind::Jump {
            self.node_mut(terminal).data = NodeData::Jump(target);
            return Ok(());
        }

        let mut jump = Node::new(NodeKind::Jump, old.origin);
        jump.data = NodeData::Jump(target);
        let jump = self.add_node(jump);

        let condition = old.child1();
        let phantom = condition.is_set().then(|| {
            let mut phantom = Node::new(NodeKind::Phantom, old.origin);
            phantom.children = Children::one(condition);
            self.add_node(phantom)
        });

        if let Some(target_block) = self.block_mut(block) {
            target_block.nodes.pop();
            target_block.nodes.extend(phantom);
            target_block.nodes.push(jump);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Analyses
    // ---------------------------------------------------------------------------------------------

    /// Returns the dominator tree, computing it if needed.
    pub fn dominators(&self) -> &DominatorTree {
        self.dominators
            .get_or_init(|| compute_dominators(self, self.entry()))
    }

    /// Returns the natural loops, computing them if needed.
    pub fn natural_loops(&self) -> &NaturalLoops {
        self.natural_loops
            .get_or_init(|| NaturalLoops::compute(self, self.dominators()))
    }

    /// Drops the cached dominators and natural loops.
    pub fn invalidate_cfg(&mut self) {
        self.dominators.take();
        self.natural_loops.take();
    }

    /// Recomputes reachability flags and predecessor lists from the entry.
    pub fn reset_reachability(&mut self) {
        for block in self.blocks.iter_mut().flatten() {
            block.flags.remove(BlockFlags::REACHABLE);
            block.predecessors.clear();
        }
        if self.block(self.entry()).is_none() {
            return;
        }

        let reachable: Vec<BlockIndex> = dfs(self, self.entry()).collect();
        for &block in &reachable {
            let successors: Vec<BlockIndex> = self.successors(block).collect();
            for succ in successors {
                if let Some(succ_block) = self.block_mut(succ) {
                    if !succ_block.predecessors.contains(&block) {
                        succ_block.predecessors.push(block);
                    }
                }
            }
            if let Some(target) = self.block_mut(block) {
                target.flags.insert(BlockFlags::REACHABLE);
            }
        }
    }

    /// Kills every block not marked reachable and returns their indices.
    ///
    /// Call [`Graph::reset_reachability`] first.
    pub fn kill_unreachable_blocks(&mut self) -> Vec<BlockIndex> {
        let mut killed = Vec::new();
        for slot in &mut self.blocks {
            if slot.as_ref().is_some_and(|block| !block.is_reachable()) {
                if let Some(block) = slot.take() {
                    killed.push(block.index);
                }
            }
        }
        if !killed.is_empty() {
            self.invalidate_cfg();
        }
        killed
    }

    /// Returns the predecessor cache of `block`.
    #[must_use]
    pub fn predecessors(&self, block: BlockIndex) -> &[BlockIndex] {
        match self.block(block) {
            Some(block) => block.predecessors(),
            None => &[],
        }
    }
}

impl GraphBase for Graph {
    fn node_count(&self) -> usize {
        self.blocks.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = BlockIndex> {
        self.block_ids()
    }
}

impl Successors for Graph {
    fn successors(&self, node: BlockIndex) -> impl Iterator<Item = BlockIndex> {
        Graph::successors(self, node)
    }
}

impl Predecessors for Graph {
    fn predecessors(&self, node: BlockIndex) -> impl Iterator<Item = BlockIndex> {
        Graph::predecessors(self, node).iter().copied()
    }
}

impl RootedGraph for Graph {
    fn entry(&self) -> BlockIndex {
        Graph::entry(self)
    }
}
