//! Ergonomic construction of graphs.
//!
//! [`GraphBuilder`] appends nodes to a *current* block and assigns each node a
//! fresh bytecode origin. Mistakes such as appending before any block exists
//! are remembered and reported once by [`GraphBuilder::finish`], which also
//! validates the graph and threads locals through it.
//!
//! # Examples
//!
//! ```rust
//! use dfg_unroll::ir::{Edge, GraphBuilder, NodeKind, Operand};
//!
//! // i = 0; do { i = i + 1 } while (i < 4); return i
//! let mut b = GraphBuilder::new(1);
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
//! let read = b.get_local(i);
//! let one = b.int32(1);
//! let next = b.binary(NodeKind::ArithAdd, Edge::int32(read), Edge::int32(one));
//! b.set_local(i, Edge::int32(next));
//! let four = b.int32(4);
//! let cond = b.binary(NodeKind::CompareLess, Edge::int32(next), Edge::int32(four));
//! b.branch(Edge::untyped(cond), header, exit);
//!
//! b.switch_to(exit);
//! let result = b.get_local(i);
//! b.ret(Some(Edge::untyped(result)));
//!
//! let graph = b.finish()?;
//! assert_eq!(graph.natural_loops().loop_count(), 1);
//! # Ok::<(), dfg_unroll::Error>(())
//! ```

use crate::{
    ir::{
        validate, BlockFlags, BranchData, BranchTarget, CallVarargsData, Children, CodeOrigin,
        Constant, Edge, Graph, LoadVarargsData, Node, NodeData, NodeIndex, NodeKind, Operand,
        SpeculatedType, SwitchCase, SwitchData,
    },
    utils::{graph::BlockIndex, FunctionHash},
    Error, Result,
};

/// Incremental graph construction with deferred error reporting.
#[derive(Debug)]
pub struct GraphBuilder {
    graph: Graph,
    current: Option<BlockIndex>,
    next_origin: u32,
    error: Option<Error>,
}

impl GraphBuilder {
    /// Starts a graph for a function with `num_locals` local slots.
    #[must_use]
    pub fn new(num_locals: usize) -> Self {
        GraphBuilder {
            graph: Graph::new(num_locals),
            current: None,
            next_origin: 0,
            error: None,
        }
    }

    /// Sets the function name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.graph.set_name(name);
        self
    }

    /// Sets the function identity.
    #[must_use]
    pub fn function(mut self, function: FunctionHash) -> Self {
        self.graph.set_function(Some(function));
        self
    }

    /// Adds an ordinary block. The first block added is the entry.
    pub fn block(&mut self) -> BlockIndex {
        self.graph.add_block(1.0)
    }

    /// Adds a block with a profiled execution count.
    pub fn block_with_count(&mut self, execution_count: f64) -> BlockIndex {
        self.graph.add_block(execution_count)
    }

    /// Adds a critical-edge pad that jumps to `target`.
    pub fn edge_pad(&mut self, target: BlockIndex) -> BlockIndex {
        let pad = self.graph.add_block(1.0);
        if let Some(block) = self.graph.block_mut(pad) {
            block.flags.insert(BlockFlags::SYNTHETIC_EDGE_PAD);
        }
        let previous = self.current.replace(pad);
        self.jump(target);
        self.current = previous;
        pad
    }

    /// Makes `block` the target of subsequent node appends.
    pub fn switch_to(&mut self, block: BlockIndex) {
        if self.graph.block(block).is_none() {
            self.fail(graph_error!("switch_to unknown block {}", block));
        }
        self.current = Some(block);
    }

    /// Returns the block currently appended to.
    #[must_use]
    pub fn current(&self) -> Option<BlockIndex> {
        self.current
    }

    /// Returns the graph under construction.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn origin(&mut self) -> CodeOrigin {
        let origin = CodeOrigin::new(self.next_origin);
        self.next_origin += 1;
        origin
    }

    /// Appends a fully specified node to the current block.
    pub fn node(&mut self, kind: NodeKind, children: Children, data: NodeData) -> NodeIndex {
        let mut node = Node::new(kind, self.origin());
        node.children = children;
        node.data = data;
        node.prediction = default_prediction(kind, data);

        let Some(block) = self.current else {
            self.fail(graph_error!("{} appended before any block was selected", kind));
            return self.graph.add_node(node);
        };
        match self.graph.append_node(block, node.clone()) {
            Ok(index) => index,
            Err(error) => {
                self.fail(error);
                self.graph.add_node(node)
            }
        }
    }

    /// Appends a node whose operands go to the variadic child list.
    pub fn var_args(&mut self, kind: NodeKind, children: &[Edge]) -> NodeIndex {
        let first = self.graph.var_arg_child_count();
        for &edge in children {
            self.graph.add_var_arg_child(edge);
        }
        self.node(
            kind,
            Children::VarArgs {
                first,
                count: children.len(),
            },
            NodeData::None,
        )
    }

    /// Appends a constant.
    pub fn constant(&mut self, value: Constant) -> NodeIndex {
        self.node(NodeKind::JSConstant, Children::NONE, NodeData::Constant(value))
    }

    /// Appends an int32 constant.
    pub fn int32(&mut self, value: i32) -> NodeIndex {
        self.constant(Constant::Int32(value))
    }

    /// Appends a read of `operand`.
    pub fn get_local(&mut self, operand: Operand) -> NodeIndex {
        self.node(NodeKind::GetLocal, Children::NONE, NodeData::Local(operand))
    }

    /// Appends a write of `value` to `operand`.
    pub fn set_local(&mut self, operand: Operand, value: Edge) -> NodeIndex {
        self.node(
            NodeKind::SetLocal,
            Children::one(value),
            NodeData::Local(operand),
        )
    }

    /// Appends a one-operand node.
    pub fn unary(&mut self, kind: NodeKind, child: Edge) -> NodeIndex {
        self.node(kind, Children::one(child), NodeData::None)
    }

    /// Appends a two-operand node.
    pub fn binary(&mut self, kind: NodeKind, left: Edge, right: Edge) -> NodeIndex {
        self.node(kind, Children::two(left, right), NodeData::None)
    }

    /// Appends an array element load `base[index]`.
    pub fn get_by_val(&mut self, base: Edge, index: Edge) -> NodeIndex {
        self.binary(NodeKind::GetByVal, base, index)
    }

    /// Appends an array element store `base[index] = value`.
    pub fn put_by_val(&mut self, base: Edge, index: Edge, value: Edge) -> NodeIndex {
        self.node(
            NodeKind::PutByVal,
            Children::three(base, index, value),
            NodeData::None,
        )
    }

    /// Appends a varargs call `callee.apply(this, arguments)`.
    pub fn call_varargs(&mut self, callee: Edge, this: Edge, arguments: Edge) -> NodeIndex {
        let data = self.graph.add_call_varargs_data(CallVarargsData {
            first_vararg_offset: 0,
        });
        self.node(
            NodeKind::CallVarargs,
            Children::three(callee, this, arguments),
            NodeData::CallVarargs(data),
        )
    }

    /// Appends a varargs load or length computation.
    pub fn load_varargs(
        &mut self,
        kind: NodeKind,
        arguments: Edge,
        data: LoadVarargsData,
    ) -> NodeIndex {
        let data = self.graph.add_load_varargs_data(data);
        self.node(kind, Children::one(arguments), NodeData::LoadVarargs(data))
    }

    /// Terminates the current block with a jump.
    pub fn jump(&mut self, target: BlockIndex) -> NodeIndex {
        self.node(NodeKind::Jump, Children::NONE, NodeData::Jump(target))
    }

    /// Terminates the current block with a two-way branch.
    pub fn branch(&mut self, condition: Edge, taken: BlockIndex, not_taken: BlockIndex) -> NodeIndex {
        let data = self.graph.add_branch_data(BranchData::new(taken, not_taken));
        self.node(
            NodeKind::Branch,
            Children::one(condition),
            NodeData::Branch(data),
        )
    }

    /// Terminates the current block with an int32 switch.
    pub fn switch(
        &mut self,
        scrutinee: Edge,
        cases: &[(i32, BlockIndex)],
        fall_through: BlockIndex,
    ) -> NodeIndex {
        let data = self.graph.add_switch_data(SwitchData {
            cases: cases
                .iter()
                .map(|&(value, block)| SwitchCase {
                    value,
                    target: BranchTarget::new(block),
                })
                .collect(),
            fall_through: BranchTarget::new(fall_through),
        });
        self.node(
            NodeKind::Switch,
            Children::one(scrutinee),
            NodeData::Switch(data),
        )
    }

    /// Terminates the current block with a return.
    pub fn ret(&mut self, value: Option<Edge>) -> NodeIndex {
        self.node(
            NodeKind::Return,
            Children::one(value.unwrap_or(Edge::EMPTY)),
            NodeData::None,
        )
    }

    /// Finishes construction.
    ///
    /// Validates the graph, computes reachability and predecessors, and
    /// threads locals through the blocks.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building, or the first
    /// structural problem found by [`validate`].
    pub fn finish(mut self) -> Result<Graph> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        validate(&self.graph)?;
        self.graph.thread_locals();
        Ok(self.graph)
    }
}

fn default_prediction(kind: NodeKind, data: NodeData) -> SpeculatedType {
    match (kind, data) {
        (NodeKind::JSConstant, NodeData::Constant(Constant::Int32(_))) => SpeculatedType::INT32,
        (NodeKind::JSConstant, NodeData::Constant(Constant::Double(_)))
        | (NodeKind::DoubleConstant | NodeKind::DoubleRep, _) => SpeculatedType::DOUBLE,
        (NodeKind::JSConstant, NodeData::Constant(Constant::Boolean(_))) => SpeculatedType::BOOLEAN,
        (
            NodeKind::ArithAdd
            | NodeKind::ArithSub
            | NodeKind::ArithMul
            | NodeKind::ArithDiv
            | NodeKind::ArithMod
            | NodeKind::ArithNegate
            | NodeKind::BitAnd
            | NodeKind::BitOr
            | NodeKind::BitXor
            | NodeKind::BitLShift
            | NodeKind::BitRShift
            | NodeKind::BitURShift
            | NodeKind::ValueToInt32
            | NodeKind::GetArrayLength,
            _,
        ) => SpeculatedType::INT32,
        (
            NodeKind::CompareLess
            | NodeKind::CompareLessEq
            | NodeKind::CompareGreater
            | NodeKind::CompareGreaterEq
            | NodeKind::CompareEq
            | NodeKind::CompareStrictEq
            | NodeKind::LogicalNot,
            _,
        ) => SpeculatedType::BOOLEAN,
        (NodeKind::NewArray, _) => SpeculatedType::ARRAY,
        (NodeKind::MakeRope | NodeKind::StrCat | NodeKind::ToString, _) => SpeculatedType::STRING,
        _ => SpeculatedType::empty(),
    }
}
