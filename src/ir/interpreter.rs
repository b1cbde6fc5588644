//! A reference evaluator for graphs.
//!
//! The interpreter executes a graph block by block over a small value domain
//! (int32, booleans, arrays) and records every array access in order. Two
//! graphs that produce the same [`Execution`] for the same inputs are
//! observably equivalent, which is how loop transformations are checked.
//!
//! Phis and hint nodes are no-ops: locals live in slots that `GetLocal` and
//! `SetLocal` read and write directly, so both threaded and load/store graphs
//! evaluate the same way. Node values are scoped to the executing block.
//!
//! # Examples
//!
//! ```rust,ignore
//! use dfg_unroll::ir::{Interpreter, Operand, Value};
//!
//! let mut interpreter = Interpreter::new(&graph);
//! let array = interpreter.add_array(vec![Value::Int32(0); 4]);
//! interpreter.set_local(Operand(1), array);
//! let execution = interpreter.run()?;
//! println!("returned {} after {} steps", execution.return_value, execution.steps);
//! ```

use std::{collections::HashMap, fmt};

use crate::{
    ir::{Constant, Graph, NodeData, NodeIndex, NodeKind, Operand},
    utils::graph::BlockIndex,
    Result,
};

/// Default number of nodes evaluated before execution is abandoned.
pub const DEFAULT_STEP_BUDGET: usize = 1_000_000;

/// A runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Value {
    /// The undefined value; also the initial value of every local.
    #[default]
    Undefined,
    /// A 32-bit integer.
    Int32(i32),
    /// A boolean.
    Boolean(bool),
    /// A reference to an interpreter-owned array.
    Array(usize),
}

impl Value {
    /// Returns the JavaScript truthiness of the value.
    #[must_use]
    pub fn is_truthy(self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Int32(value) => value != 0,
            Value::Boolean(value) => value,
            Value::Array(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Int32(value) => write!(f, "{value}"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Array(id) => write!(f, "array#{id}"),
        }
    }
}

/// Whether a memory event read or wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAccess {
    /// An array element load.
    Load,
    /// An array element store.
    Store,
}

/// One observable array access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryEvent {
    /// Load or store.
    pub access: MemoryAccess,
    /// The array accessed.
    pub array: usize,
    /// The element index.
    pub index: i32,
    /// The value read or written.
    pub value: Value,
}

/// The observable outcome of running a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// The value returned by the function.
    pub return_value: Value,
    /// Array accesses in program order.
    pub trace: Vec<MemoryEvent>,
    /// Final contents of every array.
    pub arrays: Vec<Vec<Value>>,
    /// Number of nodes evaluated.
    pub steps: usize,
}

/// Executes a graph against preset locals and arrays.
#[derive(Debug)]
pub struct Interpreter<'g> {
    graph: &'g Graph,
    locals: Vec<Value>,
    arrays: Vec<Vec<Value>>,
    step_budget: usize,
}

impl<'g> Interpreter<'g> {
    /// Creates an interpreter with every local undefined.
    #[must_use]
    pub fn new(graph: &'g Graph) -> Self {
        Interpreter {
            graph,
            locals: vec![Value::Undefined; graph.num_locals()],
            arrays: Vec::new(),
            step_budget: DEFAULT_STEP_BUDGET,
        }
    }

    /// Limits the number of nodes evaluated.
    #[must_use]
    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget;
        self
    }

    /// Presets a local, typically a function argument.
    pub fn set_local(&mut self, operand: Operand, value: Value) {
        if operand.index() >= self.locals.len() {
            self.locals.resize(operand.index() + 1, Value::Undefined);
        }
        self.locals[operand.index()] = value;
    }

    /// Allocates an array and returns a reference to it.
    pub fn add_array(&mut self, elements: Vec<Value>) -> Value {
        self.arrays.push(elements);
        Value::Array(self.arrays.len() - 1)
    }

    /// Runs the graph from its entry block until it returns.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] if execution reaches an
    /// unsupported node, overflows int32 arithmetic, throws, uses a value of
    /// the wrong type, or exceeds the step budget.
    pub fn run(mut self) -> Result<Execution> {
        let mut trace = Vec::new();
        let mut steps = 0usize;
        let mut values: HashMap<NodeIndex, Value> = HashMap::new();
        let graph = self.graph;
        let mut block = graph.entry();

        loop {
            let nodes = graph
                .block(block)
                .ok_or_else(|| graph_error!("control reached dead block {}", block))?
                .nodes();
            values.clear();

            let mut next = None;
            for &node in nodes {
                steps += 1;
                if steps > self.step_budget {
                    return Err(graph_error!("step budget of {} exhausted", self.step_budget));
                }
                match self.step(block, node, &values, &mut trace)? {
                    Step::Value(value) => {
                        values.insert(node, value);
                    }
                    Step::Continue => {}
                    Step::Goto(target) => next = Some(target),
                    Step::Return(return_value) => {
                        return Ok(Execution {
                            return_value,
                            trace,
                            arrays: self.arrays,
                            steps,
                        })
                    }
                }
            }
            block = next.ok_or_else(|| graph_error!("block {} fell through", block))?;
        }
    }

    fn step(
        &mut self,
        block: BlockIndex,
        node: NodeIndex,
        values: &HashMap<NodeIndex, Value>,
        trace: &mut Vec<MemoryEvent>,
    ) -> Result<Step> {
        let graph = self.graph;
        let n = graph.node(node);
        let operand = |i: usize| -> Result<Value> {
            let child = n.child(i).node().ok_or_else(|| graph_error!("{} lacks operand {}", node, i))?;
            values
                .get(&child)
                .copied()
                .ok_or_else(|| graph_error!("{} has no value when used by {}", child, node))
        };
        let int = |i: usize| -> Result<i32> {
            match operand(i)? {
                Value::Int32(value) => Ok(value),
                Value::Boolean(value) => Ok(i32::from(value)),
                other => Err(graph_error!("{} expected int32, got {}", node, other)),
            }
        };
        let overflow = || graph_error!("int32 overflow at {}", node);

        let value = match n.kind {
            NodeKind::JSConstant => match n.constant() {
                Some(Constant::Int32(value)) => Value::Int32(value),
                Some(Constant::Boolean(value)) => Value::Boolean(value),
                Some(Constant::Undefined | Constant::Null) | None => Value::Undefined,
                Some(Constant::Double(_)) => {
                    return Err(graph_error!("{}: doubles are not supported", node))
                }
            },
            NodeKind::GetLocal => {
                let local = n.operand().ok_or_else(|| graph_error!("{} has no local", node))?;
                self.locals.get(local.index()).copied().unwrap_or_default()
            }
            NodeKind::SetLocal => {
                let local = n.operand().ok_or_else(|| graph_error!("{} has no local", node))?;
                let value = operand(0)?;
                self.set_local(local, value);
                return Ok(Step::Continue);
            }
            NodeKind::ArithAdd | NodeKind::ValueAdd => {
                Value::Int32(int(0)?.checked_add(int(1)?).ok_or_else(overflow)?)
            }
            NodeKind::ArithSub => Value::Int32(int(0)?.checked_sub(int(1)?).ok_or_else(overflow)?),
            NodeKind::ArithMul => Value::Int32(int(0)?.checked_mul(int(1)?).ok_or_else(overflow)?),
            NodeKind::ArithDiv => Value::Int32(int(0)?.checked_div(int(1)?).ok_or_else(overflow)?),
            NodeKind::ArithMod => Value::Int32(int(0)?.checked_rem(int(1)?).ok_or_else(overflow)?),
            NodeKind::ArithNegate => Value::Int32(int(0)?.checked_neg().ok_or_else(overflow)?),
            NodeKind::BitAnd => Value::Int32(int(0)? & int(1)?),
            NodeKind::BitOr => Value::Int32(int(0)? | int(1)?),
            NodeKind::BitXor => Value::Int32(int(0)? ^ int(1)?),
            NodeKind::BitLShift => Value::Int32(int(0)?.wrapping_shl(shift(int(1)?))),
            NodeKind::BitRShift => Value::Int32(int(0)?.wrapping_shr(shift(int(1)?))),
            NodeKind::BitURShift => {
                #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
                let shifted = (int(0)? as u32).wrapping_shr(shift(int(1)?)) as i32;
                Value::Int32(shifted)
            }
            NodeKind::ValueToInt32 => Value::Int32(int(0)?),
            NodeKind::CompareLess => Value::Boolean(int(0)? < int(1)?),
            NodeKind::CompareLessEq => Value::Boolean(int(0)? <= int(1)?),
            NodeKind::CompareGreater => Value::Boolean(int(0)? > int(1)?),
            NodeKind::CompareGreaterEq => Value::Boolean(int(0)? >= int(1)?),
            NodeKind::CompareEq | NodeKind::CompareStrictEq => {
                Value::Boolean(operand(0)? == operand(1)?)
            }
            NodeKind::LogicalNot => Value::Boolean(!operand(0)?.is_truthy()),
            NodeKind::NewArray => {
                let elements = graph
                    .child_edges(node)
                    .map(|edge| {
                        edge.node()
                            .and_then(|child| values.get(&child).copied())
                            .ok_or_else(|| graph_error!("{} has an operand without value", node))
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.add_array(elements)
            }
            NodeKind::GetArrayLength => {
                let array = self.array(node, operand(0)?)?;
                Value::Int32(i32::try_from(self.arrays[array].len()).map_err(|_| overflow())?)
            }
            NodeKind::GetByVal => {
                let array = self.array(node, operand(0)?)?;
                let index = int(1)?;
                let value = usize::try_from(index)
                    .ok()
                    .and_then(|i| self.arrays[array].get(i).copied())
                    .unwrap_or_default();
                trace.push(MemoryEvent {
                    access: MemoryAccess::Load,
                    array,
                    index,
                    value,
                });
                value
            }
            NodeKind::PutByVal | NodeKind::PutByValDirect => {
                let array = self.array(node, operand(0)?)?;
                let index = int(1)?;
                let value = operand(2)?;
                let slot = usize::try_from(index)
                    .map_err(|_| graph_error!("{} stores to negative index {}", node, index))?;
                let elements = &mut self.arrays[array];
                if slot >= elements.len() {
                    elements.resize(slot + 1, Value::Undefined);
                }
                elements[slot] = value;
                trace.push(MemoryEvent {
                    access: MemoryAccess::Store,
                    array,
                    index,
                    value,
                });
                return Ok(Step::Continue);
            }
            NodeKind::Jump => match n.data {
                NodeData::Jump(target) => return Ok(Step::Goto(target)),
                _ => return Err(graph_error!("{} has no target", node)),
            },
            NodeKind::Branch => {
                let taken = operand(0)?.is_truthy();
                let slot = usize::from(!taken);
                let target = graph
                    .successor(block, slot)
                    .ok_or_else(|| graph_error!("{} has no successor {}", node, slot))?;
                return Ok(Step::Goto(target));
            }
            NodeKind::Switch => {
                let scrutinee = int(0)?;
                let NodeData::Switch(handle) = n.data else {
                    return Err(graph_error!("{} has no switch table", node));
                };
                let table = graph
                    .switch_data(handle)
                    .ok_or_else(|| graph_error!("{} has a dangling switch table", node))?;
                let target = table
                    .cases
                    .iter()
                    .find(|case| case.value == scrutinee)
                    .map_or(table.fall_through.block, |case| case.target.block);
                return Ok(Step::Goto(target));
            }
            NodeKind::Return => {
                let value = if n.child1().is_set() {
                    operand(0)?
                } else {
                    Value::Undefined
                };
                return Ok(Step::Return(value));
            }
            NodeKind::Throw => return Err(graph_error!("{} threw", node)),
            NodeKind::Unreachable => return Err(graph_error!("{} is unreachable", node)),
            kind if kind.is_bookkeeping() || kind.is_zero_cost() || kind == NodeKind::Check => {
                return Ok(Step::Continue)
            }
            kind => return Err(graph_error!("{} ({}) cannot be interpreted", node, kind)),
        };
        Ok(Step::Value(value))
    }

    fn array(&self, node: NodeIndex, value: Value) -> Result<usize> {
        match value {
            Value::Array(id) if id < self.arrays.len() => Ok(id),
            other => Err(graph_error!("{} expected an array, got {}", node, other)),
        }
    }
}

enum Step {
    Value(Value),
    Continue,
    Goto(BlockIndex),
    Return(Value),
}

#[allow(clippy::cast_sign_loss)]
fn shift(amount: i32) -> u32 {
    (amount & 31) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{Edge, GraphBuilder},
        test::{array_loop, counted_loop},
        Error,
    };

    #[test]
    fn test_counted_loop_returns_final_counter() {
        let fixture = counted_loop(0, 4, 1);
        let execution = Interpreter::new(&fixture.graph).run().unwrap();
        assert_eq!(execution.return_value, Value::Int32(4));
        assert!(execution.trace.is_empty());
    }

    #[test]
    fn test_array_loop_trace() {
        let fixture = array_loop(4);
        let mut interpreter = Interpreter::new(&fixture.graph);
        let array = interpreter.add_array(vec![Value::Int32(0); 4]);
        interpreter.set_local(fixture.array, array);
        let execution = interpreter.run().unwrap();

        // b = 0 + 0 + 2 + 4 + 6
        assert_eq!(execution.return_value, Value::Int32(12));
        assert_eq!(execution.trace.len(), 8);
        assert_eq!(
            execution.trace[2],
            MemoryEvent {
                access: MemoryAccess::Store,
                array: 0,
                index: 1,
                value: Value::Int32(2),
            }
        );
        assert_eq!(
            execution.arrays[0],
            vec![Value::Int32(0), Value::Int32(2), Value::Int32(4), Value::Int32(6)]
        );
    }

    #[test]
    fn test_step_budget() {
        let fixture = counted_loop(0, 1000, 1);
        let result = Interpreter::new(&fixture.graph).with_step_budget(50).run();
        assert!(matches!(result, Err(Error::GraphError(_))));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut b = GraphBuilder::new(0);
        let entry = b.block();
        b.switch_to(entry);
        let max = b.int32(i32::MAX);
        let one = b.int32(1);
        let sum = b.binary(NodeKind::ArithAdd, Edge::int32(max), Edge::int32(one));
        b.ret(Some(Edge::untyped(sum)));
        let graph = b.finish().unwrap();

        assert!(Interpreter::new(&graph).run().is_err());
    }

    #[test]
    fn test_switch_and_truthiness() {
        let mut b = GraphBuilder::new(0);
        let entry = b.block();
        let one = b.block();
        let other = b.block();
        b.switch_to(entry);
        let x = b.int32(1);
        b.switch(Edge::int32(x), &[(0, other), (1, one)], other);
        b.switch_to(one);
        let t = b.int32(7);
        let not = b.unary(NodeKind::LogicalNot, Edge::untyped(t));
        b.ret(Some(Edge::untyped(not)));
        b.switch_to(other);
        b.ret(None);
        let graph = b.finish().unwrap();

        let execution = Interpreter::new(&graph).run().unwrap();
        assert_eq!(execution.return_value, Value::Boolean(false));
    }
}
