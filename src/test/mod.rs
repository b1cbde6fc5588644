//! Graph factories shared by the unit tests.
//!
//! Every factory builds its graph through [`GraphBuilder`], so the results
//! are validated and threaded exactly like graphs handed to the compiler.

use crate::{
    ir::{Children, Edge, Graph, GraphBuilder, NodeData, NodeIndex, NodeKind, Operand},
    utils::graph::BlockIndex,
};

/// A single-block loop `i = init; do { i += step } while (i < bound); return i`.
pub struct CountedLoop {
    pub graph: Graph,
    pub entry: BlockIndex,
    pub header: BlockIndex,
    pub exit: BlockIndex,
}

/// A loop that stores to and loads from an array held in a local.
pub struct ArrayLoop {
    pub graph: Graph,
    pub entry: BlockIndex,
    pub header: BlockIndex,
    pub exit: BlockIndex,
    pub array: Operand,
}

/// A loop whose bound is read from a local set by the caller.
pub struct RuntimeBoundLoop {
    pub graph: Graph,
    pub entry: BlockIndex,
    pub header: BlockIndex,
    pub exit: BlockIndex,
    pub bound: Operand,
}

/// A loop whose header branches into a diamond before the tail.
pub struct DiamondLoop {
    pub graph: Graph,
    pub entry: BlockIndex,
    pub header: BlockIndex,
    pub tail: BlockIndex,
    pub exit: BlockIndex,
}

/// Blocks of a loop nest `outer { inner }`.
pub struct NestedLoops {
    pub graph: Graph,
    pub outer_header: BlockIndex,
    pub inner_header: BlockIndex,
}

const I: Operand = Operand(0);

// Helper function to append `local = local <kind> step` and return the update
fn update_local(b: &mut GraphBuilder, local: Operand, kind: NodeKind, step: i32) -> NodeIndex {
    let current = b.get_local(local);
    let step = b.int32(step);
    let update = b.binary(kind, Edge::int32(current), Edge::int32(step));
    b.set_local(local, Edge::int32(update));
    update
}

// Helper function to append `local = value`
fn store_constant(b: &mut GraphBuilder, local: Operand, value: i32) {
    let constant = b.int32(value);
    b.set_local(local, Edge::int32(constant));
}

// Helper function to end a block with `if (update < bound) goto taken else not_taken`
fn branch_less(
    b: &mut GraphBuilder,
    update: NodeIndex,
    bound: i32,
    taken: BlockIndex,
    not_taken: BlockIndex,
) {
    let bound = b.int32(bound);
    let compare = b.binary(NodeKind::CompareLess, Edge::int32(update), Edge::int32(bound));
    b.branch(Edge::untyped(compare), taken, not_taken);
}

// Helper function to end a block with `return local`
fn return_local(b: &mut GraphBuilder, local: Operand) {
    let value = b.get_local(local);
    b.ret(Some(Edge::untyped(value)));
}

// Helper function to create the canonical counted loop
pub fn counted_loop(init: i32, bound: i32, step: i32) -> CountedLoop {
    let mut b = GraphBuilder::new(1).name("counted_loop");
    let entry = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, init);
    b.jump(header);

    b.switch_to(header);
    let update = update_local(&mut b, I, NodeKind::ArithAdd, step);
    branch_less(&mut b, update, bound, header, exit);

    b.switch_to(exit);
    return_local(&mut b, I);

    CountedLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
    }
}

// Helper function to create `for (i = 0; i < n; i++) { a[i] = i * 2; b += a[i] } return b`
pub fn array_loop(n: i32) -> ArrayLoop {
    let array = Operand(1);
    let sum = Operand(2);
    let mut b = GraphBuilder::new(3).name("array_loop");
    let entry = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    store_constant(&mut b, sum, 0);
    b.jump(header);

    b.switch_to(header);
    let i = b.get_local(I);
    let base = b.get_local(array);
    let two = b.int32(2);
    let doubled = b.binary(NodeKind::ArithMul, Edge::int32(i), Edge::int32(two));
    b.put_by_val(Edge::untyped(base), Edge::int32(i), Edge::int32(doubled));
    let loaded = b.get_by_val(Edge::untyped(base), Edge::int32(i));
    let total = b.get_local(sum);
    let added = b.binary(NodeKind::ArithAdd, Edge::int32(total), Edge::int32(loaded));
    b.set_local(sum, Edge::int32(added));
    let one = b.int32(1);
    let update = b.binary(NodeKind::ArithAdd, Edge::int32(i), Edge::int32(one));
    b.set_local(I, Edge::int32(update));
    branch_less(&mut b, update, n, header, exit);

    b.switch_to(exit);
    return_local(&mut b, sum);

    ArrayLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
        array,
    }
}

// Helper function to create a loop entered and closed through edge pads,
// written as `do { i += 1 } while (!(i >= 4))`
pub fn padded_loop() -> CountedLoop {
    let mut b = GraphBuilder::new(1).name("padded_loop");
    let entry = b.block();
    let header = b.block();
    let exit = b.block();
    let enter_pad = b.edge_pad(header);
    let back_pad = b.edge_pad(header);

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    b.jump(enter_pad);

    b.switch_to(header);
    let update = update_local(&mut b, I, NodeKind::ArithAdd, 1);
    let four = b.int32(4);
    let done = b.binary(NodeKind::CompareGreaterEq, Edge::int32(update), Edge::int32(four));
    b.branch(Edge::untyped(done), exit, back_pad);

    b.switch_to(exit);
    return_local(&mut b, I);

    CountedLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
    }
}

// Helper function to create a loop closed by two latches
pub fn two_back_edge_loop() -> CountedLoop {
    let mut b = GraphBuilder::new(1).name("two_back_edge_loop");
    let entry = b.block();
    let header = b.block();
    let body = b.block();
    let left = b.block();
    let right = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    b.jump(header);

    b.switch_to(header);
    let update = update_local(&mut b, I, NodeKind::ArithAdd, 1);
    branch_less(&mut b, update, 4, body, exit);

    b.switch_to(body);
    let i = b.get_local(I);
    b.branch(Edge::untyped(i), left, right);

    b.switch_to(left);
    b.jump(header);
    b.switch_to(right);
    b.jump(header);

    b.switch_to(exit);
    return_local(&mut b, I);

    CountedLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
    }
}

// Helper function to create `i = 0; do { i += 1 } while (i < n); return i`
pub fn runtime_bound_loop() -> RuntimeBoundLoop {
    let bound = Operand(1);
    let mut b = GraphBuilder::new(2).name("runtime_bound_loop");
    let entry = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    b.jump(header);

    b.switch_to(header);
    let update = update_local(&mut b, I, NodeKind::ArithAdd, 1);
    let n = b.get_local(bound);
    let compare = b.binary(NodeKind::CompareLess, Edge::int32(update), Edge::int32(n));
    b.branch(Edge::untyped(compare), header, exit);

    b.switch_to(exit);
    return_local(&mut b, I);

    RuntimeBoundLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
        bound,
    }
}

// Helper function to create a counted loop whose variable is stored twice before entry
pub fn twice_initialized_loop() -> CountedLoop {
    let mut b = GraphBuilder::new(1).name("twice_initialized_loop");
    let entry = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    store_constant(&mut b, I, 1);
    b.jump(header);

    b.switch_to(header);
    let update = update_local(&mut b, I, NodeKind::ArithAdd, 1);
    branch_less(&mut b, update, 4, header, exit);

    b.switch_to(exit);
    return_local(&mut b, I);

    CountedLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
    }
}

// Helper function to create a two-iteration loop with exactly `material`
// code-generating nodes, mostly `t = t ^ t` on a second local
pub fn numeric_loop(material: usize) -> CountedLoop {
    const OVERHEAD: usize = 7;
    let t = Operand(1);
    let mut b = GraphBuilder::new(2).name("numeric_loop");
    let entry = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    store_constant(&mut b, t, 1);
    b.jump(header);

    b.switch_to(header);
    let body = material.saturating_sub(OVERHEAD);
    for _ in 0..body / 3 {
        let value = b.get_local(t);
        let mixed = b.binary(NodeKind::BitXor, Edge::int32(value), Edge::int32(value));
        b.set_local(t, Edge::int32(mixed));
    }
    for _ in 0..body % 3 {
        b.get_local(t);
    }
    let update = update_local(&mut b, I, NodeKind::ArithAdd, 1);
    branch_less(&mut b, update, 2, header, exit);

    b.switch_to(exit);
    return_local(&mut b, t);

    CountedLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
    }
}

// Helper function to create a loop that fills an array without reading it
pub fn store_only_loop() -> ArrayLoop {
    let array = Operand(1);
    let mut b = GraphBuilder::new(2).name("store_only_loop");
    let entry = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    b.jump(header);

    b.switch_to(header);
    let i = b.get_local(I);
    let base = b.get_local(array);
    b.put_by_val(Edge::untyped(base), Edge::int32(i), Edge::int32(i));
    let one = b.int32(1);
    let update = b.binary(NodeKind::ArithAdd, Edge::int32(i), Edge::int32(one));
    b.set_local(I, Edge::int32(update));
    branch_less(&mut b, update, 4, header, exit);

    b.switch_to(exit);
    return_local(&mut b, I);

    ArrayLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
        array,
    }
}

// Helper function to create a counted loop that allocates a closure each iteration
pub fn uncloneable_loop() -> CountedLoop {
    let mut b = GraphBuilder::new(1).name("uncloneable_loop");
    let entry = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    b.jump(header);

    b.switch_to(header);
    b.node(NodeKind::CreateClosure, Children::NONE, NodeData::None);
    let update = update_local(&mut b, I, NodeKind::ArithAdd, 1);
    branch_less(&mut b, update, 4, header, exit);

    b.switch_to(exit);
    return_local(&mut b, I);

    CountedLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
    }
}

// Helper function to create a counted loop that concatenates strings each iteration
pub fn denylisted_loop() -> CountedLoop {
    let mut b = GraphBuilder::new(1).name("denylisted_loop");
    let entry = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    b.jump(header);

    b.switch_to(header);
    b.node(NodeKind::StrCat, Children::NONE, NodeData::None);
    let update = update_local(&mut b, I, NodeKind::ArithAdd, 1);
    branch_less(&mut b, update, 4, header, exit);

    b.switch_to(exit);
    return_local(&mut b, I);

    CountedLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
    }
}

// Helper function to create a counted loop entered from both arms of a branch
pub fn two_entry_loop() -> CountedLoop {
    let mut b = GraphBuilder::new(1).name("two_entry_loop");
    let entry = b.block();
    let left = b.block();
    let right = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    let i = b.get_local(I);
    b.branch(Edge::untyped(i), left, right);

    b.switch_to(left);
    b.jump(header);
    b.switch_to(right);
    b.jump(header);

    b.switch_to(header);
    let update = update_local(&mut b, I, NodeKind::ArithAdd, 1);
    branch_less(&mut b, update, 4, header, exit);

    b.switch_to(exit);
    return_local(&mut b, I);

    CountedLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        exit,
    }
}

// Helper function to create
// `i = 0; do { if (i) i = 2; i += 1 } while (i < 4); return i`
pub fn diamond_update_loop() -> DiamondLoop {
    let mut b = GraphBuilder::new(1).name("diamond_update_loop");
    let entry = b.block();
    let header = b.block();
    let skip = b.block();
    let tail = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, I, 0);
    b.jump(header);

    b.switch_to(header);
    let i = b.get_local(I);
    b.branch(Edge::untyped(i), skip, tail);

    b.switch_to(skip);
    store_constant(&mut b, I, 2);
    b.jump(tail);

    b.switch_to(tail);
    let update = update_local(&mut b, I, NodeKind::ArithAdd, 1);
    branch_less(&mut b, update, 4, header, exit);

    b.switch_to(exit);
    return_local(&mut b, I);

    DiamondLoop {
        graph: b.finish().unwrap(),
        entry,
        header,
        tail,
        exit,
    }
}

// Helper function to create
// `s = 0; j = 0; do { i = 0; do { s += 1; i += 1 } while (i < 2); j += 1 } while (j < 2); return s`
pub fn nested_loops() -> NestedLoops {
    let j = Operand(1);
    let s = Operand(2);
    let mut b = GraphBuilder::new(3).name("nested_loops");
    let entry = b.block();
    let outer_header = b.block();
    let inner_header = b.block();
    let outer_tail = b.block();
    let exit = b.block();

    b.switch_to(entry);
    store_constant(&mut b, j, 0);
    store_constant(&mut b, s, 0);
    b.jump(outer_header);

    b.switch_to(outer_header);
    store_constant(&mut b, I, 0);
    b.jump(inner_header);

    b.switch_to(inner_header);
    update_local(&mut b, s, NodeKind::ArithAdd, 1);
    let inner = update_local(&mut b, I, NodeKind::ArithAdd, 1);
    branch_less(&mut b, inner, 2, inner_header, outer_tail);

    b.switch_to(outer_tail);
    let outer = update_local(&mut b, j, NodeKind::ArithAdd, 1);
    branch_less(&mut b, outer, 2, outer_header, exit);

    b.switch_to(exit);
    return_local(&mut b, s);

    NestedLoops {
        graph: b.finish().unwrap(),
        outer_header,
        inner_header,
    }
}
