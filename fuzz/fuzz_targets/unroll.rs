#![no_main]

use libfuzzer_sys::fuzz_target;
use dfg_unroll::prelude::*;

const UPDATES: [NodeKind; 3] = [NodeKind::ArithAdd, NodeKind::ArithSub, NodeKind::ArithMul];
const COMPARES: [NodeKind; 5] = [
    NodeKind::CompareLess,
    NodeKind::CompareLessEq,
    NodeKind::CompareGreater,
    NodeKind::CompareGreaterEq,
    NodeKind::CompareEq,
];

fn build(data: &[u8]) -> Option<Graph> {
    let [init, step, bound, shape, ..] = *data else {
        return None;
    };
    let i = Operand(0);
    let mut b = GraphBuilder::new(1);
    let entry = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    let init = b.int32(i32::from(init as i8));
    b.set_local(i, Edge::int32(init));
    b.jump(header);

    b.switch_to(header);
    let current = b.get_local(i);
    let step = b.int32(i32::from(step as i8));
    let update = UPDATES[usize::from(shape) % UPDATES.len()];
    let next = b.binary(update, Edge::int32(current), Edge::int32(step));
    b.set_local(i, Edge::int32(next));
    let bound = b.int32(i32::from(bound as i8));
    let compare = COMPARES[usize::from(shape >> 2) % COMPARES.len()];
    let test = b.binary(compare, Edge::int32(next), Edge::int32(bound));
    if shape & 0x80 != 0 {
        b.branch(Edge::untyped(test), exit, header);
    } else {
        b.branch(Edge::untyped(test), header, exit);
    }

    b.switch_to(exit);
    let result = b.get_local(i);
    b.ret(Some(Edge::untyped(result)));
    b.finish().ok()
}

fuzz_target!(|data: &[u8]| {
    let Some(mut graph) = build(data) else {
        return;
    };
    let before = Interpreter::new(&graph).with_step_budget(10_000).run();

    let events = EventLog::new();
    let mut phase = LoopUnrollingPhase::new(UnrollConfig::aggressive());
    phase.run(&mut graph, &events).unwrap();
    validate(&graph).unwrap();

    // A loop that terminates must compute the same value after unrolling.
    if let Ok(before) = before {
        let after = Interpreter::new(&graph).with_step_budget(10_000).run().unwrap();
        assert_eq!(after.return_value, before.return_value);
    }
});
