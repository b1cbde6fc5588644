//! Benchmarks for loop unrolling.
//!
//! Measures the phase on the loop shapes it is built for:
//! - Full unrolling of a small counted loop
//! - Full unrolling of a large numeric loop body
//! - Partial unrolling of a loop with a run-time bound
//! - Loop analysis alone, without transformation
//! - A parallel batch through the scheduler

extern crate dfg_unroll;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use dfg_unroll::prelude::*;
use std::hint::black_box;

const I: Operand = Operand(0);

/// Build `i = 0; do { body; i += 1 } while (i < bound); return i`.
///
/// With `bound` of `None` the bound is read from local 1. `work` adds that
/// many `t = t ^ t` updates on local 2 to the body.
fn build_loop(bound: Option<i32>, work: usize) -> Graph {
    let t = Operand(2);
    let mut b = GraphBuilder::new(3).name("bench_loop");
    let entry = b.block();
    let header = b.block();
    let exit = b.block();

    b.switch_to(entry);
    let zero = b.int32(0);
    b.set_local(I, Edge::int32(zero));
    b.set_local(t, Edge::int32(zero));
    b.jump(header);

    b.switch_to(header);
    for _ in 0..work {
        let value = b.get_local(t);
        let mixed = b.binary(NodeKind::BitXor, Edge::int32(value), Edge::int32(value));
        b.set_local(t, Edge::int32(mixed));
    }
    let i = b.get_local(I);
    let one = b.int32(1);
    let next = b.binary(NodeKind::ArithAdd, Edge::int32(i), Edge::int32(one));
    b.set_local(I, Edge::int32(next));
    let limit = match bound {
        Some(bound) => b.int32(bound),
        None => b.get_local(Operand(1)),
    };
    let test = b.binary(NodeKind::CompareLess, Edge::int32(next), Edge::int32(limit));
    b.branch(Edge::untyped(test), header, exit);

    b.switch_to(exit);
    let result = b.get_local(I);
    b.ret(Some(Edge::untyped(result)));
    b.finish().unwrap()
}

fn run_phase(mut graph: Graph, config: UnrollConfig) -> bool {
    let events = EventLog::new();
    let mut phase = LoopUnrollingPhase::new(config);
    let changed = phase.run(&mut graph, &events).unwrap();
    black_box(graph);
    changed
}

/// Benchmark fully unrolling a 16-iteration loop with a small body.
fn bench_full_unroll_small(c: &mut Criterion) {
    let graph = build_loop(Some(16), 4);

    c.bench_function("unroll_full_small", |b| {
        b.iter_batched(
            || graph.clone(),
            |graph| black_box(run_phase(graph, UnrollConfig::default())),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark fully unrolling a two-iteration numeric hot loop.
fn bench_full_unroll_numeric(c: &mut Criterion) {
    let graph = build_loop(Some(2), 60);

    c.bench_function("unroll_full_numeric", |b| {
        b.iter_batched(
            || graph.clone(),
            |graph| black_box(run_phase(graph, UnrollConfig::default())),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark partially unrolling a loop with a run-time bound.
fn bench_partial_unroll(c: &mut Criterion) {
    let graph = build_loop(None, 8);

    c.bench_function("unroll_partial_x4", |b| {
        b.iter_batched(
            || graph.clone(),
            |graph| black_box(run_phase(graph, UnrollConfig::aggressive())),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark shape, induction and profitability analysis of one loop.
fn bench_analyze(c: &mut Criterion) {
    let graph = build_loop(Some(16), 16);
    let phase = LoopUnrollingPhase::new(UnrollConfig::default());

    c.bench_function("unroll_analyze", |b| {
        b.iter(|| {
            let natural_loop = graph.natural_loops().loop_at(0).unwrap();
            black_box(phase.analyze(black_box(&graph), natural_loop))
        });
    });
}

/// Benchmark a batch of 64 graphs through the parallel scheduler.
fn bench_scheduler_batch(c: &mut Criterion) {
    let graphs: Vec<Graph> = (0..64).map(|n| build_loop(Some(2 + n % 12), 4)).collect();
    let scheduler = PassScheduler::new(false)
        .with_phase(|| Box::new(LoopUnrollingPhase::new(UnrollConfig::default())));

    c.bench_function("unroll_scheduler_batch_64", |b| {
        b.iter_batched(
            || graphs.clone(),
            |mut graphs| {
                let events = EventLog::new();
                black_box(scheduler.run(&mut graphs, &events))
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_full_unroll_small,
    bench_full_unroll_numeric,
    bench_partial_unroll,
    bench_analyze,
    bench_scheduler_batch,
);
criterion_main!(benches);
