//! Benchmarks for the burr puzzle disassembly planner.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use burr::config::Config;
use burr::graph::DisassemblyGraph;
use burr::persistence::parse_puzzle;
use burr::pieces::{DOUBLE_POCKET, POCKET};

/// Benchmark building a configuration's acceleration structures.
fn bench_accel_structures(c: &mut Criterion) {
    let pieces = parse_puzzle(DOUBLE_POCKET).unwrap();

    c.bench_function("build_accel_structures", |b| {
        b.iter(|| Config::from_pieces(black_box(pieces.clone())))
    });
}

/// Benchmark one round of neighbor configuration generation.
fn bench_neighbor_configs(c: &mut Criterion) {
    let root = Config::from_pieces(parse_puzzle(DOUBLE_POCKET).unwrap());

    c.bench_function("neighbor_configs", |b| {
        b.iter(|| black_box(&root).neighbor_configs())
    });
}

/// Benchmark the complete disassembly of the pocket puzzle.
fn bench_complete_pocket(c: &mut Criterion) {
    c.bench_function("complete_pocket", |b| {
        b.iter(|| {
            let mut graph = DisassemblyGraph::new();
            let mut rng = StdRng::seed_from_u64(0);
            graph
                .import_puzzle_source(black_box(POCKET), &mut rng)
                .unwrap();
            graph.build_complete_disassembly_graph();
            graph.plan_len()
        })
    });
}

/// Benchmark the complete disassembly of the three-piece double pocket.
fn bench_complete_double_pocket(c: &mut Criterion) {
    let mut group = c.benchmark_group("double_pocket");
    group.sample_size(20);
    group.bench_function("complete", |b| {
        b.iter(|| {
            let mut graph = DisassemblyGraph::new();
            let mut rng = StdRng::seed_from_u64(0);
            graph
                .import_puzzle_source(black_box(DOUBLE_POCKET), &mut rng)
                .unwrap();
            graph.build_complete_disassembly_graph();
            graph.plan_len()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_accel_structures,
    bench_neighbor_configs,
    bench_complete_pocket,
    bench_complete_double_pocket
);
criterion_main!(benches);
