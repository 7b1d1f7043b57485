//! Criterion benchmarks for the editor's per-edit hot paths.
//!
//! Benchmarks:
//! 1. Validation of a wide generated graph
//! 2. Explanation of the same graph
//! 3. Canvas round-trip
//! 4. Fingerprinting (canonical JSON + BLAKE3)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use stratgraph_core::canvas::{to_canvas, to_definition};
use stratgraph_core::explain::explain;
use stratgraph_core::graph::params::{CrossDirection, CrossoverParams, PeriodParams, PriceParams};
use stratgraph_core::graph::{
    Block, BlockParams, Connection, DefinitionMeta, Endpoint, Position, StrategyDefinition,
};
use stratgraph_core::validate::validate;

// ── Helpers ──────────────────────────────────────────────────────────

/// `n` SMA pairs over one price block, each pair crossing into an OR chain
/// that feeds a single entry, plus a stop loss.
fn wide_graph(n: usize) -> StrategyDefinition {
    let mut blocks = vec![Block::new(
        "price",
        BlockParams::Price(PriceParams::default()),
        Position::default(),
    )];
    let mut connections = Vec::new();
    let wire = |from: &str, out: &str, to: &str, input: &str| {
        Connection::new(Endpoint::new(from, out), Endpoint::new(to, input))
    };

    let mut last_condition: Option<String> = None;
    for i in 0..n {
        let fast = format!("fast{i}");
        let slow = format!("slow{i}");
        let cross = format!("cross{i}");
        let p = (i % 50) as u32;
        blocks.push(Block::new(
            fast.as_str(),
            BlockParams::Sma(PeriodParams { period: 5 + p }),
            Position::default(),
        ));
        blocks.push(Block::new(
            slow.as_str(),
            BlockParams::Sma(PeriodParams { period: 60 + p }),
            Position::default(),
        ));
        blocks.push(Block::new(
            cross.as_str(),
            BlockParams::Crossover(CrossoverParams {
                direction: CrossDirection::CrossesAbove,
            }),
            Position::default(),
        ));
        connections.push(wire("price", "price", &fast, "price"));
        connections.push(wire("price", "price", &slow, "price"));
        connections.push(wire(&fast, "value", &cross, "fast"));
        connections.push(wire(&slow, "value", &cross, "slow"));

        last_condition = Some(match last_condition {
            None => cross,
            Some(prev) => {
                let or = format!("or{i}");
                blocks.push(Block::new(or.as_str(), BlockParams::Or, Position::default()));
                connections.push(wire(&prev, "result", &or, "a"));
                connections.push(wire(&cross, "result", &or, "b"));
                or
            }
        });
    }

    blocks.push(Block::new("entry", BlockParams::EntrySignal, Position::default()));
    blocks.push(Block::new(
        "sl",
        BlockParams::StopLoss(Default::default()),
        Position::default(),
    ));
    if let Some(last) = last_condition {
        connections.push(wire(&last, "result", "entry", "signal"));
    }

    StrategyDefinition {
        blocks,
        connections,
        meta: DefinitionMeta::default(),
        notes: Vec::new(),
    }
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    for n in [10, 100, 400] {
        let def = wide_graph(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &def, |b, def| {
            b.iter(|| validate(black_box(def)))
        });
    }
    group.finish();
}

fn bench_explain(c: &mut Criterion) {
    let mut group = c.benchmark_group("explain");
    for n in [10, 100, 400] {
        let def = wide_graph(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &def, |b, def| {
            b.iter(|| explain(black_box(def)))
        });
    }
    group.finish();
}

fn bench_canvas_round_trip(c: &mut Criterion) {
    let def = wide_graph(100);
    c.bench_function("canvas_round_trip_100", |b| {
        b.iter(|| {
            let (nodes, edges) = to_canvas(black_box(&def));
            to_definition(&nodes, &edges)
        })
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let def = wide_graph(100);
    c.bench_function("fingerprint_100", |b| b.iter(|| black_box(&def).fingerprint()));
}

criterion_group!(
    benches,
    bench_validate,
    bench_explain,
    bench_canvas_round_trip,
    bench_fingerprint
);
criterion_main!(benches);
