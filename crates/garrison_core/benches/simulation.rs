//! Tick-loop benchmarks for garrison_core.
//!
//! Run with: `cargo bench -p garrison_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use garrison_core::prelude::*;

fn ai_duel() -> Match {
    Match::new(RulesConfig::default(), MapLayout::standard(), 1)
        .expect("standard layout is valid")
        .with_autopilot(Difficulty::Hard)
}

/// Runs tick-loop benchmarks for the garrison_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("tick_60s_ai_duel", |b| {
        b.iter(|| {
            let mut game = ai_duel();
            for _ in 0..(60_000 / 16) {
                black_box(game.tick(16));
            }
            black_box(game.state_hash())
        });
    });

    c.bench_function("snapshot_round_trip", |b| {
        let mut game = ai_duel();
        for _ in 0..500 {
            game.tick(16);
        }
        b.iter(|| {
            let bytes = game.serialize().expect("serialize");
            black_box(Match::deserialize(&bytes).expect("deserialize"))
        });
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
