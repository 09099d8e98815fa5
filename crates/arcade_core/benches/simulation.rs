//! Simulation benchmarks for arcade_core.
//!
//! Run with: `cargo bench -p arcade_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use arcade_core::flow_field::FlowField;
use arcade_core::terrain::{TileCell, TileCoord, TileGrid};
use arcade_core::time::TickDelta;
use arcade_test_utils::fixtures::{fixed, skirmish};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

/// Full combat ticks: AI, weapons, projectiles and damage on the skirmish arena.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("skirmish_tick", |b| {
        b.iter_batched(
            || skirmish(42).0,
            |mut sim| {
                for _ in 0..60 {
                    sim.tick(TickDelta::from_millis(16));
                }
                black_box(sim.state_hash())
            },
            BatchSize::SmallInput,
        );
    });
}

/// Flow field recomputation on a 64x64 map with a wall line.
pub fn flow_field_benchmark(c: &mut Criterion) {
    let mut grid = TileGrid::new(64, 64, fixed(32), TileCell::open("grass"));
    for row in 0..60 {
        grid.set_cell(TileCoord::new(row, 32), TileCell::wall("rock", false));
    }
    c.bench_function("flow_field_64x64", |b| {
        b.iter(|| {
            let mut field = FlowField::new();
            field.compute(&grid, black_box(TileCoord::new(5, 60)));
            black_box(field.distance(TileCoord::new(5, 2)))
        });
    });
}

criterion_group!(benches, simulation_benchmark, flow_field_benchmark);
criterion_main!(benches);
