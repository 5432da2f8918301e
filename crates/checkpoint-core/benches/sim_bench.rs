//! Criterion benchmarks for the checkpoint simulation engine.
//!
//! Four benchmark groups:
//! - `two_lanes`: the default checkpoint, warmed up and autorouted
//! - `wide_checkpoint`: 32 lanes under heavy spawning
//! - `validation`: full invariant check on a busy state
//! - `snapshot`: JSON snapshot of the game state

use checkpoint_core::config::{CheckpointConfig, LaneConfig};
use checkpoint_core::engine::Engine;
use checkpoint_core::test_utils::*;
use checkpoint_core::validation::check_invariants;
use criterion::{Criterion, criterion_group, criterion_main};

// ===========================================================================
// Checkpoint builders
// ===========================================================================

fn autoroute(engine: &mut Engine) {
    while let Some(lane) = engine.least_occupied_lane()
        && let Some(front) = engine.state().main_queue.peek()
    {
        let id = front.id.clone();
        if engine.assign_passenger_to_lane(&id, lane).is_err() {
            break;
        }
    }
}

/// Start `config`, then run a simulated minute so every station has traffic.
fn warmed_up(config: CheckpointConfig) -> Engine {
    let mut engine = test_engine(config, 17);
    engine.start_game().unwrap();
    for _ in 0..600 {
        autoroute(&mut engine);
        engine.step();
    }
    engine
}

fn build_default_checkpoint() -> Engine {
    warmed_up(CheckpointConfig::default())
}

fn build_wide_checkpoint() -> Engine {
    warmed_up(CheckpointConfig {
        lanes: (1..=32).map(|n| LaneConfig::named(format!("LANE {n}"))).collect(),
        main_queue_capacity: 100,
        initial_spawn_rate: 600,
        ..Default::default()
    })
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_two_lanes(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_lanes");
    group.sample_size(50);

    let mut engine = build_default_checkpoint();

    group.bench_function("default_config_tick", |b| {
        b.iter(|| {
            autoroute(&mut engine);
            engine.step();
        });
    });

    group.finish();
}

fn bench_wide_checkpoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_checkpoint");
    group.sample_size(30);

    let mut engine = build_wide_checkpoint();

    group.bench_function("32_lanes_600_per_minute_tick", |b| {
        b.iter(|| {
            autoroute(&mut engine);
            engine.step();
        });
    });

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");
    group.sample_size(30);

    let engine = build_wide_checkpoint();

    group.bench_function("check_invariants_32_lanes", |b| {
        b.iter(|| check_invariants(engine.state()));
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    group.sample_size(30);

    let engine = build_wide_checkpoint();

    group.bench_function("state_to_json_32_lanes", |b| {
        b.iter(|| serde_json::to_vec(engine.state()).unwrap());
    });

    let data = serde_json::to_vec(engine.state()).unwrap();
    group.bench_function("state_from_json_32_lanes", |b| {
        b.iter(|| {
            serde_json::from_slice::<checkpoint_core::state::GameState>(&data).unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_two_lanes,
    bench_wide_checkpoint,
    bench_validation,
    bench_snapshot
);
criterion_main!(benches);
