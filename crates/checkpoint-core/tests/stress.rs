//! Stress and endurance tests for the checkpoint engine.
//!
//! These are marked `#[ignore]` for nightly CI runs. Run with:
//!   cargo test --package checkpoint-core -- --ignored

use checkpoint_core::config::{CheckpointConfig, LaneConfig};
use checkpoint_core::engine::Engine;
use checkpoint_core::test_utils::*;
use checkpoint_core::validation::check_invariants;

/// A wide checkpoint with a spawn rate high enough to keep every lane busy.
fn build_busy_checkpoint(lanes: usize, seed: u64) -> Engine {
    let config = CheckpointConfig {
        lanes: (1..=lanes).map(|n| LaneConfig::named(format!("LANE {n}"))).collect(),
        main_queue_capacity: 50,
        initial_spawn_rate: 20 * lanes as u32,
        ..Default::default()
    };
    let mut engine = test_engine(config, seed);
    engine.start_game().unwrap();
    engine
}

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

/// 32 lanes for one simulated hour, twice: hashes must agree.
#[test]
#[ignore]
fn test_32_lanes_one_hour_deterministic() {
    let mut engine_a = build_busy_checkpoint(32, 7);
    let mut engine_b = build_busy_checkpoint(32, 7);

    for _ in 0..36_000 {
        autoroute(&mut engine_a);
        autoroute(&mut engine_b);
        engine_a.step();
        engine_b.step();
    }

    assert_eq!(
        engine_a.state_hash(),
        engine_b.state_hash(),
        "32-lane checkpoint should be deterministic after one hour"
    );
}

/// Run a two-lane checkpoint for a simulated day with invariant checks
/// every simulated minute.
#[test]
#[ignore]
fn test_endurance_one_day() {
    let mut engine = build_busy_checkpoint(2, 3);
    for tick in 0..864_000u64 {
        autoroute(&mut engine);
        if engine.step().steps_run == 0 {
            break;
        }
        if tick % 600 == 0 {
            let violations = check_invariants(engine.state());
            assert!(violations.is_empty(), "tick {tick}: {violations:?}");
        }
    }
    assert!(engine.state().errors.is_empty());
    assert_eq!(
        engine.state().passengers_accounted_for(),
        engine.state().total_spawned
    );
}

/// Spawn and assign storm: every tick spawns and reassigns as much as fits.
#[test]
#[ignore]
fn test_control_storm() {
    let mut engine = build_busy_checkpoint(4, 11);
    for _ in 0..20_000 {
        for _ in 0..5 {
            let _ = engine.spawn_passenger();
        }
        autoroute(&mut engine);
        engine.step();
    }
    assert!(check_invariants(engine.state()).is_empty());
}
