#![no_main]
use arbitrary::Arbitrary;
use checkpoint_core::command_queue::Command;
use checkpoint_core::id::LaneId;
use checkpoint_core::test_utils::*;
use checkpoint_core::validation::check_invariants;
use libfuzzer_sys::fuzz_target;

/// A structured control-surface operation for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Spawn,
    /// Assign the main-queue passenger at `index` to lane `lane`.
    Assign { index: u8, lane: u8 },
    Start,
    Pause,
    Reset,
    SetSpawnRate { per_minute: u8 },
    Step { ticks: u8 },
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    seed: u64,
    ops: Vec<FuzzOp>,
}

fuzz_target!(|input: FuzzInput| {
    let mut config = quiet_config(2);
    config.initial_passengers = 3;
    config.initial_spawn_rate = 30;
    let mut engine = test_engine(config, input.seed);

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        let command = match op {
            FuzzOp::Spawn => Command::SpawnPassenger,
            FuzzOp::Assign { index, lane } => {
                let ids = engine.state().main_queue.ids();
                if ids.is_empty() {
                    continue;
                }
                Command::AssignPassengerToLane {
                    passenger: ids[*index as usize % ids.len()].clone(),
                    // Lane 2 does not exist and exercises the rejection path.
                    lane: LaneId(u32::from(*lane % 3)),
                }
            }
            FuzzOp::Start => Command::Start,
            FuzzOp::Pause => Command::Pause,
            FuzzOp::Reset => Command::Reset,
            FuzzOp::SetSpawnRate { per_minute } => Command::SetSpawnRate {
                per_minute: u32::from(*per_minute),
            },
            FuzzOp::Step { ticks } => {
                engine.run_ticks(u64::from(*ticks % 64));
                continue;
            }
        };
        engine.submit(command);
        engine.step();

        let violations = check_invariants(engine.state());
        assert!(violations.is_empty(), "invariants broken: {violations:?}");
    }
});
