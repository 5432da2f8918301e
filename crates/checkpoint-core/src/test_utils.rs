//! Builders for engines, configs and passengers used across the workspace's
//! tests and benches. Compiled for unit tests and behind the `test-utils`
//! feature.

use crate::config::{BodyScanTime, CheckpointConfig, LaneConfig};
use crate::engine::Engine;
use crate::entity::Passenger;
use crate::fixed::{Fixed64, SimMillis};
use crate::id::{LaneId, PassengerId};
use crate::rng::RandomSource;
use crate::sim::SimulationStrategy;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Scripted random source
// ===========================================================================

/// Replays a fixed list of raw values, cycling when exhausted.
///
/// `SequenceRng::new(vec![0])` makes every `chance(p)` with `p > 0` succeed
/// and every `below(n)` return 0.
#[derive(Debug, Clone)]
pub struct SequenceRng {
    values: Vec<u64>,
    cursor: usize,
}

impl SequenceRng {
    pub fn new(values: Vec<u64>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Every `chance(p)` with `p < 1` fails.
    pub fn never() -> Self {
        Self::new(vec![u64::MAX])
    }

    /// Every `chance(p)` with `p > 0` succeeds.
    pub fn always() -> Self {
        Self::new(vec![0])
    }

    /// Values handed out so far.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRng {
    fn next_u64(&mut self) -> u64 {
        if self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

// ===========================================================================
// Config builders
// ===========================================================================

/// A lane whose body scan always takes `body_scan_secs`.
pub fn fixed_lane(name: &str, body_scan_secs: f64) -> LaneConfig {
    LaneConfig {
        body_scan_time: BodyScanTime {
            mean_secs: body_scan_secs,
            std_dev_secs: 0.0,
            floor_secs: 0.5,
        },
        ..LaneConfig::named(name)
    }
}

/// Default checkpoint with deterministic 1 s body scans, no automatic
/// spawning, no initial batch and no unloading assistance.
pub fn quiet_config(lanes: usize) -> CheckpointConfig {
    CheckpointConfig {
        initial_passengers: 0,
        initial_spawn_rate: 0,
        lanes: (1..=lanes).map(|n| fixed_lane(&format!("LANE {n}"), 1.0)).collect(),
        unload_assist: None,
        ..Default::default()
    }
}

// ===========================================================================
// Engine builders
// ===========================================================================

/// A paused tick-mode engine over `config`, seeded with `seed`.
pub fn test_engine(config: CheckpointConfig, seed: u64) -> Engine {
    match Engine::with_seed(config, seed) {
        Ok(engine) => engine,
        Err(err) => panic!("test config rejected: {err}"),
    }
}

/// A running engine in delta mode.
pub fn delta_engine(config: CheckpointConfig, seed: u64) -> Engine {
    let mut engine = test_engine(config, seed).with_strategy(SimulationStrategy::Delta);
    if let Err(err) = engine.start_game() {
        panic!("start failed: {err}");
    }
    engine
}

/// A paused tick-mode engine whose every random decision comes from `rng`.
pub fn scripted_engine(config: CheckpointConfig, rng: SequenceRng) -> Engine<SequenceRng> {
    match Engine::with_rng(config, rng) {
        Ok(engine) => engine,
        Err(err) => panic!("test config rejected: {err}"),
    }
}

// ===========================================================================
// Passenger builders
// ===========================================================================

pub fn passenger_id(n: u64) -> PassengerId {
    PassengerId::generate(0, n)
}

/// A passenger without a bag, spawned at `now`.
pub fn bagless(n: u64, now: SimMillis) -> Passenger {
    let mut p = Passenger::new(passenger_id(n));
    p.journey.spawned = Some(now);
    p
}

/// A passenger carrying an item-free bag, spawned at `now`.
pub fn with_bag(n: u64, now: SimMillis) -> Passenger {
    bagless(n, now).with_bag(|_| {})
}

/// Put `passenger` at the back of the main queue as if it had been spawned.
pub fn enqueue_main<R: RandomSource>(engine: &mut Engine<R>, passenger: Passenger) -> PassengerId {
    let id = passenger.id.clone();
    if engine.state.main_queue.enqueue(passenger).is_err() {
        panic!("main queue refused {id}");
    }
    engine.state.total_spawned += 1;
    id
}

/// Enqueue `passenger` in the main queue, then assign it to `lane`.
pub fn enqueue_in_lane<R: RandomSource>(engine: &mut Engine<R>, passenger: Passenger, lane: LaneId) -> PassengerId {
    let id = enqueue_main(engine, passenger);
    if let Err(err) = engine.assign_passenger_to_lane(&id, lane) {
        panic!("assignment failed: {err}");
    }
    id
}

/// Mark a lane's bag scanner as broken.
pub fn break_bag_scanner<R: RandomSource>(engine: &mut Engine<R>, lane: LaneId) {
    if let Some(lane) = engine.state.lane_mut(lane) {
        lane.bag_scanner.operational = false;
    }
}

/// Step until `done` holds or `max_ticks` ticks have run. Returns the ticks run.
pub fn run_until<R: RandomSource>(
    engine: &mut Engine<R>,
    max_ticks: u64,
    mut done: impl FnMut(&Engine<R>) -> bool,
) -> u64 {
    let mut ran = 0;
    while ran < max_ticks && !done(engine) {
        if engine.step().steps_run == 0 {
            break;
        }
        ran += 1;
    }
    ran
}
