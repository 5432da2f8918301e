//! The simulation engine: owns the checkpoint state and runs the tick
//! pipeline.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - The validated [`CheckpointConfig`]
//! - A [`GameState`] (main queue, lanes, completed passengers, clock, timers)
//! - A [`RandomSource`] for spawning, scan times and alerts
//! - A [`CommandQueue`] of control-surface calls deferred to the next tick
//! - A [`SimulationStrategy`] (tick vs. delta) with its [`DriverState`]
//! - An [`EventBus`] for typed simulation events
//!
//! # Tick Pipeline
//!
//! `advance()` first applies queued commands, then, while the game is
//! running, each tick:
//! 1. **Clock** -- advance simulated time and the tick counter
//! 2. **Histogram** -- backfill empty buckets up to the current time
//! 3. **Spawn** -- spawn a passenger if the spawn interval has elapsed
//! 4. **Lanes** -- run every lane's seven-step pipeline in lane order
//! 5. **Capacity** -- start, reset or fire the main-queue capacity timer
//! 6. **Bookkeeping** -- compute the state hash and deliver events

use std::hash::Hasher;

use tracing::{debug, info, warn};

use crate::command_queue::{Command, CommandQueue};
use crate::config::CheckpointConfig;
use crate::error::{ConfigError, ControlError, IntegrityError, RecordedError};
use crate::event::{Event, EventBus, EventKind, PassiveListener};
use crate::fixed::SimMillis;
use crate::generator::generate_passenger;
use crate::id::{BagId, LaneId, PassengerId};
use crate::lane::{LaneTick, SecurityLane};
use crate::queue::RejectReason;
use crate::rng::{RandomSource, SimRng};
use crate::sim::{AdvanceResult, DriverState, SimulationStrategy, StateHash};
use crate::state::{GameOverSummary, GamePhase, GameState};

/// Seed used by [`Engine::new`].
pub const DEFAULT_SEED: u64 = 0x5EC0_C4EC;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The checkpoint simulation. One engine owns one game.
#[derive(Debug)]
pub struct Engine<R: RandomSource = SimRng> {
    config: CheckpointConfig,

    /// The full simulation state. Read freely; mutate through the control
    /// surface.
    pub(crate) state: GameState,

    pub(crate) rng: R,

    /// Simulation strategy (tick or delta).
    pub(crate) strategy: SimulationStrategy,

    /// Wall-time accumulator for delta mode.
    pub(crate) driver: DriverState,

    /// Control-surface calls waiting for the next tick boundary.
    pub(crate) commands: CommandQueue,

    /// The most recently computed state hash.
    pub(crate) last_state_hash: u64,

    /// Typed event bus for simulation events.
    pub event_bus: EventBus,
}

impl Engine<SimRng> {
    /// Create an engine in tick mode, seeded with [`DEFAULT_SEED`].
    pub fn new(config: CheckpointConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, SimRng::new(DEFAULT_SEED))
    }

    /// Create an engine in tick mode with the given seed.
    pub fn with_seed(config: CheckpointConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, SimRng::new(seed))
    }
}

impl<R: RandomSource> Engine<R> {
    /// Create an engine in tick mode driven by `rng`.
    pub fn with_rng(config: CheckpointConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut engine = Self {
            state: GameState::new(&config),
            rng,
            strategy: SimulationStrategy::Tick,
            driver: DriverState::default(),
            commands: CommandQueue::new(),
            last_state_hash: 0,
            event_bus: EventBus::new(config.event_buffer_capacity),
            config,
        };
        engine.last_state_hash = engine.compute_state_hash();
        Ok(engine)
    }

    /// Switch the simulation strategy. Clears the delta accumulator.
    pub fn with_strategy(mut self, strategy: SimulationStrategy) -> Self {
        self.strategy = strategy;
        self.driver = DriverState::default();
        self
    }

    /// Keep the last `max_history` executed commands for inspection.
    pub fn with_command_history(mut self, max_history: usize) -> Self {
        self.commands = CommandQueue::with_max_history(max_history);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    /// Read-only snapshot of the whole game.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn strategy(&self) -> &SimulationStrategy {
        &self.strategy
    }

    pub fn driver(&self) -> &DriverState {
        &self.driver
    }

    pub fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    /// Hash of the state as of the last completed tick.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Suppress an event kind entirely.
    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    /// Register a passive listener for an event kind.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the next tick boundary.
    pub fn submit(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn submit_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.push_batch(commands);
    }

    /// Run one command immediately.
    pub fn apply(&mut self, command: Command) -> Result<(), ControlError> {
        match command {
            Command::SpawnPassenger => self.spawn_passenger().map(drop),
            Command::AssignPassengerToLane { passenger, lane } => {
                self.assign_passenger_to_lane(&passenger, lane)
            }
            Command::Start => self.start_game(),
            Command::Pause => {
                self.pause_game();
                Ok(())
            }
            Command::Reset => {
                self.reset_game();
                Ok(())
            }
            Command::SetSpawnRate { per_minute } => {
                self.set_spawn_rate(per_minute);
                Ok(())
            }
            Command::AcknowledgeBagAlerts { bag } => self.acknowledge_bag_alerts(&bag),
        }
    }

    fn apply_queued(&mut self, result: &mut AdvanceResult) {
        for command in self.commands.drain(self.state.time) {
            if let Err(err) = self.apply(command.clone()) {
                debug!(?command, %err, "command_rejected");
                result.rejected_commands.push((command, err));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Control surface
    // -----------------------------------------------------------------------

    /// Create a randomized passenger at the back of the main queue.
    ///
    /// Nothing is created when the main queue is full.
    pub fn spawn_passenger(&mut self) -> Result<PassengerId, ControlError> {
        if self.state.main_queue.is_full() {
            return Err(ControlError::MainQueueFull);
        }
        let now = self.state.time;
        let passenger = generate_passenger(now, &self.config.passengers, &mut self.rng);
        let id = passenger.id.clone();
        let has_bag = passenger.has_bag;

        self.state.main_queue.enqueue(passenger).map_err(|rejected| match rejected.reason {
            RejectReason::Full => ControlError::MainQueueFull,
            RejectReason::DuplicateId => ControlError::DuplicatePassenger(rejected.item.id),
        })?;
        self.state.total_spawned += 1;

        debug!(passenger = %id, has_bag, "passenger_spawned");
        self.event_bus.emit(Event::PassengerSpawned {
            passenger: id.clone(),
            has_bag,
            time: now,
        });
        Ok(id)
    }

    /// Move a passenger from the main queue to the back of a lane line.
    ///
    /// On any error the state is left exactly as it was. Refused once the
    /// game is over.
    pub fn assign_passenger_to_lane(&mut self, passenger: &PassengerId, lane: LaneId) -> Result<(), ControlError> {
        if self.state.is_game_over() {
            return Err(ControlError::GameOver);
        }
        if !self.state.main_queue.contains(passenger) {
            return Err(ControlError::PassengerNotFound(passenger.clone()));
        }
        let now = self.state.time;
        let target = self
            .state
            .security_lanes
            .get_mut(lane.0 as usize)
            .ok_or(ControlError::LaneNotFound(lane))?;

        match target.admit_from(&mut self.state.main_queue, passenger, now) {
            Ok(true) => {}
            Ok(false) => return Err(ControlError::PassengerNotFound(passenger.clone())),
            Err(reason) => {
                debug!(passenger = %passenger, %lane, %reason, "assignment_rejected");
                return Err(ControlError::LaneFull(lane));
            }
        }

        debug!(passenger = %passenger, %lane, "passenger_assigned");
        self.event_bus.emit(Event::PassengerAssigned {
            passenger: passenger.clone(),
            lane,
            time: now,
        });
        Ok(())
    }

    /// Start or resume the game. A fresh game spawns the initial passengers.
    pub fn start_game(&mut self) -> Result<(), ControlError> {
        match self.state.phase {
            GamePhase::GameOver => return Err(ControlError::GameOver),
            GamePhase::Running => return Ok(()),
            GamePhase::Paused => {}
        }
        if self.state.time == 0 && self.state.total_spawned == 0 {
            for _ in 0..self.config.initial_passengers {
                if self.spawn_passenger().is_err() {
                    break;
                }
            }
        }
        self.set_phase(GamePhase::Running);
        Ok(())
    }

    /// Stop the clock. No-op unless running.
    pub fn pause_game(&mut self) {
        if self.state.phase == GamePhase::Running {
            self.set_phase(GamePhase::Paused);
        }
    }

    /// Throw the current game away and return to a fresh, paused state.
    /// The random source keeps its position.
    pub fn reset_game(&mut self) {
        let from = self.state.phase;
        self.state = GameState::new(&self.config);
        self.driver.accumulator_ms = 0;
        self.event_bus.clear_all();
        self.last_state_hash = self.compute_state_hash();
        info!(?from, "game_reset");
        if from != GamePhase::Paused {
            self.event_bus.emit(Event::PhaseChanged {
                from,
                to: GamePhase::Paused,
                time: 0,
            });
        }
    }

    /// Passengers per minute. 0 stops automatic spawning.
    pub fn set_spawn_rate(&mut self, per_minute: u32) {
        debug!(per_minute, "spawn_rate_set");
        self.state.spawn_rate = per_minute;
    }

    /// Mark every alert on a bag as dealt with, wherever the bag is in a lane
    /// or on a cleared passenger.
    pub fn acknowledge_bag_alerts(&mut self, bag: &BagId) -> Result<(), ControlError> {
        let found = match self
            .state
            .security_lanes
            .iter_mut()
            .find_map(|lane| lane.find_bag_mut(bag))
        {
            Some(found) => Some(found),
            None => self
                .state
                .completed
                .iter_mut()
                .filter_map(|p| p.bag.as_mut())
                .find(|b| &b.id == bag),
        };
        let found = found.ok_or_else(|| ControlError::BagNotFound(bag.clone()))?;
        found.acknowledge_alerts();
        debug!(bag = %bag, "bag_alerts_acknowledged");
        Ok(())
    }

    fn set_phase(&mut self, to: GamePhase) {
        let from = self.state.phase;
        if from == to {
            return;
        }
        self.state.phase = to;
        info!(?from, ?to, time = self.state.time, "phase_changed");
        self.event_bus.emit(Event::PhaseChanged {
            from,
            to,
            time: self.state.time,
        });
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Apply queued commands, then advance according to the strategy.
    ///
    /// - **Tick mode**: `elapsed_ms` is ignored; exactly one tick runs.
    /// - **Delta mode**: `elapsed_ms` is accumulated; as many ticks run as
    ///   fit, up to `max_catch_up_ticks`. The rest are dropped.
    ///
    /// Nothing but command application happens unless the game is running.
    pub fn advance(&mut self, elapsed_ms: SimMillis) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        self.apply_queued(&mut result);
        if !self.state.is_running() {
            self.event_bus.deliver();
            return result;
        }

        let due = match self.strategy {
            SimulationStrategy::Tick => 1,
            SimulationStrategy::Delta => {
                let (run, skipped) =
                    self.driver
                        .plan(elapsed_ms, self.config.tick_ms, self.config.max_catch_up_ticks);
                if skipped > 0 {
                    debug!(skipped, "ticks_skipped");
                }
                result.ticks_skipped = skipped;
                run
            }
        };

        for _ in 0..due {
            if !self.state.is_running() {
                break;
            }
            self.tick();
            result.steps_run += 1;
        }
        result
    }

    /// Run a single tick (convenience for tick mode).
    pub fn step(&mut self) -> AdvanceResult {
        self.advance(self.config.tick_ms)
    }

    /// Step `ticks` times, stopping early if the game stops running.
    pub fn run_ticks(&mut self, ticks: u64) -> u64 {
        let mut ran = 0;
        for _ in 0..ticks {
            let result = self.step();
            if result.steps_run == 0 {
                break;
            }
            ran += result.steps_run;
        }
        ran
    }

    // -----------------------------------------------------------------------
    // Internal: single tick
    // -----------------------------------------------------------------------

    fn tick(&mut self) {
        let dt = self.config.tick_ms;
        self.state.time += dt;
        self.state.tick += 1;
        let now = self.state.time;

        self.state.histogram.backfill(now);
        self.phase_spawn(now);
        self.phase_lanes(now, dt);
        self.phase_capacity(now);

        self.last_state_hash = self.compute_state_hash();
        self.event_bus.deliver();
    }

    fn phase_spawn(&mut self, now: SimMillis) {
        let rate = self.state.spawn_rate;
        if rate == 0 {
            return;
        }
        let interval = 60_000 / SimMillis::from(rate);
        if now.saturating_sub(self.state.last_spawn_time) < interval {
            return;
        }
        self.state.last_spawn_time = now;
        if let Err(err) = self.spawn_passenger() {
            debug!(%err, "spawn_skipped");
        }
    }

    fn phase_lanes(&mut self, now: SimMillis, dt: SimMillis) {
        let mut violations: Vec<IntegrityError> = Vec::new();
        for lane in &mut self.state.security_lanes {
            let mut ctx = LaneTick {
                now,
                dt,
                rng: &mut self.rng,
                alerts: &self.config.alerts,
                policy: &self.config.policy,
                assist: self.config.unload_assist.as_ref(),
                events: &mut self.event_bus,
            };
            let outcome = lane.tick(&mut ctx);
            for passenger in outcome.cleared {
                self.state.histogram.record(now);
                self.state.completed.push(passenger);
            }
            violations.extend(outcome.violations);
        }

        if violations.is_empty() {
            return;
        }
        for error in violations {
            warn!(%error, time = now, "integrity_violation");
            self.state.errors.push(RecordedError::new(error.clone(), now));
            self.event_bus.emit(Event::IntegrityViolation { error, time: now });
        }
        self.pause_game();
    }

    fn phase_capacity(&mut self, now: SimMillis) {
        if !self.state.main_queue.is_full() {
            if self.state.queue_at_capacity_start_time.take().is_some() {
                debug!(time = now, "capacity_timer_reset");
                self.event_bus.emit(Event::CapacityTimerReset { time: now });
            }
            return;
        }
        let start = match self.state.queue_at_capacity_start_time {
            Some(start) => start,
            None => {
                self.state.queue_at_capacity_start_time = Some(now);
                debug!(time = now, "capacity_timer_started");
                self.event_bus.emit(Event::CapacityTimerStarted { time: now });
                now
            }
        };
        if now.saturating_sub(start) >= self.config.game_over_timeout_ms {
            self.game_over(now);
        }
    }

    fn game_over(&mut self, now: SimMillis) {
        if self.state.game_over.is_some() {
            return;
        }
        let summary = GameOverSummary {
            time: now,
            passengers_processed: self.state.completed.len(),
            total_spawned: self.state.total_spawned,
        };
        info!(
            time = now,
            passengers_processed = summary.passengers_processed,
            total_spawned = summary.total_spawned,
            "game_over"
        );
        self.state.game_over = Some(summary);
        self.set_phase(GamePhase::GameOver);
        self.event_bus.emit(Event::GameOver {
            passengers_processed: summary.passengers_processed,
            time: now,
        });
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        let state = &self.state;

        hasher.write_u64(state.tick);
        hasher.write_u64(state.time);
        hasher.write_u32(state.spawn_rate);
        hasher.write_u64(state.total_spawned);

        for passenger in state.main_queue.iter() {
            hasher.write_str(passenger.id.as_str());
        }
        for lane in &state.security_lanes {
            hash_lane(&mut hasher, lane);
        }
        for passenger in &state.completed {
            hasher.write_str(passenger.id.as_str());
        }
        hasher.finish()
    }
}

fn hash_lane(hasher: &mut StateHash, lane: &SecurityLane) {
    hasher.write_u32(lane.id.0);
    for (station, passenger) in lane.passengers_with_station() {
        hasher.write_u32(station as u32);
        hasher.write_str(passenger.id.as_str());
        hasher.write_fixed64(passenger.unloading_progress);
    }
    for bag in lane.bag_scanner.iter().chain(lane.bag_scanner_off_ramp.iter()) {
        hasher.write_str(bag.id.as_str());
        hasher.write_u32(u32::from(bag.scan_complete));
        if let Some(progress) = lane.bag_scanner.progress(&bag.id) {
            hasher.write_u64(progress.elapsed_ms);
        }
    }
}
