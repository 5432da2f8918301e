//! Scenario definition and construction.
//!
//! A scenario directory holds a `scenario.ron` (title and run settings) and a
//! checkpoint file (`checkpoint.{ron,toml,json}`) read by `checkpoint-data`.

use std::cell::{Ref, RefCell};
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use tracing::info;

use checkpoint_core::engine::{DEFAULT_SEED, Engine};
use checkpoint_core::event::{Event, EventKind};
use checkpoint_stats::{CheckpointStats, StatsConfig};

use crate::autopilot::{Autopilot, Routing};
use crate::error::DemoError;

/// Top-level scenario definition loaded from `scenario.ron`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioData {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub run: RunSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub seed: u64,
    /// Ticks a full run lasts unless the game ends first.
    pub ticks: u64,
    pub routing: Routing,
    /// Leave the game paused after loading.
    pub start_paused: bool,
    /// Window, in ticks, for rolling throughput.
    pub stats_window: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            ticks: 6_000,
            routing: Routing::default(),
            start_paused: false,
            stats_window: StatsConfig::default().window_size,
        }
    }
}

/// A fully constructed scenario ready for simulation and inspection.
pub struct ActiveScenario {
    pub engine: Engine,
    pub data: ScenarioData,
    pub autopilot: Autopilot,
    stats: Rc<RefCell<CheckpointStats>>,
    /// Frames driven through [`step`](Self::step).
    pub ticks_run: u64,
}

impl ActiveScenario {
    /// Route, then advance one tick. Nothing is routed while paused.
    pub fn step(&mut self) -> u64 {
        if self.engine.state().is_running() {
            self.autopilot.route(&mut self.engine);
        }
        let steps = self.engine.step().steps_run;
        if steps > 0 {
            self.stats.borrow_mut().end_tick(self.engine.state().tick);
        }
        self.ticks_run += 1;
        steps
    }

    /// Rolling statistics fed by the engine's events.
    pub fn stats(&self) -> Ref<'_, CheckpointStats> {
        self.stats.borrow()
    }

    /// Clear the engine and the statistics.
    pub fn reset(&mut self) {
        self.engine.reset_game();
        self.stats.borrow_mut().reset();
        self.ticks_run = 0;
    }
}

/// Events the statistics listen to.
const TRACKED_EVENTS: [EventKind; 4] = [
    EventKind::PassengerSpawned,
    EventKind::PassengerCleared,
    EventKind::BagScanCompleted,
    EventKind::IntegrityViolation,
];

/// Build a scenario from a directory containing `scenario.ron` and a
/// checkpoint file.
pub fn build_scenario(scenario_dir: &Path) -> Result<ActiveScenario, DemoError> {
    // 1. Load scenario.ron
    let scenario_path = scenario_dir.join("scenario.ron");
    let content = std::fs::read_to_string(&scenario_path)?;
    let data: ScenarioData = ron::from_str(&content).map_err(|e| DemoError::Parse {
        file: scenario_path,
        detail: e.to_string(),
    })?;

    // 2. Load the checkpoint
    let config =
        checkpoint_data::load_config_dir(scenario_dir).map_err(|e| DemoError::DataLoad {
            dir: scenario_dir.to_path_buf(),
            source: e,
        })?;

    // 3. Engine and statistics
    let mut engine = Engine::with_seed(config, data.run.seed)?;
    let stats = Rc::new(RefCell::new(CheckpointStats::new(StatsConfig {
        window_size: data.run.stats_window,
        ..StatsConfig::default()
    })));
    for kind in TRACKED_EVENTS {
        let sink = Rc::clone(&stats);
        engine.on_passive(
            kind,
            Box::new(move |event: &Event| sink.borrow_mut().process_event(event)),
        );
    }

    if !data.run.start_paused {
        engine.start_game()?;
    }
    info!(
        title = %data.title,
        lanes = engine.config().lanes.len(),
        seed = data.run.seed,
        "scenario_built"
    );

    Ok(ActiveScenario {
        autopilot: Autopilot::new(data.run.routing),
        engine,
        data,
        stats,
        ticks_run: 0,
    })
}
