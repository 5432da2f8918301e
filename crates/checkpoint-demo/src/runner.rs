use std::path::{Path, PathBuf};

use tracing::info;

use checkpoint_core::fixed::Fixed64;
use checkpoint_core::query::LaneSnapshot;
use checkpoint_stats::SessionSummary;

use crate::error::DemoError;
use crate::manifest::{ScenarioEntry, ScenarioManifest, load_manifest};
use crate::scenario::{ActiveScenario, build_scenario};

/// Outcome of a run driven by [`ScenarioRunner::run_to_end`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub scenario: String,
    pub ticks_run: u64,
    pub game_over: bool,
    pub state_hash: u64,
    pub summary: SessionSummary,
    pub clearances_per_minute: Fixed64,
}

/// Manages the demo scenarios: loads the manifest, loads/unloads scenarios,
/// drives simulation ticks, and provides query access.
pub struct ScenarioRunner {
    scenarios_dir: PathBuf,
    manifest: ScenarioManifest,
    active: Option<ActiveScenario>,
    active_id: Option<String>,
}

impl ScenarioRunner {
    /// Create a new runner by loading the manifest from `scenarios_dir`.
    pub fn new(scenarios_dir: &Path) -> Result<Self, DemoError> {
        let manifest = load_manifest(scenarios_dir)?;
        Ok(Self {
            scenarios_dir: scenarios_dir.to_path_buf(),
            manifest,
            active: None,
            active_id: None,
        })
    }

    pub fn title(&self) -> &str {
        &self.manifest.title
    }

    pub fn description(&self) -> &str {
        &self.manifest.description
    }

    /// All scenario entries from the manifest.
    pub fn scenarios(&self) -> &[ScenarioEntry] {
        &self.manifest.scenarios
    }

    /// Scenario entries carrying `tag`.
    pub fn scenarios_tagged(&self, tag: &str) -> Vec<&ScenarioEntry> {
        self.manifest
            .scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Load a scenario by its manifest ID. Unloads any previously active one.
    pub fn load_scenario(&mut self, scenario_id: &str) -> Result<(), DemoError> {
        let entry = self
            .manifest
            .scenarios
            .iter()
            .find(|s| s.id == scenario_id)
            .ok_or_else(|| DemoError::ScenarioNotFound {
                id: scenario_id.to_string(),
            })?;

        let scenario = build_scenario(&self.scenarios_dir.join(&entry.path))?;
        self.active = Some(scenario);
        self.active_id = Some(entry.id.clone());
        Ok(())
    }

    pub fn unload_scenario(&mut self) {
        self.active = None;
        self.active_id = None;
    }

    pub fn active(&self) -> Result<&ActiveScenario, DemoError> {
        self.active.as_ref().ok_or(DemoError::NoActiveScenario)
    }

    pub fn active_mut(&mut self) -> Result<&mut ActiveScenario, DemoError> {
        self.active.as_mut().ok_or(DemoError::NoActiveScenario)
    }

    /// Route and advance the active scenario by one tick.
    pub fn tick(&mut self) -> Result<(), DemoError> {
        self.active_mut()?.step();
        Ok(())
    }

    /// Advance by `n` ticks.
    pub fn tick_n(&mut self, n: u64) -> Result<(), DemoError> {
        let scenario = self.active_mut()?;
        for _ in 0..n {
            scenario.step();
        }
        Ok(())
    }

    /// Set paused state.
    pub fn set_paused(&mut self, paused: bool) -> Result<(), DemoError> {
        let engine = &mut self.active_mut()?.engine;
        if paused {
            engine.pause_game();
        } else {
            engine.start_game()?;
        }
        Ok(())
    }

    /// Drive the active scenario until its configured tick count is reached
    /// or the game ends.
    pub fn run_to_end(&mut self) -> Result<RunReport, DemoError> {
        let scenario = self.active_mut()?;
        while scenario.ticks_run < scenario.data.run.ticks
            && !scenario.engine.state().is_game_over()
        {
            scenario.step();
        }
        let report = self.report()?;
        info!(
            scenario = %report.scenario,
            ticks = report.ticks_run,
            processed = report.summary.passengers_processed,
            game_over = report.game_over,
            "scenario_finished"
        );
        Ok(report)
    }

    /// Snapshot the active scenario's results so far.
    pub fn report(&self) -> Result<RunReport, DemoError> {
        let scenario = self.active()?;
        let tick_ms = scenario.engine.config().tick_ms;
        Ok(RunReport {
            scenario: self.active_id.clone().unwrap_or_default(),
            ticks_run: scenario.ticks_run,
            game_over: scenario.engine.state().is_game_over(),
            state_hash: scenario.engine.state_hash(),
            summary: SessionSummary::from_state(scenario.engine.state()),
            clearances_per_minute: scenario.stats().clearances_per_minute(tick_ms),
        })
    }

    /// Get the current tick count.
    pub fn current_tick(&self) -> Result<u64, DemoError> {
        Ok(self.active()?.engine.state().tick)
    }

    /// The deterministic state hash of the active scenario's engine.
    pub fn state_hash(&self) -> Result<u64, DemoError> {
        Ok(self.active()?.engine.state_hash())
    }

    pub fn lane_snapshots(&self) -> Result<Vec<LaneSnapshot>, DemoError> {
        Ok(self.active()?.engine.lane_snapshots())
    }
}
