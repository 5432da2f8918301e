//! Scenario runner for the checkpoint engine.
//!
//! Loads curated checkpoint scenarios from data files, builds engine
//! instances, routes passengers with an autopilot standing in for the player,
//! and reports session statistics.
//!
//! # Usage
//!
//! ```rust,ignore
//! use checkpoint_demo::ScenarioRunner;
//!
//! let mut runner = ScenarioRunner::new(Path::new("scenarios/"))?;
//! runner.load_scenario("rush_hour")?;
//! let report = runner.run_to_end()?;
//! println!("{} passengers cleared", report.summary.passengers_processed);
//! ```

pub mod autopilot;
pub mod error;
pub mod manifest;
pub mod runner;
pub mod scenario;

pub use autopilot::{Autopilot, Routing};
pub use error::DemoError;
pub use manifest::{ScenarioEntry, ScenarioManifest};
pub use runner::{RunReport, ScenarioRunner};
pub use scenario::{ActiveScenario, RunSettings, ScenarioData, build_scenario};
