use std::path::PathBuf;

use checkpoint_core::error::{ConfigError, ControlError};

/// Errors that can occur while loading or driving demo scenarios.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// No scenario is currently loaded.
    #[error("no scenario is currently loaded")]
    NoActiveScenario,

    /// The requested scenario was not found in the manifest.
    #[error("scenario '{id}' not found in manifest")]
    ScenarioNotFound { id: String },

    /// Failed to load the checkpoint file from the scenario directory.
    #[error("data load error in {dir}: {source}")]
    DataLoad {
        dir: PathBuf,
        source: checkpoint_data::DataLoadError,
    },

    /// Failed to parse a scenario or manifest file.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The engine rejected the scenario's checkpoint.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A control action failed while setting the scenario up.
    #[error(transparent)]
    Control(#[from] ControlError),
}
