//! Loading pipeline: reads checkpoint files, resolves lane templates, validates.
//!
//! A checkpoint may be written as RON, TOML or JSON; the extension decides.
//! The lower-level helpers are public so scenario runners can read their own
//! file shapes the same way.

use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use checkpoint_core::config::CheckpointConfig;
use checkpoint_core::error::ConfigError;

use crate::schema::CheckpointFile;

/// Base name [`load_config_dir`] looks for.
pub const CHECKPOINT_FILE: &str = "checkpoint";

// ===========================================================================
// Errors
// ===========================================================================

/// Why a checkpoint could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// No file with the base name in any supported format.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("no reader for extension of {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Same base name present in two formats.
    #[error("ambiguous checkpoint files: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("cannot parse {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// Two lanes share a name.
    #[error("duplicate lane name '{name}' in {file}")]
    DuplicateLane { file: PathBuf, name: String },

    /// The file parsed but describes an unusable checkpoint.
    #[error("invalid checkpoint in {file}: {source}")]
    Invalid {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// On-disk encodings a checkpoint file may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .into_iter()
        .find(|f| Some(f.extension()) == ext)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look in `dir` for `base_name` with any supported extension. At most one
/// may exist.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present = Format::ALL
        .into_iter()
        .map(|f| dir.join(format!("{base_name}.{}", f.extension())))
        .filter(|p| p.exists());
    match (present.next(), present.next()) {
        (Some(a), Some(b)) => Err(DataLoadError::ConflictingFormats { a, b }),
        (found, _) => Ok(found),
    }
}

/// [`find_data_file`] where absence is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `origin` names the source in
/// parse errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<T, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read `path` and decode it in the format its extension names.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Checkpoint loading
// ===========================================================================

/// Turn a parsed checkpoint file into a validated config.
pub fn resolve_checkpoint(file: CheckpointFile, origin: &Path) -> Result<CheckpointConfig, DataLoadError> {
    let config = file.into_config();

    let mut names = HashSet::new();
    for lane in &config.lanes {
        if !names.insert(lane.name.as_str()) {
            return Err(DataLoadError::DuplicateLane {
                file: origin.to_path_buf(),
                name: lane.name.clone(),
            });
        }
    }

    config.validate().map_err(|source| DataLoadError::Invalid {
        file: origin.to_path_buf(),
        source,
    })?;
    Ok(config)
}

/// Load and validate a checkpoint file. Missing fields take their defaults.
pub fn load_config(path: &Path) -> Result<CheckpointConfig, DataLoadError> {
    let file: CheckpointFile = deserialize_file(path)?;
    resolve_checkpoint(file, path)
}

/// Load `checkpoint.{ron,toml,json}` from `dir`.
pub fn load_config_dir(dir: &Path) -> Result<CheckpointConfig, DataLoadError> {
    let path = require_data_file(dir, CHECKPOINT_FILE)?;
    load_config(&path)
}

/// Parse and validate checkpoint text that did not come from a file.
pub fn parse_config(content: &str, format: Format) -> Result<CheckpointConfig, DataLoadError> {
    let origin = Path::new("<inline>");
    let file: CheckpointFile = deserialize_str(content, format, origin)?;
    resolve_checkpoint(file, origin)
}

// ===========================================================================
// Tests
// ===========================================================================
