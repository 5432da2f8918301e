use serde::Deserialize;
use std::path::Path;

use crate::error::DemoError;

/// Top-level manifest listing all demo scenarios.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioManifest {
    pub title: String,
    pub description: String,
    pub scenarios: Vec<ScenarioEntry>,
}

/// An entry in the manifest pointing to a scenario directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    /// Relative path from the scenarios directory to the scenario directory.
    pub path: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Load the scenario manifest from a `manifest.ron` file.
pub fn load_manifest(scenarios_dir: &Path) -> Result<ScenarioManifest, DemoError> {
    let path = scenarios_dir.join("manifest.ron");
    let content = std::fs::read_to_string(&path)?;
    ron::from_str(&content).map_err(|e| DemoError::Parse {
        file: path,
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_manifest() {
        let input = r#"(
            title: "Checkpoint Scenarios",
            description: "Security checkpoint runs under different loads.",
            scenarios: [
                (
                    id: "rush_hour",
                    title: "Rush Hour",
                    summary: "Four lanes against a heavy spawn rate.",
                    path: "rush_hour",
                    tags: ["load"],
                ),
            ],
        )"#;

        let manifest: ScenarioManifest = ron::from_str(input).unwrap();
        assert_eq!(manifest.title, "Checkpoint Scenarios");
        assert_eq!(manifest.scenarios.len(), 1);
        assert_eq!(manifest.scenarios[0].id, "rush_hour");
        assert_eq!(manifest.scenarios[0].tags, ["load"]);
    }

    #[test]
    fn load_manifest_from_file() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
        let manifest = load_manifest(&dir).unwrap();
        assert!(!manifest.title.is_empty());
        assert!(!manifest.scenarios.is_empty());
    }

    #[test]
    fn missing_manifest_is_io_error() {
        let err = load_manifest(Path::new("/nonexistent")).unwrap_err();
        assert!(matches!(err, DemoError::Io(_)));
    }
}
