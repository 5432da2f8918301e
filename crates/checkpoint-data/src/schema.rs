//! On-disk shape of a checkpoint file.
//!
//! A file carries a (possibly partial) [`CheckpointConfig`] under `checkpoint`.
//! Instead of listing every lane, it may set `lane_count` and describe one
//! `lane_template`; the loader then generates `LANE 1` through `LANE n`.

use serde::{Deserialize, Serialize};

use checkpoint_core::config::{CheckpointConfig, LaneConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointFile {
    pub checkpoint: CheckpointConfig,
    /// When non-zero, replaces `checkpoint.lanes` with this many copies of
    /// `lane_template`.
    pub lane_count: usize,
    pub lane_template: LaneConfig,
}

impl CheckpointFile {
    pub fn into_config(self) -> CheckpointConfig {
        let mut config = self.checkpoint;
        if self.lane_count > 0 {
            config.lanes = (1..=self.lane_count)
                .map(|n| LaneConfig {
                    name: format!("LANE {n}"),
                    ..self.lane_template.clone()
                })
                .collect();
        }
        config
    }
}

impl From<CheckpointConfig> for CheckpointFile {
    fn from(checkpoint: CheckpointConfig) -> Self {
        Self {
            checkpoint,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_lanes_kept_without_count() {
        let mut checkpoint = CheckpointConfig::default();
        checkpoint.lanes.truncate(1);
        let config = CheckpointFile::from(checkpoint.clone()).into_config();
        assert_eq!(config, checkpoint);
    }

    #[test]
    fn template_overrides_explicit_lanes() {
        let file = CheckpointFile {
            lane_count: 4,
            lane_template: LaneConfig {
                body_scanner_operational: false,
                ..LaneConfig::default()
            },
            ..Default::default()
        };
        let config = file.into_config();
        assert_eq!(config.lanes.len(), 4);
        assert_eq!(config.lanes[3].name, "LANE 4");
        assert!(config.lanes.iter().all(|l| !l.body_scanner_operational));
    }
}
