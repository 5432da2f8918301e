//! Engine configuration with the checkpoint's stock defaults.
//!
//! Every field has a serde default so partial config files only override what
//! they mention. [`CheckpointConfig::validate`] is called by the engine before
//! any state is built from a config.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fixed::{Fixed64, SimMillis, f64_to_fixed64};

/// Longest accepted tick.
pub const MAX_TICK_MS: SimMillis = 60_000;
/// Upper bound on every body scan time parameter.
pub const MAX_SCAN_SECS: f64 = 3_600.0;

// ---------------------------------------------------------------------------
// Scan timing
// ---------------------------------------------------------------------------

/// Per-passenger body-scan duration, drawn once when the scan starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyScanTime {
    pub mean_secs: f64,
    pub std_dev_secs: f64,
    /// Samples below this are raised to it.
    pub floor_secs: f64,
}

impl Default for BodyScanTime {
    fn default() -> Self {
        Self {
            mean_secs: 3.0,
            std_dev_secs: 1.0,
            floor_secs: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Lane
// ---------------------------------------------------------------------------

/// Capacities and scanner settings for one security lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    pub name: String,
    pub lane_line_capacity: usize,
    pub bag_drop_line_capacity: usize,
    /// Hard bound of the unload-bay queue, including passengers who finished
    /// unloading and are waiting for room in the body scan line.
    pub bag_drop_unload_capacity: usize,
    /// Passengers that may actively unload at the same time.
    pub bag_unloading_bays: usize,
    pub body_scan_line_capacity: usize,
    pub body_scanner_capacity: usize,
    pub body_scan_time: BodyScanTime,
    pub body_scanner_operational: bool,
    pub bag_scanner_waiting_capacity: usize,
    pub bag_scanner_capacity: usize,
    pub bag_scanner_items_per_minute: u32,
    pub bag_scanner_operational: bool,
    pub bag_off_ramp_capacity: usize,
    pub bag_pickup_area_capacity: usize,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            lane_line_capacity: 10,
            bag_drop_line_capacity: 6,
            bag_drop_unload_capacity: 6,
            bag_unloading_bays: 3,
            body_scan_line_capacity: 6,
            body_scanner_capacity: 1,
            body_scan_time: BodyScanTime::default(),
            body_scanner_operational: true,
            bag_scanner_waiting_capacity: 6,
            bag_scanner_capacity: 3,
            bag_scanner_items_per_minute: 10,
            bag_scanner_operational: true,
            bag_off_ramp_capacity: 100,
            bag_pickup_area_capacity: 100,
        }
    }
}

impl LaneConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn validate(&self, lane: usize) -> Result<(), ConfigError> {
        let capacities = [
            ("lane_line_capacity", self.lane_line_capacity),
            ("bag_drop_line_capacity", self.bag_drop_line_capacity),
            ("bag_drop_unload_capacity", self.bag_drop_unload_capacity),
            ("bag_unloading_bays", self.bag_unloading_bays),
            ("body_scan_line_capacity", self.body_scan_line_capacity),
            ("body_scanner_capacity", self.body_scanner_capacity),
            ("bag_scanner_waiting_capacity", self.bag_scanner_waiting_capacity),
            ("bag_scanner_capacity", self.bag_scanner_capacity),
            ("bag_off_ramp_capacity", self.bag_off_ramp_capacity),
            ("bag_pickup_area_capacity", self.bag_pickup_area_capacity),
        ];
        for (station, capacity) in capacities {
            if capacity == 0 {
                return Err(ConfigError::ZeroCapacity { lane, station });
            }
        }
        if self.bag_unloading_bays > self.bag_drop_unload_capacity {
            return Err(ConfigError::BaysExceedUnloadQueue {
                lane,
                bays: self.bag_unloading_bays,
                capacity: self.bag_drop_unload_capacity,
            });
        }
        if self.bag_scanner_items_per_minute == 0 {
            return Err(ConfigError::ZeroThroughput { lane });
        }
        let t = &self.body_scan_time;
        let finite = t.mean_secs.is_finite() && t.std_dev_secs.is_finite() && t.floor_secs.is_finite();
        if !finite || t.std_dev_secs < 0.0 || t.floor_secs <= 0.0 {
            return Err(ConfigError::InvalidScanTime { lane });
        }
        if [t.mean_secs, t.std_dev_secs, t.floor_secs]
            .iter()
            .any(|&secs| secs > MAX_SCAN_SECS)
        {
            return Err(ConfigError::ScanTimeTooLong { lane });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Passenger profile
// ---------------------------------------------------------------------------

/// Probabilities used when spawning passengers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassengerProfile {
    pub bag_probability: f64,
    pub electronics_probability: f64,
    pub suspicious_item_probability: f64,
    pub liquids_probability: f64,
    pub ambiguous_presentation_probability: f64,
    pub agent_preference_probability: f64,
    /// Codes drawn uniformly for `Passenger::nationality`.
    pub nationalities: Vec<String>,
}

impl Default for PassengerProfile {
    fn default() -> Self {
        Self {
            bag_probability: 0.5,
            electronics_probability: 0.5,
            suspicious_item_probability: 0.1,
            liquids_probability: 0.3,
            ambiguous_presentation_probability: 0.1,
            agent_preference_probability: 0.2,
            nationalities: ["GB", "US", "FR", "DE", "ES", "IT", "IN", "CN", "JP", "BR", "NG", "AU"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl PassengerProfile {
    fn probabilities(&self) -> [(&'static str, f64); 6] {
        [
            ("bag_probability", self.bag_probability),
            ("electronics_probability", self.electronics_probability),
            ("suspicious_item_probability", self.suspicious_item_probability),
            ("liquids_probability", self.liquids_probability),
            ("ambiguous_presentation_probability", self.ambiguous_presentation_probability),
            ("agent_preference_probability", self.agent_preference_probability),
        ]
    }
}

// ---------------------------------------------------------------------------
// Alerting
// ---------------------------------------------------------------------------

/// Scanner response rates: probability of raising each alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertModel {
    pub p_alert_given_suspicious_item: f64,
    pub p_alert_given_no_suspicious_item: f64,
    pub p_alert_given_electronics: f64,
    pub p_alert_given_liquids: f64,
}

impl Default for AlertModel {
    fn default() -> Self {
        Self {
            p_alert_given_suspicious_item: 0.9,
            p_alert_given_no_suspicious_item: 0.05,
            p_alert_given_electronics: 0.8,
            p_alert_given_liquids: 0.7,
        }
    }
}

/// Rules the checkpoint enforces on bag contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityPolicy {
    pub electronics_must_be_separate: bool,
    pub liquids_must_be_in_clear_bag: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            electronics_must_be_separate: true,
            liquids_must_be_in_clear_bag: true,
        }
    }
}

/// Staff help for passengers stuck at an unload bay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnloadAssist {
    /// Unloading longer than this makes the passenger eligible for help.
    pub threshold_ms: SimMillis,
    /// Per-tick probability that help arrives.
    pub chance: f64,
    /// Progress points added when it does.
    pub boost_percent: f64,
}

impl Default for UnloadAssist {
    fn default() -> Self {
        Self {
            threshold_ms: 15_000,
            chance: 0.2,
            boost_percent: 30.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Simulated milliseconds per tick.
    pub tick_ms: SimMillis,
    /// Passengers spawned when a fresh game starts.
    pub initial_passengers: u32,
    /// Passengers per minute.
    pub initial_spawn_rate: u32,
    pub histogram_interval_secs: u64,
    /// Main queue saturation lasting this long ends the game.
    pub game_over_timeout_ms: SimMillis,
    pub main_queue_capacity: usize,
    pub lanes: Vec<LaneConfig>,
    pub passengers: PassengerProfile,
    pub alerts: AlertModel,
    pub policy: SecurityPolicy,
    /// `None` disables staff help at the unload bays.
    pub unload_assist: Option<UnloadAssist>,
    /// Pending events kept per event kind.
    pub event_buffer_capacity: usize,
    /// Most ticks a single delta-mode `advance` call may run.
    pub max_catch_up_ticks: u32,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            initial_passengers: 3,
            initial_spawn_rate: 10,
            histogram_interval_secs: 30,
            game_over_timeout_ms: 10_000,
            main_queue_capacity: 10,
            lanes: vec![LaneConfig::named("LANE 1"), LaneConfig::named("LANE 2")],
            passengers: PassengerProfile::default(),
            alerts: AlertModel::default(),
            policy: SecurityPolicy::default(),
            unload_assist: Some(UnloadAssist::default()),
            event_buffer_capacity: 1024,
            max_catch_up_ticks: 10,
        }
    }
}

impl CheckpointConfig {
    /// Check every constraint the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroTickDuration);
        }
        if self.tick_ms > MAX_TICK_MS {
            return Err(ConfigError::TickTooLong(self.tick_ms));
        }
        if self.histogram_interval_secs == 0 {
            return Err(ConfigError::ZeroHistogramInterval);
        }
        if self.main_queue_capacity == 0 {
            return Err(ConfigError::ZeroMainQueueCapacity);
        }
        if self.max_catch_up_ticks == 0 {
            return Err(ConfigError::ZeroCatchUp);
        }
        if self.lanes.is_empty() {
            return Err(ConfigError::NoLanes);
        }
        for (index, lane) in self.lanes.iter().enumerate() {
            lane.validate(index)?;
        }

        let mut probabilities = self.passengers.probabilities().to_vec();
        probabilities.extend([
            ("p_alert_given_suspicious_item", self.alerts.p_alert_given_suspicious_item),
            ("p_alert_given_no_suspicious_item", self.alerts.p_alert_given_no_suspicious_item),
            ("p_alert_given_electronics", self.alerts.p_alert_given_electronics),
            ("p_alert_given_liquids", self.alerts.p_alert_given_liquids),
        ]);
        if let Some(assist) = &self.unload_assist {
            probabilities.push(("unload_assist.chance", assist.chance));
            if !(0.0..=100.0).contains(&assist.boost_percent) {
                return Err(ConfigError::InvalidAssistBoost(assist.boost_percent));
            }
        }
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        if self.passengers.nationalities.is_empty() {
            return Err(ConfigError::NoNationalities);
        }
        Ok(())
    }

    /// Probability as the engine's fixed-point type.
    pub(crate) fn fixed_probability(p: f64) -> Fixed64 {
        f64_to_fixed64(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(CheckpointConfig::default().validate().is_ok());
    }

    #[test]
    fn defaults_match_stock_checkpoint() {
        let config = CheckpointConfig::default();
        assert_eq!(config.tick_ms, 100);
        assert_eq!(config.main_queue_capacity, 10);
        assert_eq!(config.lanes.len(), 2);
        assert_eq!(config.lanes[0].bag_unloading_bays, 3);
        assert_eq!(config.lanes[0].body_scanner_capacity, 1);
        assert_eq!(config.lanes[0].bag_scanner_capacity, 3);
    }

    #[test]
    fn zero_tick_rejected() {
        let config = CheckpointConfig {
            tick_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickDuration));
    }

    #[test]
    fn zero_station_capacity_rejected() {
        let mut config = CheckpointConfig::default();
        config.lanes[1].body_scan_line_capacity = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroCapacity {
                lane: 1,
                station: "body_scan_line_capacity"
            })
        );
    }

    #[test]
    fn bays_larger_than_unload_queue_rejected() {
        let mut config = CheckpointConfig::default();
        config.lanes[0].bag_unloading_bays = 7;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BaysExceedUnloadQueue { lane: 0, .. })
        ));
    }

    #[test]
    fn probability_out_of_range_rejected() {
        let mut config = CheckpointConfig::default();
        config.passengers.bag_probability = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProbability { name: "bag_probability", .. })
        ));
    }

    #[test]
    fn no_lanes_rejected() {
        let config = CheckpointConfig {
            lanes: Vec::new(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoLanes));
    }

    #[test]
    fn negative_std_dev_rejected() {
        let mut config = CheckpointConfig::default();
        config.lanes[0].body_scan_time.std_dev_secs = -1.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidScanTime { lane: 0 }));
    }

    #[test]
    fn tick_longer_than_a_minute_rejected() {
        let mut config = CheckpointConfig::default();
        config.tick_ms = MAX_TICK_MS;
        assert!(config.validate().is_ok());
        config.tick_ms = MAX_TICK_MS + 1;
        assert_eq!(config.validate(), Err(ConfigError::TickTooLong(MAX_TICK_MS + 1)));
    }

    #[test]
    fn scan_time_longer_than_an_hour_rejected() {
        let mut config = CheckpointConfig::default();
        config.lanes[0].body_scan_time.mean_secs = MAX_SCAN_SECS;
        assert!(config.validate().is_ok());
        config.lanes[0].body_scan_time.mean_secs = 30_000.0;
        assert_eq!(config.validate(), Err(ConfigError::ScanTimeTooLong { lane: 0 }));

        let mut config = CheckpointConfig::default();
        config.lanes[0].body_scan_time.std_dev_secs = 1e9;
        assert_eq!(config.validate(), Err(ConfigError::ScanTimeTooLong { lane: 0 }));
    }

    #[test]
    fn assist_boost_beyond_full_progress_rejected() {
        let mut config = CheckpointConfig::default();
        let boost = |config: &mut CheckpointConfig, percent: f64| {
            if let Some(assist) = config.unload_assist.as_mut() {
                assist.boost_percent = percent;
            }
        };
        boost(&mut config, 100.0);
        assert!(config.validate().is_ok());
        boost(&mut config, 1e12);
        assert_eq!(config.validate(), Err(ConfigError::InvalidAssistBoost(1e12)));
        boost(&mut config, f64::NAN);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidAssistBoost(_))));
        boost(&mut config, -1.0);
        assert!(config.validate().is_err());
    }
}
