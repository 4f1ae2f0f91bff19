//! Run configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ais::AisConfig;
use crate::clock::{ClockConfig, check_time_format};
use crate::error::{Error, Result};
use crate::fusion::FusionConfig;
use crate::geo::Calibration;
use crate::render::RenderConfig;
use crate::tracker::TrackerConfig;

/// Everything a run needs besides its inputs.
///
/// Only `calibration` is required in the JSON file; every other section
/// falls back to its defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SorvfConfig {
    pub calibration: Calibration,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub ais: AisConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub clock: ClockConfig,
}

impl SorvfConfig {
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            tracker: TrackerConfig::default(),
            ais: AisConfig::default(),
            fusion: FusionConfig::default(),
            render: RenderConfig::default(),
            clock: ClockConfig::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Reject values that no run could use.
    pub fn check(&self) -> Result<()> {
        let t = &self.tracker;
        if !(0.0..=1.0).contains(&t.low_thresh) || t.low_thresh > t.track_thresh {
            return Err(Error::Config(format!(
                "tracker thresholds out of order: low {} > track {}",
                t.low_thresh, t.track_thresh
            )));
        }
        if self.ais.horizon_ms <= 0 {
            return Err(Error::Config("ais.horizon_ms must be positive".into()));
        }
        if self.fusion.grace_ms < 0 || self.fusion.binding_retention_ms < 0 {
            return Err(Error::Config("fusion windows must not be negative".into()));
        }
        if self.fusion.max_distance.is_some_and(|d| d.is_nan() || d <= 0.0) {
            return Err(Error::Config("fusion.max_distance must be positive".into()));
        }
        if self.render.display_height == 0 {
            return Err(Error::Config("render.display_height must be positive".into()));
        }
        if self.tracker.anti_rate_s.is_some_and(|s| s.is_nan() || s < 0.0) {
            return Err(Error::Config("tracker.anti_rate_s must not be negative".into()));
        }
        check_time_format(&self.clock.time_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let json = r#"{
            "calibration": { "kind": "homography",
                             "matrix": [[1, 0, 0], [0, 1, 0], [0, 0, 1]] },
            "fusion": { "grace_ms": 40 }
        }"#;
        let config = SorvfConfig::from_json_str(json).unwrap();
        assert_eq!(config.fusion.grace_ms, 40);
        assert_eq!(config.fusion.sample_interval_ms, 1000);
        assert_eq!(config.tracker, TrackerConfig::default());
        assert_eq!(config.clock.utc_offset_hours, 8);
        assert_eq!(config.render.display_height, 500);
    }

    #[test]
    fn test_missing_calibration_is_rejected() {
        assert!(matches!(
            SorvfConfig::from_json_str(r#"{ "tracker": {} }"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let json = r#"{
            "calibration": { "kind": "homography",
                             "matrix": [[1, 0, 0], [0, 1, 0], [0, 0, 1]] },
            "ais": { "horizon_ms": 0 }
        }"#;
        assert!(matches!(SorvfConfig::from_json_str(json), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_time_format_is_rejected() {
        let json = r#"{
            "calibration": { "kind": "homography",
                             "matrix": [[1, 0, 0], [0, 1, 0], [0, 0, 1]] },
            "clock": { "time_format": "%Y-%Q" }
        }"#;
        assert!(matches!(SorvfConfig::from_json_str(json), Err(Error::Config(_))));
    }
}
