//! Frame timestamps and their wall-clock labels.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Epoch milliseconds of frame 0.
    pub start_ms: i64,
    /// Offset of the local time zone used for labels.
    pub utc_offset_hours: i32,
    /// `chrono` format string for frame labels.
    pub time_format: String,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start_ms: 0,
            utc_offset_hours: 8,
            time_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

/// Reject label formats chrono cannot render.
pub fn check_time_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::Config(format!("invalid time format {format:?}")));
    }
    Ok(())
}

/// Whole milliseconds between frames, truncated like the frame counter of the
/// source video.
pub fn frame_interval_ms(fps: f64) -> i64 {
    ((1000.0 / fps) as i64).max(1)
}

/// Maps frame numbers to epoch timestamps and labels.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start_ms: i64,
    frame_interval_ms: i64,
    offset: FixedOffset,
    time_format: String,
}

impl FrameClock {
    pub fn new(config: &ClockConfig, fps: f64) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(Error::Config(format!("frame rate must be positive, got {fps}")));
        }
        let offset = FixedOffset::east_opt(config.utc_offset_hours * 3600).ok_or_else(|| {
            Error::Config(format!("UTC offset {}h out of range", config.utc_offset_hours))
        })?;
        check_time_format(&config.time_format)?;
        Ok(Self {
            start_ms: config.start_ms,
            frame_interval_ms: frame_interval_ms(fps),
            offset,
            time_format: config.time_format.clone(),
        })
    }

    pub fn frame_interval_ms(&self) -> i64 {
        self.frame_interval_ms
    }

    pub fn timestamp(&self, frame: u64) -> i64 {
        self.start_ms + frame as i64 * self.frame_interval_ms
    }

    pub fn time_name(&self, timestamp: i64) -> String {
        let Some(utc) = DateTime::from_timestamp_millis(timestamp) else {
            return timestamp.to_string();
        };
        let mut label = String::new();
        let local = utc.with_timezone(&self.offset);
        if write!(label, "{}", local.format(&self.time_format)).is_err() {
            return timestamp.to_string();
        }
        label
    }
}
