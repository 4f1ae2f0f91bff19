use serde::{Deserialize, Serialize};

use crate::ais::Mmsi;

/// Per-vessel association outcome sampled once per AIS update interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub timestamp: i64,
    pub mmsi: Mmsi,
    pub track_id: Option<u64>,
    pub matched: bool,
}

/// Whether `timestamp` is the first frame at or after an interval boundary.
///
/// With frames every `frame_interval_ms`, exactly one frame per
/// `interval_ms` satisfies this.
pub fn crosses_sampling_boundary(timestamp: i64, interval_ms: i64, frame_interval_ms: i64) -> bool {
    if interval_ms <= 0 {
        return false;
    }
    timestamp.rem_euclid(interval_ms) < frame_interval_ms.max(1)
}
