use serde::{Deserialize, Serialize};

/// Lifecycle status of a visual track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackStatus {
    /// Matched to a detection this frame.
    #[default]
    Active,
    /// Unmatched, still reported from predicted motion.
    Occluded,
    /// Occlusion tolerance exceeded; the slot is freed at the end of the frame.
    Lost,
}

impl TrackStatus {
    /// Whether the track takes part in association and output.
    pub fn is_alive(self) -> bool {
        !matches!(self, TrackStatus::Lost)
    }
}
