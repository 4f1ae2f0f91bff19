//! A single camera track.

use crate::tracker::kalman_filter::{KalmanFilter, MotionState};
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackStatus;

#[derive(Debug, Clone)]
pub struct VisualTrack {
    /// Stable identifier, never reused within one tracker.
    pub track_id: u64,
    pub status: TrackStatus,
    /// Score of the last matched detection.
    pub score: f32,
    /// Frame the track was created on.
    pub start_frame: u64,
    /// Last frame a detection was matched.
    pub last_matched_frame: u64,
    /// Consecutive frames without a matched detection.
    pub occluded_frames: u32,
    pub motion: MotionState,
    /// Last observed detector box.
    pub observed: Rect,
}

impl VisualTrack {
    pub(crate) fn new(
        track_id: u64,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
        frame_id: u64,
    ) -> Self {
        Self {
            track_id,
            status: TrackStatus::Active,
            score: detection.score,
            start_frame: frame_id,
            last_matched_frame: frame_id,
            occluded_frames: 0,
            motion: kalman_filter.initiate(&detection.bbox),
            observed: detection.bbox,
        }
    }

    /// Current box: the filtered estimate, or the predicted one while occluded.
    pub fn rect(&self) -> Rect {
        let rect = self.motion.rect();
        if rect.is_finite() { rect } else { self.observed }
    }

    pub fn is_occluded(&self) -> bool {
        self.status == TrackStatus::Occluded
    }

    pub(crate) fn predict(&mut self, kalman_filter: &KalmanFilter) {
        self.motion = kalman_filter.predict(&self.motion, self.status != TrackStatus::Active);
    }

    pub(crate) fn update(&mut self, detection: &Detection, kalman_filter: &KalmanFilter, frame_id: u64) {
        self.motion = match kalman_filter.update(&self.motion, &detection.bbox) {
            Some(state) => state,
            None => kalman_filter.initiate(&detection.bbox),
        };
        self.observed = detection.bbox;
        self.score = detection.score;
        self.last_matched_frame = frame_id;
        self.occluded_frames = 0;
        self.status = TrackStatus::Active;
    }

    /// Record one more unmatched frame; the track is lost once `tolerance` is exceeded.
    pub(crate) fn mark_missed(&mut self, tolerance: u32) {
        self.occluded_frames += 1;
        self.status = if self.occluded_frames > tolerance {
            TrackStatus::Lost
        } else {
            TrackStatus::Occluded
        };
    }
}
