//! Camera multi-object tracker with anti-occlusion recovery.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult, AssignmentStrategy, CostMatrix, Detection};
use crate::tracker::rect::Rect;
use crate::tracker::track_arena::TrackArena;
use crate::tracker::visual_track::VisualTrack;

/// Configuration for the [`VisualTracker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Detections at or above this score take part in the first association.
    pub track_thresh: f32,
    /// Detections below this score are ignored entirely.
    pub low_thresh: f32,
    /// Minimum score for an unmatched detection to start a new track.
    pub new_track_thresh: f32,
    /// Maximum cost for a first-stage match.
    pub match_thresh: f32,
    /// Maximum `1 - IoU` for a second-stage (low score) match.
    pub low_match_thresh: f32,
    /// Weight first-stage similarity by detection score.
    pub fuse_score: bool,
    /// Anti-occlusion switch. Off means a track dies on its first missed frame.
    pub anti: bool,
    /// Frames a track may coast on predicted motion when `anti` is on.
    pub anti_tolerance: u32,
    /// Coasting time in seconds; when set it replaces `anti_tolerance` once
    /// the frame rate is known.
    pub anti_rate_s: Option<f32>,
    pub assignment: AssignmentStrategy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_thresh: 0.5,
            low_thresh: 0.1,
            new_track_thresh: 0.6,
            match_thresh: 0.8,
            low_match_thresh: 0.5,
            fuse_score: true,
            anti: true,
            anti_tolerance: 25,
            anti_rate_s: None,
            assignment: AssignmentStrategy::Greedy,
        }
    }
}

impl TrackerConfig {
    /// Frames an unmatched track survives before it is destroyed.
    pub fn occlusion_tolerance(&self) -> u32 {
        if self.anti { self.anti_tolerance } else { 0 }
    }

    /// Derive the tolerance from a duration in seconds at the given frame rate.
    pub fn with_anti_rate(mut self, seconds: f32, frame_rate: f32) -> Self {
        self.anti_tolerance = (seconds * frame_rate).round().max(0.0) as u32;
        self
    }

    /// Copy with `anti_rate_s`, if any, turned into a frame count.
    pub fn for_frame_rate(&self, frame_rate: f32) -> Self {
        match self.anti_rate_s {
            Some(seconds) => self.clone().with_anti_rate(seconds, frame_rate),
            None => self.clone(),
        }
    }
}

pub struct VisualTracker {
    arena: TrackArena,
    frame_id: u64,
    last_timestamp: Option<i64>,
    config: TrackerConfig,
    kalman_filter: KalmanFilter,
}

impl VisualTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            arena: TrackArena::new(),
            frame_id: 0,
            last_timestamp: None,
            config,
            kalman_filter: KalmanFilter::default(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of frames processed so far.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    /// Live tracks ordered by ID.
    pub fn tracks(&self) -> Vec<VisualTrack> {
        self.arena.tracks().cloned().collect()
    }

    /// Advance one frame with this frame's detections.
    ///
    /// Returns the active and occluded tracks ordered by ID.
    pub fn update(&mut self, detections: &[Detection], timestamp: i64) -> Vec<VisualTrack> {
        self.frame_id += 1;
        self.last_timestamp = Some(timestamp);
        let tolerance = self.config.occlusion_tolerance();

        // Step 1: split detections by score
        let (high, low): (Vec<Detection>, Vec<Detection>) = detections
            .iter()
            .filter(|d| d.score > self.config.low_thresh && d.bbox.is_finite())
            .cloned()
            .partition(|d| d.score >= self.config.track_thresh);

        // Step 2: predict every live track to this frame
        let pool = self.arena.live_slots();
        for &slot in &pool {
            if let Some(track) = self.arena.get_mut(slot) {
                track.predict(&self.kalman_filter);
            }
        }

        // Step 3: first association with high score detections
        let first = self.associate(&pool, &high, self.config.match_thresh, self.config.fuse_score);
        for &(i, j) in &first.matches {
            self.apply_match(pool[i], &high[j]);
        }

        // Step 4: remaining tracks against low score detections
        let remaining: Vec<usize> = first.unmatched_tracks.iter().map(|&i| pool[i]).collect();
        let second = self.associate(&remaining, &low, self.config.low_match_thresh, false);
        for &(i, j) in &second.matches {
            self.apply_match(remaining[i], &low[j]);
        }

        for &i in &second.unmatched_tracks {
            if let Some(track) = self.arena.get_mut(remaining[i]) {
                track.mark_missed(tolerance);
                trace!(
                    track_id = track.track_id,
                    occluded_frames = track.occluded_frames,
                    status = ?track.status,
                    "track unmatched"
                );
            }
        }

        // Step 5: new tracks from unmatched confident detections
        for &j in &first.unmatched_detections {
            let det = &high[j];
            if det.score < self.config.new_track_thresh {
                continue;
            }
            let track_id = self.arena.allocate_id();
            let track = VisualTrack::new(track_id, det, &self.kalman_filter, self.frame_id);
            debug!(track_id, frame = self.frame_id, "new visual track");
            self.arena.insert(track);
        }

        let released = self.arena.sweep();
        if !released.is_empty() {
            debug!(frame = self.frame_id, ?released, "visual tracks lost");
        }

        self.tracks()
    }

    fn associate(
        &self,
        slots: &[usize],
        detections: &[Detection],
        thresh: f32,
        fuse_score: bool,
    ) -> AssignmentResult {
        let tracks: Vec<&VisualTrack> = slots.iter().filter_map(|&s| self.arena.get(s)).collect();
        let track_rects: Vec<Rect> = tracks.iter().map(|t| t.rect()).collect();
        let track_ids: Vec<u64> = tracks.iter().map(|t| t.track_id).collect();
        let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();

        let mut costs = CostMatrix::iou_distance(&track_rects, &det_rects);
        if fuse_score {
            costs.fuse_score(detections);
        }
        matching::assign(self.config.assignment, &costs, &track_ids, thresh)
    }

    fn apply_match(&mut self, slot: usize, detection: &Detection) {
        let frame_id = self.frame_id;
        if let Some(track) = self.arena.get_mut(slot) {
            track.update(detection, &self.kalman_filter, frame_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::track_state::TrackStatus;

    fn det(x: f32) -> Detection {
        Detection::new(x, 100.0, x + 80.0, 140.0, 0.9)
    }

    #[test]
    fn test_anti_rate_tolerance() {
        let config = TrackerConfig::default().with_anti_rate(0.4, 25.0);
        assert_eq!(config.occlusion_tolerance(), 10);

        let off = TrackerConfig {
            anti: false,
            ..TrackerConfig::default()
        };
        assert_eq!(off.occlusion_tolerance(), 0);
    }

    #[test]
    fn test_anti_rate_resolved_against_frame_rate() {
        let config = TrackerConfig {
            anti_rate_s: Some(2.0),
            ..TrackerConfig::default()
        };
        assert_eq!(config.for_frame_rate(30.0).occlusion_tolerance(), 60);
        assert_eq!(TrackerConfig::default().for_frame_rate(30.0).anti_tolerance, 25);
    }

    #[test]
    fn test_low_score_detection_keeps_track() {
        let mut tracker = VisualTracker::new(TrackerConfig::default());
        let id = tracker.update(&[det(100.0)], 0)[0].track_id;
        tracker.update(&[det(102.0)], 40);

        let mut weak = det(104.0);
        weak.score = 0.3;
        let tracks = tracker.update(&[weak], 80);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, id);
        assert_eq!(tracks[0].status, TrackStatus::Active);
    }

    #[test]
    fn test_low_score_detection_does_not_spawn() {
        let mut tracker = VisualTracker::new(TrackerConfig::default());
        let mut weak = det(100.0);
        weak.score = 0.55;
        assert!(tracker.update(&[weak], 0).is_empty());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut tracker = VisualTracker::new(TrackerConfig {
            anti: false,
            ..TrackerConfig::default()
        });
        let first = tracker.update(&[det(100.0)], 0)[0].track_id;
        assert!(tracker.update(&[], 40).is_empty());
        let second = tracker.update(&[det(100.0)], 80)[0].track_id;
        assert!(second > first);
    }
}
