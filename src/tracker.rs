mod kalman_filter;
mod matching;
mod rect;
mod track_arena;
mod track_state;
mod visual_track;
mod visual_tracker;

pub use kalman_filter::{KalmanFilter, MotionState};
pub use matching::{AssignmentResult, AssignmentStrategy, CostMatrix, Detection};
pub use rect::{Rect, iou_batch};
pub use track_arena::TrackArena;
pub use track_state::TrackStatus;
pub use visual_track::VisualTrack;
pub use visual_tracker::{TrackerConfig, VisualTracker};
