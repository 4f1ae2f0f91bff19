//! Glue between the fusion stages and the outside world: detector output,
//! video frames and the per-frame driver.

mod builder;
mod detector;
mod frames;
mod pipeline;

pub use builder::{BoxFormat, DetectionBuilder};
pub use detector::{DetectionFile, DetectionSource, IntoDetections};
pub use frames::{Frame, FrameSink, FrameSource, ImageSequenceSink, ImageSequenceSource, TimingSource};
pub use pipeline::{BOX_RECORD_FILE, FrameOutput, FusionPipeline, MATCH_EVENTS_FILE};
