//! AIS and camera vessel trajectory fusion.
//!
//! Per frame, AIS reports are dead-reckoned and projected into the image,
//! detector boxes are tracked with a ByteTrack-style tracker, and the two are
//! associated into one list of [`FusedTrack`]s carrying both pixel location
//! and vessel identity.

pub mod ais;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod fusion;
pub mod geo;
pub mod integration;
pub mod render;
pub mod tracker;

pub use ais::{AisProcessor, AisRecord, Mmsi, VesselState};
pub use clock::{ClockConfig, FrameClock};
pub use config::SorvfConfig;
pub use error::{Error, Result};
pub use export::{BoxExporter, StreamRecord};
pub use fusion::{FusedTrack, FusionConfig, FusionEngine};
pub use geo::{Calibration, GeoPoint, GeoProjector, ImageSize};
pub use integration::{DetectionFile, DetectionSource, FusionPipeline};
pub use render::{RenderConfig, Renderer};
pub use tracker::{Detection, Rect, TrackerConfig, VisualTrack, VisualTracker};
