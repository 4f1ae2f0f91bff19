//! Association of AIS vessels with camera tracks.

mod binding;
mod engine;
mod events;
mod fused_track;
mod layout;

pub use binding::{BindingTable, FusionBinding};
pub use engine::{DEFAULT_BINDING_GRACE_MS, FusionConfig, FusionEngine, FusionOutcome, fuse};
pub use events::{MatchEvent, crosses_sampling_boundary};
pub use fused_track::{AisLink, FusedTrack};
pub use layout::{InfoBoxStyle, place_info_boxes};
