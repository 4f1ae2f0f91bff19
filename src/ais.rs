//! AIS ingestion and per-vessel state.

mod processor;
mod reader;
mod record;

pub use processor::{AisConfig, AisProcessor, VesselPhase, VesselState};
pub use reader::{AisBatch, parse_csv, read_csv_file};
pub use record::{AisRecord, Mmsi};
