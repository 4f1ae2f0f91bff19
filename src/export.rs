//! Structured per-frame record of the fused tracks.
//!
//! The layout is consumed by external viewers, so field names are fixed:
//!
//! ```json
//! { "fps": 25, "original_size": [1920, 1080], "display_size": [889, 500],
//!   "frames": [{ "frame_num": 0, "timestamp": 0, "time_name": "...",
//!                "boxes": [{ "id": 1, "box": [x1, y1, x2, y2], "has_ais": true,
//!                            "ais_data": { "mmsi": 1, "sog": 0.0, "cog": 0.0,
//!                                          "lat": 0.0, "lon": 0.0 },
//!                            "inf_box": [x1, y1, x2, y2], "color": [204, 204, 51] }] }] }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::fusion::{AisLink, FusedTrack, MatchEvent};
use crate::geo::ImageSize;
use crate::render::box_color;

/// Round to the 5 decimals kept in the exported record.
pub fn round5(value: f64) -> f64 {
    (value * 1e5).round() / 1e5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AisData {
    pub mmsi: u32,
    pub sog: f64,
    pub cog: f64,
    pub lat: f64,
    pub lon: f64,
}

impl From<&AisLink> for AisData {
    fn from(link: &AisLink) -> Self {
        Self {
            mmsi: link.mmsi,
            sog: round5(link.sog),
            cog: round5(link.cog),
            lat: round5(link.lat),
            lon: round5(link.lon),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    pub id: u64,
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
    pub has_ais: bool,
    pub ais_data: Option<AisData>,
    pub inf_box: Option<[i32; 4]>,
    pub color: [u8; 3],
}

impl From<&FusedTrack> for BoxRecord {
    fn from(track: &FusedTrack) -> Self {
        Self {
            id: track.track_id,
            bbox: track.bbox.to_pixel_tlbr(),
            has_ais: track.has_ais(),
            ais_data: track.ais.as_ref().map(AisData::from),
            inf_box: track.info_box.map(|r| r.to_pixel_tlbr()),
            color: box_color(track),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_num: u64,
    pub timestamp: i64,
    pub time_name: String,
    pub boxes: Vec<BoxRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub fps: u32,
    pub original_size: [u32; 2],
    pub display_size: [u32; 2],
    pub frames: Vec<FrameRecord>,
}

/// Accumulates frame records for one run.
#[derive(Debug, Clone)]
pub struct BoxExporter {
    record: StreamRecord,
}

impl BoxExporter {
    pub fn new(fps: u32, original: ImageSize, display: ImageSize) -> Self {
        Self {
            record: StreamRecord {
                fps,
                original_size: [original.width, original.height],
                display_size: [display.width, display.height],
                frames: Vec::new(),
            },
        }
    }

    pub fn push_frame(&mut self, frame_num: u64, timestamp: i64, time_name: &str, tracks: &[FusedTrack]) {
        self.record.frames.push(FrameRecord {
            frame_num,
            timestamp,
            time_name: time_name.to_string(),
            boxes: tracks.iter().map(BoxRecord::from).collect(),
        });
    }

    pub fn record(&self) -> &StreamRecord {
        &self.record
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        write_pretty(path.as_ref(), &self.record)?;
        info!(
            path = %path.as_ref().display(),
            frames = self.record.frames.len(),
            "wrote box record"
        );
        Ok(())
    }
}

/// Write the sampled association log as a JSON array.
pub fn write_match_events(path: impl AsRef<Path>, events: &[MatchEvent]) -> Result<()> {
    write_pretty(path.as_ref(), &events)
}

fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|source| Error::Output {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{Rect, TrackStatus};

    fn matched() -> FusedTrack {
        FusedTrack {
            track_id: 3,
            bbox: Rect::from_tlbr(100.4, 200.6, 180.0, 240.0),
            status: TrackStatus::Active,
            ais: Some(AisLink {
                mmsi: 123456789,
                sog: 10.123456,
                cog: 90.0,
                lat: 31.2000049,
                lon: 121.5,
            }),
            info_box: Some(Rect::new(80.0, 90.0, 230.0, 108.0)),
        }
    }

    #[test]
    fn test_box_record_fields() {
        let value = serde_json::to_value(BoxRecord::from(&matched())).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["box"], serde_json::json!([100, 201, 180, 240]));
        assert_eq!(value["has_ais"], true);
        assert_eq!(value["ais_data"]["sog"], 10.12346);
        assert_eq!(value["ais_data"]["lat"], 31.2);
        assert_eq!(value["inf_box"], serde_json::json!([80, 90, 310, 198]));
        assert_eq!(value["color"], serde_json::json!([204, 204, 51]));
    }

    #[test]
    fn test_visual_only_uses_nulls() {
        let track = FusedTrack {
            ais: None,
            info_box: None,
            ..matched()
        };
        let value = serde_json::to_value(BoxRecord::from(&track)).unwrap();
        assert!(value["ais_data"].is_null());
        assert!(value["inf_box"].is_null());
        assert_eq!(value["color"], serde_json::json!([0, 0, 255]));
    }

    #[test]
    fn test_stream_layout() {
        let mut exporter = BoxExporter::new(25, ImageSize::new(1920, 1080), ImageSize::new(889, 500));
        exporter.push_frame(0, 0, "1970-01-01 08:00:00", &[matched()]);
        let value = serde_json::to_value(exporter.record()).unwrap();
        assert_eq!(value["fps"], 25);
        assert_eq!(value["original_size"], serde_json::json!([1920, 1080]));
        assert_eq!(value["display_size"], serde_json::json!([889, 500]));
        assert_eq!(value["frames"][0]["time_name"], "1970-01-01 08:00:00");
        assert_eq!(value["frames"][0]["boxes"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_unwritable_path_is_output_error() {
        let exporter = BoxExporter::new(25, ImageSize::new(10, 10), ImageSize::new(10, 10));
        let path = std::env::temp_dir()
            .join("sorvf-missing-dir")
            .join("nested")
            .join("bbox_data.json");
        assert!(matches!(exporter.write_json(&path), Err(Error::Output { .. })));
    }
}
