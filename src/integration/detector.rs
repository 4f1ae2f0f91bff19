//! Per-frame detector output.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use image::RgbImage;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::integration::builder::{BoxFormat, DetectionBuilder};
use crate::tracker::Detection;

/// Anything that yields detector boxes for a frame.
///
/// The detector model itself lives outside this crate; implementations
/// either run one on `image` or replay recorded output by `frame_num`.
pub trait DetectionSource {
    type Error;

    fn detect(&mut self, frame_num: u64, image: Option<&RgbImage>) -> Result<Vec<Detection>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
pub trait IntoDetections {
    fn into_detections(self, format: BoxFormat) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self, _format: BoxFormat) -> Vec<Detection> {
        self
    }
}

/// Rows of `[a, b, c, d, score]`.
impl IntoDetections for Vec<[f32; 5]> {
    fn into_detections(self, format: BoxFormat) -> Vec<Detection> {
        self.into_iter()
            .map(|[a, b, c, d, score]| DetectionBuilder::new().raw(format, [a, b, c, d]).score(score).build())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct FrameEntry {
    frame: u64,
    boxes: Vec<[f32; 5]>,
}

/// Recorded detector output, JSON `[{"frame": n, "boxes": [[x1, y1, x2, y2, score], ...]}]`.
///
/// Frames missing from the file have no detections.
#[derive(Debug, Clone, Default)]
pub struct DetectionFile {
    frames: BTreeMap<u64, Vec<Detection>>,
}

impl DetectionFile {
    pub fn from_json_str(json: &str, format: BoxFormat) -> Result<Self> {
        let entries: Vec<FrameEntry> = serde_json::from_str(json)?;
        let mut frames: BTreeMap<u64, Vec<Detection>> = BTreeMap::new();
        for entry in entries {
            let detections = entry.boxes.into_detections(format);
            let (valid, invalid): (Vec<_>, Vec<_>) =
                detections.into_iter().partition(|d| d.bbox.is_finite() && d.bbox.area() > 0.0);
            if !invalid.is_empty() {
                warn!(frame = entry.frame, dropped = invalid.len(), "skipping degenerate detector boxes");
            }
            frames.entry(entry.frame).or_default().extend(valid);
        }
        Ok(Self { frames })
    }

    pub fn from_json_file(path: impl AsRef<Path>, format: BoxFormat) -> Result<Self> {
        let path = path.as_ref();
        let file = Self::from_json_str(&fs::read_to_string(path)?, format)?;
        info!(path = %path.display(), frames = file.frames.len(), "loaded detections");
        Ok(file)
    }

    /// One past the last frame that has an entry.
    pub fn frame_count(&self) -> u64 {
        self.frames.keys().next_back().map_or(0, |last| last + 1)
    }

    pub fn get(&self, frame_num: u64) -> &[Detection] {
        self.frames.get(&frame_num).map(Vec::as_slice).unwrap_or_default()
    }
}

impl DetectionSource for DetectionFile {
    type Error = Error;

    fn detect(&mut self, frame_num: u64, _image: Option<&RgbImage>) -> Result<Vec<Detection>> {
        Ok(self.get(frame_num).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_file() {
        let json = r#"[
            {"frame": 0, "boxes": [[10, 20, 50, 80, 0.9], [0, 0, 0, 0, 0.8]]},
            {"frame": 3, "boxes": []}
        ]"#;
        let mut file = DetectionFile::from_json_str(json, BoxFormat::Tlbr).unwrap();
        assert_eq!(file.frame_count(), 4);
        let frame0 = file.detect(0, None).unwrap();
        assert_eq!(frame0.len(), 1);
        assert_eq!(frame0[0].score, 0.9);
        assert!(file.detect(1, None).unwrap().is_empty());
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            DetectionFile::from_json_str(r#"[{"frame": 0}]"#, BoxFormat::Tlbr),
            Err(Error::Json(_))
        ));
    }
}
