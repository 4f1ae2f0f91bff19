//! Placement of the on-screen info label for matched tracks.

use serde::{Deserialize, Serialize};

use crate::fusion::fused_track::FusedTrack;
use crate::geo::ImageSize;
use crate::tracker::Rect;

/// Label size relative to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoBoxStyle {
    pub width_ratio: f32,
    pub height_ratio: f32,
    /// Gap between a label and its box, pixels.
    pub margin: f32,
}

impl Default for InfoBoxStyle {
    fn default() -> Self {
        Self {
            width_ratio: 0.12,
            height_ratio: 0.1,
            margin: 4.0,
        }
    }
}

/// Give every track with AIS data a label box.
///
/// The label sits above the track, flips below it when it would leave the
/// top edge, is clamped into the frame and pushed down past labels already
/// placed. Tracks are visited in the given order, so earlier tracks win.
pub fn place_info_boxes(tracks: &mut [FusedTrack], image: ImageSize, style: &InfoBoxStyle) {
    let (img_w, img_h) = (image.width as f32, image.height as f32);
    let (w, h) = (img_w * style.width_ratio, img_h * style.height_ratio);
    let mut placed: Vec<Rect> = Vec::new();

    for track in tracks.iter_mut() {
        if !track.has_ais() {
            track.info_box = None;
            continue;
        }
        let (cx, _) = track.bbox.center();
        let mut label = Rect::new(cx - w / 2.0, track.bbox.y - h - style.margin, w, h);
        if label.y < 0.0 {
            label.y = track.bbox.bottom() + style.margin;
        }
        label = label.clamp_into(img_w, img_h);

        for _ in 0..=placed.len() {
            let Some(blocker) = placed.iter().find(|p| p.intersects(&label)) else {
                break;
            };
            let moved = Rect::new(label.x, blocker.bottom() + style.margin, w, h)
                .clamp_into(img_w, img_h);
            if moved == label {
                break;
            }
            label = moved;
        }

        placed.push(label);
        track.info_box = Some(label);
    }
}
