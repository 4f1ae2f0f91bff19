//! Builder for creating `Detection` values from the box layouts detectors emit.

use serde::{Deserialize, Serialize};

use crate::tracker::Detection;

/// Coordinate layout of a raw detector box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxFormat {
    /// `x1, y1, x2, y2`
    #[default]
    Tlbr,
    /// `center_x, center_y, width, height`
    Xywh,
    /// `left, top, width, height`
    Tlwh,
}

#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.tlbr(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(self, left: f32, top: f32, w: f32, h: f32) -> Self {
        self.tlbr(left, top, left + w, top + h)
    }

    /// Set the box from four raw values in `format`.
    pub fn raw(self, format: BoxFormat, [a, b, c, d]: [f32; 4]) -> Self {
        match format {
            BoxFormat::Tlbr => self.tlbr(a, b, c, d),
            BoxFormat::Xywh => self.xywh(a, b, c, d),
            BoxFormat::Tlwh => self.tlwh(a, b, c, d),
        }
    }

    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn build(self) -> Detection {
        Detection::new(self.x1, self.y1, self.x2, self.y2, self.score)
    }
}
