use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle stored as top-left corner plus size.
///
/// Detector output arrives as TLBR (`x1, y1, x2, y2`), the Kalman filter works
/// in XYAH (`cx, cy, w/h, h`), and the exported record uses integer TLBR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Rectangle of the given size centred on `(cx, cy)`.
    #[inline]
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    #[inline]
    pub fn from_xyah(cx: f32, cy: f32, aspect_ratio: f32, height: f32) -> Self {
        Self::from_center(cx, cy, aspect_ratio * height, height)
    }

    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    /// Integer TLBR as written to the exported record.
    pub fn to_pixel_tlbr(&self) -> [i32; 4] {
        let [x1, y1, x2, y2] = self.to_tlbr();
        [
            x1.round() as i32,
            y1.round() as i32,
            x2.round() as i32,
            y2.round() as i32,
        ]
    }

    #[inline]
    pub fn to_xyah(&self) -> [f32; 4] {
        let (cx, cy) = self.center();
        let aspect_ratio = if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        };
        [cx, cy, aspect_ratio, self.height]
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Intersection over union; zero for degenerate rectangles.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter_area = self.intersection_area(other);
        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }

    pub fn intersection_area(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection_area(other) > 0.0
    }

    /// Euclidean distance between the centre of this rectangle and a point.
    pub fn center_distance(&self, px: f32, py: f32) -> f32 {
        let (cx, cy) = self.center();
        ((cx - px).powi(2) + (cy - py).powi(2)).sqrt()
    }

    /// Shift the rectangle so it lies inside `[0, width] x [0, height]`.
    ///
    /// A rectangle larger than the bounds is pinned to the top-left corner.
    pub fn clamp_into(&self, width: f32, height: f32) -> Rect {
        let x = self.x.min(width - self.width).max(0.0);
        let y = self.y.min(height - self.height).max(0.0);
        Rect::new(x, y, self.width, self.height)
    }
}

/// IoU matrix of shape `(boxes_a.len(), boxes_b.len())`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    let mut ious = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            ious[[i, j]] = a.iou(b);
        }
    }
    ious
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_conversions() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);

        let xyah = rect.to_xyah();
        assert_eq!(xyah[0], 25.0);
        assert_eq!(xyah[1], 40.0);
        assert!((xyah[2] - 0.75).abs() < 1e-6);
        assert_eq!(xyah[3], 40.0);

        let back = Rect::from_xyah(xyah[0], xyah[1], xyah[2], xyah[3]);
        assert!((back.x - 10.0).abs() < 1e-5);
        assert!((back.width - 30.0).abs() < 1e-5);
    }

    #[test]
    fn test_pixel_tlbr_rounds() {
        let rect = Rect::from_tlbr(10.4, 19.6, 40.5, 60.2);
        assert_eq!(rect.to_pixel_tlbr(), [10, 20, 41, 60]);
    }

    #[test]
    fn test_iou() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        // 25 / (100 + 100 - 25)
        assert!((a.iou(&b) - 25.0 / 175.0).abs() < 1e-6);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&Rect::new(20.0, 20.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_clamp_into() {
        let r = Rect::new(-5.0, 95.0, 20.0, 10.0).clamp_into(100.0, 100.0);
        assert_eq!(r, Rect::new(0.0, 90.0, 20.0, 10.0));
    }

    #[test]
    fn test_center_distance() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!((r.center_distance(8.0, 9.0) - 5.0).abs() < 1e-6);
    }
}
