use serde::{Deserialize, Serialize};

use crate::geo::calibration::Calibration;
use crate::geo::coords::GeoPoint;
use crate::tracker::Rect;

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64
    }

    pub fn shorter_side(&self) -> u32 {
        self.width.min(self.height)
    }

    /// Size after scaling to `height`, keeping the aspect ratio.
    pub fn scaled_to_height(&self, height: u32) -> ImageSize {
        if self.height == 0 {
            return ImageSize::new(0, height);
        }
        let width = (self.width as f64 * height as f64 / self.height as f64).round() as u32;
        ImageSize::new(width, height)
    }
}

/// Typical hull dimensions used to predict the on-screen extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HullSize {
    pub length_m: f64,
    pub beam_m: f64,
    /// Minimum footprint height as a fraction of its width.
    pub min_aspect: f64,
}

impl Default for HullSize {
    fn default() -> Self {
        Self {
            length_m: 50.0,
            beam_m: 10.0,
            min_aspect: 0.35,
        }
    }
}

/// Image position of one vessel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub x: f32,
    pub y: f32,
    /// Expected on-screen extent of the hull, centred on `(x, y)`.
    pub footprint: Rect,
}

/// Smallest footprint side in pixels.
const MIN_EXTENT_PX: f32 = 4.0;

#[derive(Debug, Clone)]
pub struct GeoProjector {
    calibration: Calibration,
    image: ImageSize,
    hull: HullSize,
}

impl GeoProjector {
    pub fn new(calibration: Calibration, image: ImageSize, hull: HullSize) -> Self {
        Self {
            calibration,
            image,
            hull,
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn image_size(&self) -> ImageSize {
        self.image
    }

    /// Project a vessel at `position` heading `heading_deg`.
    ///
    /// Returns `None` when the vessel is not visible: invalid coordinates, no
    /// image under the calibration, or a point outside the frame.
    pub fn project(&self, position: GeoPoint, heading_deg: f64) -> Option<Projection> {
        if !position.is_valid() {
            return None;
        }
        let center = self.calibration.geo_to_pixel(position)?;
        if !self.image.contains(center.x, center.y) {
            return None;
        }

        let (x, y) = (center.x as f32, center.y as f32);
        let footprint = self.footprint(position, heading_deg, x, y);
        Some(Projection { x, y, footprint })
    }

    /// Bounding box of the projected hull corners, raised to `min_aspect`.
    fn footprint(&self, position: GeoPoint, heading_deg: f64, x: f32, y: f32) -> Rect {
        let heading = if heading_deg.is_finite() { heading_deg } else { 0.0 };
        let (sh, ch) = heading.to_radians().sin_cos();
        let (half_l, half_b) = (self.hull.length_m / 2.0, self.hull.beam_m / 2.0);

        let corners = [(half_l, half_b), (half_l, -half_b), (-half_l, half_b), (-half_l, -half_b)];
        let pixels: Vec<(f32, f32)> = corners
            .iter()
            .map(|&(along, across)| {
                let east = along * sh + across * ch;
                let north = along * ch - across * sh;
                position.offset_meters(east, north)
            })
            .filter_map(|corner| self.calibration.geo_to_pixel(corner))
            .map(|p| (p.x as f32, p.y as f32))
            .collect();

        if pixels.len() < 2 {
            return Rect::from_center(x, y, MIN_EXTENT_PX, MIN_EXTENT_PX);
        }

        let (min_x, max_x, min_y, max_y) = pixels.iter().fold(
            (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
            |(x0, x1, y0, y1), &(px, py)| (x0.min(px), x1.max(px), y0.min(py), y1.max(py)),
        );
        let width = (max_x - min_x).max(MIN_EXTENT_PX);
        let height = (max_y - min_y)
            .max(width * self.hull.min_aspect as f32)
            .max(MIN_EXTENT_PX);
        Rect::from_center(x, y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// 200 000 px per degree, centred on (31.20025, 121.5005).
    fn projector() -> GeoProjector {
        let s = 200_000.0;
        let cal = Calibration::Homography {
            matrix: [
                [s, 0.0, 960.0 - s * 121.5005],
                [0.0, -s, 540.0 + s * 31.20025],
                [0.0, 0.0, 1.0],
            ],
        };
        GeoProjector::new(cal, ImageSize::new(1920, 1080), HullSize::default())
    }

    #[test]
    fn test_project_inside_frame() {
        let p = projector().project(GeoPoint::new(31.2, 121.5), 90.0).unwrap();
        assert_relative_eq!(p.x, 860.0, epsilon = 1e-2);
        assert_relative_eq!(p.y, 590.0, epsilon = 1e-2);
        // 50 m east-west at ~95 km per degree of longitude
        assert!(p.footprint.width > 90.0 && p.footprint.width < 120.0);
        assert!(p.footprint.height >= p.footprint.width * 0.35 - 1e-3);
    }

    #[test]
    fn test_out_of_frame() {
        assert!(projector().project(GeoPoint::new(31.2, 121.49), 0.0).is_none());
        assert!(projector().project(GeoPoint::new(95.0, 121.5), 0.0).is_none());
    }

    #[test]
    fn test_homography_round_trip() {
        let projector = projector();
        let target = GeoPoint::new(31.2003, 121.5011);
        let p = projector.project(target, 0.0).unwrap();
        let back = projector
            .calibration()
            .pixel_to_geo(nalgebra::Point2::new(p.x as f64, p.y as f64))
            .unwrap();
        // f32 pixels limit the precision to ~1e-5 px, i.e. well below 1e-7 deg
        assert_relative_eq!(back.lat, target.lat, epsilon = 1e-7);
        assert_relative_eq!(back.lon, target.lon, epsilon = 1e-7);
    }

    #[test]
    fn test_scaled_to_height() {
        assert_eq!(ImageSize::new(1920, 1080).scaled_to_height(500), ImageSize::new(889, 500));
    }
}
