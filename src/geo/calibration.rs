//! Fixed camera calibrations mapping the sea surface to image pixels.

use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::coords::GeoPoint;
use crate::geo::projector::ImageSize;

/// Calibration supplied with a video/camera pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Calibration {
    /// Plane homography from `(lon, lat, 1)` to homogeneous pixel coordinates.
    Homography { matrix: [[f64; 3]; 3] },
    /// Pinhole camera looking at a flat sea.
    Pinhole(PinholeCamera),
}

/// Pinhole camera mounted above the water.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinholeCamera {
    pub lat: f64,
    pub lon: f64,
    /// Lens height above the water line, metres.
    pub height_m: f64,
    /// Optical axis bearing, degrees clockwise from north.
    pub yaw_deg: f64,
    /// Downward tilt of the optical axis, degrees.
    pub pitch_deg: f64,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

/// Right, down and forward axes of the camera in `(east, north, up)`.
struct CameraAxes {
    right: Vector3<f64>,
    down: Vector3<f64>,
    forward: Vector3<f64>,
}

impl PinholeCamera {
    fn origin(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    fn axes(&self) -> CameraAxes {
        let (sy, cy) = self.yaw_deg.to_radians().sin_cos();
        let (sp, cp) = self.pitch_deg.to_radians().sin_cos();
        CameraAxes {
            right: Vector3::new(cy, -sy, 0.0),
            down: Vector3::new(-sp * sy, -sp * cy, -cp),
            forward: Vector3::new(cp * sy, cp * cy, -sp),
        }
    }

    fn geo_to_pixel(&self, point: GeoPoint) -> Option<Point2<f64>> {
        let (east, north) = self.origin().local_offset(&point);
        let d = Vector3::new(east, north, -self.height_m);
        let axes = self.axes();

        let z = d.dot(&axes.forward);
        if z <= 1e-6 {
            return None;
        }
        let x = d.dot(&axes.right) / z;
        let y = d.dot(&axes.down) / z;
        Some(Point2::new(self.cx + self.fx * x, self.cy + self.fy * y))
    }

    fn pixel_to_geo(&self, pixel: Point2<f64>) -> Option<GeoPoint> {
        let axes = self.axes();
        let xn = (pixel.x - self.cx) / self.fx;
        let yn = (pixel.y - self.cy) / self.fy;
        let ray = axes.right * xn + axes.down * yn + axes.forward;

        // Rays at or above the horizon never reach the water.
        if ray.z >= -1e-9 {
            return None;
        }
        let t = self.height_m / -ray.z;
        Some(self.origin().offset_meters(ray.x * t, ray.y * t))
    }

    fn check(&self) -> Result<()> {
        let values = [
            self.lat,
            self.lon,
            self.height_m,
            self.yaw_deg,
            self.pitch_deg,
            self.fx,
            self.fy,
            self.cx,
            self.cy,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidCalibration("non-finite camera parameter".into()));
        }
        if self.height_m <= 0.0 {
            return Err(Error::InvalidCalibration(format!(
                "camera height must be positive, got {}",
                self.height_m
            )));
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(Error::InvalidCalibration("focal lengths must be positive".into()));
        }
        Ok(())
    }
}

impl Calibration {
    fn homography(matrix: &[[f64; 3]; 3]) -> Matrix3<f64> {
        Matrix3::from_fn(|i, j| matrix[i][j])
    }

    /// Project a sea-surface point to pixels.
    ///
    /// `None` means the point has no image (behind the camera or on the
    /// homography's line at infinity); it says nothing about frame bounds.
    pub fn geo_to_pixel(&self, point: GeoPoint) -> Option<Point2<f64>> {
        let pixel = match self {
            Calibration::Homography { matrix } => {
                let p = Self::homography(matrix) * Vector3::new(point.lon, point.lat, 1.0);
                if p.z.abs() < 1e-12 {
                    return None;
                }
                Point2::new(p.x / p.z, p.y / p.z)
            }
            Calibration::Pinhole(camera) => camera.geo_to_pixel(point)?,
        };
        (pixel.x.is_finite() && pixel.y.is_finite()).then_some(pixel)
    }

    /// Inverse of [`Calibration::geo_to_pixel`] for pixels showing water.
    pub fn pixel_to_geo(&self, pixel: Point2<f64>) -> Option<GeoPoint> {
        let point = match self {
            Calibration::Homography { matrix } => {
                let inv = Self::homography(matrix).try_inverse()?;
                let p = inv * Vector3::new(pixel.x, pixel.y, 1.0);
                if p.z.abs() < 1e-12 {
                    return None;
                }
                GeoPoint::new(p.y / p.z, p.x / p.z)
            }
            Calibration::Pinhole(camera) => camera.pixel_to_geo(pixel)?,
        };
        (point.lat.is_finite() && point.lon.is_finite()).then_some(point)
    }

    /// Reject calibrations that cannot place anything in the image.
    ///
    /// Besides parameter sanity, a 5x5 grid of pixels is sent to the sea and
    /// back; if no probe survives the round trip inside the frame the
    /// calibration is unusable.
    pub fn validate(&self, image: ImageSize) -> Result<()> {
        match self {
            Calibration::Homography { matrix } => {
                let h = Self::homography(matrix);
                if h.iter().any(|v| !v.is_finite()) {
                    return Err(Error::InvalidCalibration("non-finite homography entry".into()));
                }
                if h.try_inverse().is_none() {
                    return Err(Error::InvalidCalibration("homography is singular".into()));
                }
            }
            Calibration::Pinhole(camera) => camera.check()?,
        }

        let (w, h) = (image.width as f64, image.height as f64);
        let survivors = (0..5)
            .flat_map(|i| (0..5).map(move |j| (i as f64, j as f64)))
            .map(|(i, j)| Point2::new(w * (i + 0.5) / 5.0, h * (j + 0.5) / 5.0))
            .filter_map(|px| self.pixel_to_geo(px))
            .filter_map(|geo| self.geo_to_pixel(geo))
            .filter(|px| image.contains(px.x, px.y))
            .count();

        if survivors == 0 {
            return Err(Error::InvalidCalibration(
                "no image point maps to the sea surface and back".into(),
            ));
        }
        Ok(())
    }
}
