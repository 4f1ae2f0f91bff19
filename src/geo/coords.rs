use serde::{Deserialize, Serialize};

/// Mean earth radius used for local flat-earth conversions.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const KNOT_TO_MPS: f64 = 0.514_444;

/// WGS84 latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Offset of `other` from `self` in metres as `(east, north)`.
    ///
    /// Equirectangular approximation; accurate to well under a metre over the
    /// few kilometres a harbour camera covers.
    pub fn local_offset(&self, other: &GeoPoint) -> (f64, f64) {
        let east = (other.lon - self.lon).to_radians() * self.lat.to_radians().cos() * EARTH_RADIUS_M;
        let north = (other.lat - self.lat).to_radians() * EARTH_RADIUS_M;
        (east, north)
    }

    /// Point displaced by `(east, north)` metres.
    pub fn offset_meters(&self, east: f64, north: f64) -> GeoPoint {
        let lat = self.lat + (north / EARTH_RADIUS_M).to_degrees();
        let lon = self.lon + (east / (EARTH_RADIUS_M * self.lat.to_radians().cos())).to_degrees();
        GeoPoint { lat, lon }
    }
}

/// Dead-reckon a position along course over ground.
///
/// `sog` is in knots, `cog` in degrees clockwise from north. Negative elapsed
/// time is treated as zero.
pub fn dead_reckon(origin: GeoPoint, sog: f64, cog: f64, elapsed_ms: i64) -> GeoPoint {
    if elapsed_ms <= 0 || !sog.is_finite() || !cog.is_finite() {
        return origin;
    }
    let distance = sog * KNOT_TO_MPS * elapsed_ms as f64 / 1000.0;
    let course = cog.to_radians();
    origin.offset_meters(distance * course.sin(), distance * course.cos())
}
