use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

pub type Mmsi = u32;

/// One decoded AIS position report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AisRecord {
    pub mmsi: Mmsi,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub lat: f64,
    pub lon: f64,
    /// Speed over ground, knots.
    pub sog: f64,
    /// Course over ground, degrees clockwise from north.
    pub cog: f64,
    /// True heading in degrees, when the transponder reports one.
    pub heading: Option<f64>,
}

impl AisRecord {
    pub fn new(mmsi: Mmsi, timestamp: i64, lat: f64, lon: f64, sog: f64, cog: f64) -> Self {
        Self {
            mmsi,
            timestamp,
            lat,
            lon,
            sog,
            cog,
            heading: None,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// Orientation of the hull: heading if known, otherwise course.
    pub fn bearing(&self) -> f64 {
        self.heading.unwrap_or(self.cog)
    }
}
