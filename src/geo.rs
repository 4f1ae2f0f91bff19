//! Geodetic helpers and the geodetic-to-pixel projection.

mod calibration;
mod coords;
mod projector;

pub use calibration::{Calibration, PinholeCamera};
pub use coords::{EARTH_RADIUS_M, GeoPoint, KNOT_TO_MPS, dead_reckon};
pub use projector::{GeoProjector, HullSize, ImageSize, Projection};
