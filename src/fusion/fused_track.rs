use serde::{Deserialize, Serialize};

use crate::ais::{Mmsi, VesselState};
use crate::tracker::{Rect, TrackStatus};

/// AIS kinematics attached to a matched visual track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AisLink {
    pub mmsi: Mmsi,
    pub sog: f64,
    pub cog: f64,
    /// Dead-reckoned position at the frame timestamp.
    pub lat: f64,
    pub lon: f64,
}

impl From<&VesselState> for AisLink {
    fn from(vessel: &VesselState) -> Self {
        Self {
            mmsi: vessel.mmsi,
            sog: vessel.sog(),
            cog: vessel.cog(),
            lat: vessel.position.lat,
            lon: vessel.position.lon,
        }
    }
}

/// One reconciled object in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedTrack {
    pub track_id: u64,
    pub bbox: Rect,
    pub status: TrackStatus,
    pub ais: Option<AisLink>,
    /// Label placement for matched tracks.
    pub info_box: Option<Rect>,
}

impl FusedTrack {
    pub fn has_ais(&self) -> bool {
        self.ais.is_some()
    }

    pub fn mmsi(&self) -> Option<Mmsi> {
        self.ais.map(|a| a.mmsi)
    }
}
