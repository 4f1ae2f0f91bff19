//! Time alignment of AIS reports to video frames.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::ais::record::{AisRecord, Mmsi};
use crate::error::{Error, Result};
use crate::geo::{GeoPoint, GeoProjector, HullSize, Projection, dead_reckon};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AisConfig {
    /// A vessel silent for longer than this is dropped, milliseconds.
    pub horizon_ms: i64,
    pub hull: HullSize,
}

impl Default for AisConfig {
    fn default() -> Self {
        Self {
            horizon_ms: 120_000,
            hull: HullSize::default(),
        }
    }
}

/// Where a vessel is in its `Unseen -> Tracked -> Stale -> Unseen` cycle.
///
/// Unseen vessels have no entry at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VesselPhase {
    Unseen,
    /// Reporting recently and projected inside the frame.
    Tracked,
    /// Within the horizon but not visible.
    Stale,
}

/// Snapshot of one visible vessel at a frame timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct VesselState {
    pub mmsi: Mmsi,
    /// Most recent report at or before the frame timestamp.
    pub record: AisRecord,
    /// Dead-reckoned position at the frame timestamp.
    pub position: GeoPoint,
    pub projection: Projection,
    /// Milliseconds since `record` was received.
    pub staleness_ms: i64,
    /// A new report was consumed on this frame.
    pub fresh: bool,
}

impl VesselState {
    pub fn sog(&self) -> f64 {
        self.record.sog
    }

    pub fn cog(&self) -> f64 {
        self.record.cog
    }
}

#[derive(Debug, Clone)]
struct VesselEntry {
    record: AisRecord,
    phase: VesselPhase,
}

/// Owns the per-MMSI vessel table and the not-yet-consumed reports.
pub struct AisProcessor {
    projector: GeoProjector,
    config: AisConfig,
    pending: BTreeMap<Mmsi, VecDeque<AisRecord>>,
    vessels: BTreeMap<Mmsi, VesselEntry>,
    last_timestamp: Option<i64>,
}

impl AisProcessor {
    /// Build a processor over a complete record set.
    ///
    /// Records may arrive in any order across vessels. Per vessel they are
    /// ordered by timestamp; equal timestamps keep their input order so the
    /// later one ends up applied.
    pub fn new(records: Vec<AisRecord>, projector: GeoProjector, config: AisConfig) -> Self {
        let mut pending: BTreeMap<Mmsi, Vec<AisRecord>> = BTreeMap::new();
        for record in records {
            pending.entry(record.mmsi).or_default().push(record);
        }
        let pending = pending
            .into_iter()
            .map(|(mmsi, mut queue)| {
                queue.sort_by_key(|r| r.timestamp);
                (mmsi, VecDeque::from(queue))
            })
            .collect();

        Self {
            projector,
            config,
            pending,
            vessels: BTreeMap::new(),
            last_timestamp: None,
        }
    }

    pub fn projector(&self) -> &GeoProjector {
        &self.projector
    }

    pub fn config(&self) -> &AisConfig {
        &self.config
    }

    /// Fail if the calibration cannot place any of the loaded reports.
    ///
    /// Out-of-frame results are fine; only non-finite projections for every
    /// single report indicate a broken calibration.
    pub fn validate_projection(&self) -> Result<()> {
        let mut total = 0usize;
        let mut projectable = 0usize;
        for record in self.pending.values().flatten() {
            total += 1;
            if self.projector.calibration().geo_to_pixel(record.position()).is_some() {
                projectable += 1;
            }
        }
        if total > 0 && projectable == 0 {
            return Err(Error::InvalidCalibration(format!(
                "none of {total} AIS reports projects to a finite pixel"
            )));
        }
        Ok(())
    }

    pub fn phase(&self, mmsi: Mmsi) -> VesselPhase {
        self.vessels
            .get(&mmsi)
            .map_or(VesselPhase::Unseen, |entry| entry.phase)
    }

    /// Latest consumed report per vessel regardless of visibility, for every
    /// vessel still within the horizon.
    pub fn current_records(&self) -> Vec<&AisRecord> {
        self.vessels.values().map(|entry| &entry.record).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.values().map(VecDeque::len).sum()
    }

    /// Advance to frame time `timestamp` and return the visible vessels by MMSI.
    pub fn advance(&mut self, timestamp: i64) -> Vec<VesselState> {
        if let Some(last) = self.last_timestamp {
            if timestamp < last {
                debug!(timestamp, last, "AIS clock moved backwards");
            }
        }
        self.last_timestamp = Some(timestamp);

        let mut fresh = Vec::new();
        for (&mmsi, queue) in self.pending.iter_mut() {
            let mut latest = None;
            while queue.front().is_some_and(|r| r.timestamp <= timestamp) {
                latest = queue.pop_front();
            }
            if let Some(record) = latest {
                fresh.push(mmsi);
                self.vessels.insert(
                    mmsi,
                    VesselEntry {
                        record,
                        phase: VesselPhase::Tracked,
                    },
                );
            }
        }
        self.pending.retain(|_, queue| !queue.is_empty());

        let horizon = self.config.horizon_ms;
        let mut expired = Vec::new();
        let mut visible = Vec::new();
        for (&mmsi, entry) in self.vessels.iter_mut() {
            let staleness_ms = timestamp - entry.record.timestamp;
            if staleness_ms > horizon {
                expired.push(mmsi);
                continue;
            }

            let position = dead_reckon(
                entry.record.position(),
                entry.record.sog,
                entry.record.cog,
                staleness_ms,
            );
            match self.projector.project(position, entry.record.bearing()) {
                Some(projection) => {
                    entry.phase = VesselPhase::Tracked;
                    visible.push(VesselState {
                        mmsi,
                        record: entry.record.clone(),
                        position,
                        projection,
                        staleness_ms,
                        fresh: fresh.binary_search(&mmsi).is_ok(),
                    });
                }
                None => {
                    if entry.phase == VesselPhase::Tracked {
                        trace!(mmsi, "vessel left the frame");
                    }
                    entry.phase = VesselPhase::Stale;
                }
            }
        }

        for mmsi in expired {
            self.vessels.remove(&mmsi);
            debug!(mmsi, timestamp, "AIS vessel expired");
        }

        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Calibration, ImageSize};

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

    fn config(horizon_ms: i64) -> AisConfig {
        AisConfig {
            horizon_ms,
            ..AisConfig::default()
        }
    }

    #[test]
    fn test_not_visible_before_first_report() {
        let records = vec![AisRecord::new(1, 1000, 31.2, 121.5, 0.0, 0.0)];
        let mut ais = AisProcessor::new(records, projector(), config(10_000));
        assert!(ais.advance(960).is_empty());
        assert_eq!(ais.phase(1), VesselPhase::Unseen);
        assert_eq!(ais.advance(1000).len(), 1);
        assert_eq!(ais.phase(1), VesselPhase::Tracked);
    }

    #[test]
    fn test_last_write_wins_on_equal_timestamps() {
        let records = vec![
            AisRecord::new(7, 0, 31.2, 121.5, 1.0, 0.0),
            AisRecord::new(7, 0, 31.2, 121.5, 2.0, 0.0),
        ];
        let mut ais = AisProcessor::new(records, projector(), config(10_000));
        let vessels = ais.advance(0);
        assert_eq!(vessels[0].sog(), 2.0);
    }

    #[test]
    fn test_cross_vessel_order_is_irrelevant() {
        let a = AisRecord::new(1, 0, 31.2, 121.5, 0.0, 0.0);
        let b = AisRecord::new(2, 40, 31.2002, 121.5005, 0.0, 0.0);
        let mut forward = AisProcessor::new(vec![a.clone(), b.clone()], projector(), config(10_000));
        let mut reverse = AisProcessor::new(vec![b, a], projector(), config(10_000));
        assert_eq!(forward.advance(40), reverse.advance(40));
    }

    #[test]
    fn test_staleness_and_horizon() {
        let records = vec![AisRecord::new(1, 0, 31.2, 121.5, 0.0, 0.0)];
        let mut ais = AisProcessor::new(records, projector(), config(1000));
        assert!(ais.advance(0)[0].fresh);

        let later = ais.advance(1000);
        assert_eq!(later[0].staleness_ms, 1000);
        assert!(!later[0].fresh);

        assert!(ais.advance(1040).is_empty());
        assert_eq!(ais.phase(1), VesselPhase::Unseen);
        assert!(ais.current_records().is_empty());
    }

    #[test]
    fn test_out_of_frame_is_stale() {
        // Starts 20 px from the left edge, heading west at 100 kn.
        let records = vec![AisRecord::new(1, 0, 31.2, 121.4958, 100.0, 270.0)];
        let mut ais = AisProcessor::new(records, projector(), config(60_000));
        assert_eq!(ais.advance(0).len(), 1);
        assert!(ais.advance(10_000).is_empty());
        assert_eq!(ais.phase(1), VesselPhase::Stale);
    }

    #[test]
    fn test_validate_projection_rejects_unprojectable_reports() {
        let cal = Calibration::Homography {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, -121.5]],
        };
        let projector = GeoProjector::new(cal, ImageSize::new(100, 100), HullSize::default());
        let records = vec![AisRecord::new(1, 0, 31.2, 121.5, 0.0, 0.0)];
        let ais = AisProcessor::new(records, projector, AisConfig::default());
        assert!(ais.validate_projection().is_err());
    }
}
