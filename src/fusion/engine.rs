//! AIS-to-visual association.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::ais::{Mmsi, VesselState};
use crate::fusion::binding::BindingTable;
use crate::fusion::events::{MatchEvent, crosses_sampling_boundary};
use crate::fusion::fused_track::{AisLink, FusedTrack};
use crate::fusion::layout::{InfoBoxStyle, place_info_boxes};
use crate::geo::ImageSize;
use crate::tracker::VisualTrack;

/// Default stickiness grace window: two frames at 25 fps.
pub const DEFAULT_BINDING_GRACE_MS: i64 = 80;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Largest AIS-to-box-centre distance that may match, pixels. `None` uses
    /// half the shorter image side.
    pub max_distance: Option<f32>,
    /// How long a bound pair resists a strictly closer vessel, milliseconds.
    pub grace_ms: i64,
    /// Bindings not re-confirmed for this long are dropped, milliseconds.
    pub binding_retention_ms: i64,
    /// Match events are sampled once per interval, milliseconds.
    pub sample_interval_ms: i64,
    pub info_box: InfoBoxStyle,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            max_distance: None,
            grace_ms: DEFAULT_BINDING_GRACE_MS,
            binding_retention_ms: 5_000,
            sample_interval_ms: 1_000,
            info_box: InfoBoxStyle::default(),
        }
    }
}

impl FusionConfig {
    pub fn max_distance_for(&self, image: ImageSize) -> f32 {
        self.max_distance
            .unwrap_or(image.shorter_side() as f32 / 2.0)
    }
}

/// Result of one fusion step.
#[derive(Debug, Clone)]
pub struct FusionOutcome {
    /// One entry per visual track, ordered like the input tracks.
    pub tracks: Vec<FusedTrack>,
    pub bindings: BindingTable,
}

/// Associate vessels with visual tracks for one frame.
///
/// The binding table is taken by value and the updated table returned, so
/// the caller decides where cross-frame state lives.
pub fn fuse(
    config: &FusionConfig,
    image: ImageSize,
    vessels: &[VesselState],
    tracks: &[VisualTrack],
    timestamp: i64,
    mut bindings: BindingTable,
) -> FusionOutcome {
    let max_distance = config.max_distance_for(image);
    let vessel_idx: BTreeMap<Mmsi, usize> =
        vessels.iter().enumerate().map(|(i, v)| (v.mmsi, i)).collect();
    let track_idx: BTreeMap<u64, usize> =
        tracks.iter().enumerate().map(|(j, t)| (t.track_id, j)).collect();

    let distance: Vec<Vec<f32>> = vessels
        .iter()
        .map(|v| {
            tracks
                .iter()
                .map(|t| t.rect().center_distance(v.projection.x, v.projection.y))
                .collect()
        })
        .collect();
    let eligible = |i: usize, j: usize| distance[i][j] < max_distance;

    // Step 1: forget bindings whose vessel or track is gone, or that went cold
    bindings.retain(|b| {
        vessel_idx.contains_key(&b.mmsi)
            && track_idx.contains_key(&b.track_id)
            && timestamp - b.last_match <= config.binding_retention_ms
    });

    let mut vessel_used = vec![false; vessels.len()];
    let mut track_used = vec![false; tracks.len()];
    let mut pairs: Vec<(usize, usize)> = Vec::new();

    // Step 2: bound pairs first, unless a closer vessel has outlasted the grace window
    let holders: BTreeSet<Mmsi> = bindings
        .iter()
        .filter(|b| eligible(vessel_idx[&b.mmsi], track_idx[&b.track_id]))
        .map(|b| b.mmsi)
        .collect();
    for mmsi in bindings.mmsis() {
        let Some(binding) = bindings.by_mmsi_mut(mmsi) else {
            continue;
        };
        let (i, j) = (vessel_idx[&mmsi], track_idx[&binding.track_id]);
        if !eligible(i, j) {
            continue;
        }

        let challenged = vessels.iter().enumerate().any(|(k, v)| {
            k != i && !holders.contains(&v.mmsi) && eligible(k, j) && distance[k][j] < distance[i][j]
        });
        if challenged {
            let since = *binding.challenged_since.get_or_insert(timestamp);
            if timestamp - since >= config.grace_ms {
                trace!(mmsi, track_id = binding.track_id, "binding released to closer vessel");
                continue;
            }
        } else {
            binding.challenged_since = None;
        }

        if !vessel_used[i] && !track_used[j] {
            vessel_used[i] = true;
            track_used[j] = true;
            pairs.push((i, j));
        }
    }

    // Step 3: greedy nearest-first over what is left
    let mut candidates: Vec<(usize, usize)> = (0..vessels.len())
        .filter(|&i| !vessel_used[i])
        .flat_map(|i| (0..tracks.len()).map(move |j| (i, j)))
        .filter(|&(i, j)| !track_used[j] && eligible(i, j))
        .collect();
    candidates.sort_by(|&(ia, ja), &(ib, jb)| {
        distance[ia][ja]
            .total_cmp(&distance[ib][jb])
            .then_with(|| vessels[ia].mmsi.cmp(&vessels[ib].mmsi))
            .then_with(|| tracks[ja].track_id.cmp(&tracks[jb].track_id))
    });
    for (i, j) in candidates {
        if vessel_used[i] || track_used[j] {
            continue;
        }
        vessel_used[i] = true;
        track_used[j] = true;
        pairs.push((i, j));
    }

    // Step 4: one fused record per visual track
    let mut link_for_track: Vec<Option<usize>> = vec![None; tracks.len()];
    for &(i, j) in &pairs {
        link_for_track[j] = Some(i);
        bindings.bind(tracks[j].track_id, vessels[i].mmsi, timestamp);
    }

    let mut fused: Vec<FusedTrack> = tracks
        .iter()
        .zip(&link_for_track)
        .map(|(track, link)| FusedTrack {
            track_id: track.track_id,
            bbox: track.rect(),
            status: track.status,
            ais: link.map(|i| AisLink::from(&vessels[i])),
            info_box: None,
        })
        .collect();
    place_info_boxes(&mut fused, image, &config.info_box);

    FusionOutcome {
        tracks: fused,
        bindings,
    }
}

/// Owns the binding table and the sampled match-event log across frames.
pub struct FusionEngine {
    config: FusionConfig,
    image: ImageSize,
    frame_interval_ms: i64,
    bindings: BindingTable,
    events: Vec<MatchEvent>,
}

impl FusionEngine {
    pub fn new(config: FusionConfig, image: ImageSize, frame_interval_ms: i64) -> Self {
        Self {
            config,
            image,
            frame_interval_ms,
            bindings: BindingTable::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn events(&self) -> &[MatchEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.events)
    }

    /// Fuse one frame and update the binding table and the event log.
    pub fn fuse(
        &mut self,
        vessels: &[VesselState],
        tracks: &[VisualTrack],
        timestamp: i64,
    ) -> Vec<FusedTrack> {
        let bindings = std::mem::take(&mut self.bindings);
        let outcome = fuse(&self.config, self.image, vessels, tracks, timestamp, bindings);
        self.bindings = outcome.bindings;

        if crosses_sampling_boundary(timestamp, self.config.sample_interval_ms, self.frame_interval_ms) {
            for vessel in vessels {
                let track_id = self.bindings.by_mmsi(vessel.mmsi).and_then(|b| {
                    (b.last_match == timestamp).then_some(b.track_id)
                });
                self.events.push(MatchEvent {
                    timestamp,
                    mmsi: vessel.mmsi,
                    track_id,
                    matched: track_id.is_some(),
                });
            }
        }

        let matched = outcome.tracks.iter().filter(|t| t.has_ais()).count();
        debug!(
            timestamp,
            vessels = vessels.len(),
            tracks = tracks.len(),
            matched,
            "fusion step"
        );
        outcome.tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ais::AisRecord;
    use crate::geo::{GeoPoint, Projection};
    use crate::tracker::{Detection, KalmanFilter, Rect};

    const IMAGE: ImageSize = ImageSize {
        width: 1920,
        height: 1080,
    };

    fn track(track_id: u64, cx: f32, cy: f32) -> VisualTrack {
        let det = Detection::from_rect(Rect::from_center(cx, cy, 80.0, 40.0), 0.9);
        VisualTrack::new(track_id, &det, &KalmanFilter::default(), 1)
    }

    fn vessel(mmsi: Mmsi, x: f32, y: f32) -> VesselState {
        VesselState {
            mmsi,
            record: AisRecord::new(mmsi, 0, 31.2, 121.5, 5.0, 90.0),
            position: GeoPoint::new(31.2, 121.5),
            projection: Projection {
                x,
                y,
                footprint: Rect::from_center(x, y, 40.0, 14.0),
            },
            staleness_ms: 0,
            fresh: true,
        }
    }

    fn config(grace_ms: i64) -> FusionConfig {
        FusionConfig {
            grace_ms,
            ..FusionConfig::default()
        }
    }

    #[test]
    fn test_default_max_distance_is_half_shorter_side() {
        assert_eq!(FusionConfig::default().max_distance_for(IMAGE), 540.0);
    }

    #[test]
    fn test_nearest_vessel_wins() {
        let tracks = [track(1, 500.0, 500.0)];
        let vessels = [vessel(10, 560.0, 500.0), vessel(20, 510.0, 500.0)];
        let out = fuse(&config(80), IMAGE, &vessels, &tracks, 0, BindingTable::new());
        assert_eq!(out.tracks[0].mmsi(), Some(20));
        assert!(out.tracks[0].info_box.is_some());
        assert_eq!(out.bindings.by_track(1).unwrap().mmsi, 20);
    }

    #[test]
    fn test_equal_distance_prefers_smaller_mmsi() {
        let tracks = [track(1, 500.0, 500.0)];
        let vessels = [vessel(30, 520.0, 500.0), vessel(20, 480.0, 500.0)];
        let out = fuse(&config(80), IMAGE, &vessels, &tracks, 0, BindingTable::new());
        assert_eq!(out.tracks[0].mmsi(), Some(20));
    }

    #[test]
    fn test_beyond_max_distance_stays_unmatched() {
        let tracks = [track(1, 100.0, 100.0)];
        let vessels = [vessel(10, 1800.0, 1000.0)];
        let out = fuse(&config(80), IMAGE, &vessels, &tracks, 0, BindingTable::new());
        assert!(!out.tracks[0].has_ais());
        assert!(out.tracks[0].info_box.is_none());
        assert!(out.bindings.is_empty());
    }

    #[test]
    fn test_each_side_matched_at_most_once() {
        let tracks = [track(1, 500.0, 500.0), track(2, 700.0, 500.0)];
        let vessels = [
            vessel(10, 505.0, 500.0),
            vessel(20, 510.0, 500.0),
            vessel(30, 690.0, 500.0),
        ];
        let out = fuse(&config(80), IMAGE, &vessels, &tracks, 0, BindingTable::new());
        assert_eq!(out.tracks[0].mmsi(), Some(10));
        assert_eq!(out.tracks[1].mmsi(), Some(30));
        assert_eq!(out.bindings.len(), 2);
    }

    #[test]
    fn test_closer_vessel_steals_immediately_without_grace() {
        let tracks = [track(1, 500.0, 500.0)];
        let cfg = config(0);
        let first = fuse(&cfg, IMAGE, &[vessel(10, 530.0, 500.0)], &tracks, 0, BindingTable::new());
        assert_eq!(first.tracks[0].mmsi(), Some(10));

        let both = [vessel(10, 530.0, 500.0), vessel(20, 505.0, 500.0)];
        let second = fuse(&cfg, IMAGE, &both, &tracks, 40, first.bindings);
        assert_eq!(second.tracks[0].mmsi(), Some(20));
        assert!(second.bindings.by_mmsi(10).is_none());
    }

    #[test]
    fn test_binding_holds_for_grace_window() {
        let tracks = [track(1, 500.0, 500.0)];
        let cfg = config(40);
        let first = fuse(&cfg, IMAGE, &[vessel(10, 530.0, 500.0)], &tracks, 0, BindingTable::new());

        let both = [vessel(10, 530.0, 500.0), vessel(20, 505.0, 500.0)];
        let held = fuse(&cfg, IMAGE, &both, &tracks, 40, first.bindings);
        assert_eq!(held.tracks[0].mmsi(), Some(10));
        assert_eq!(held.bindings.by_mmsi(10).unwrap().challenged_since, Some(40));

        let stolen = fuse(&cfg, IMAGE, &both, &tracks, 80, held.bindings);
        assert_eq!(stolen.tracks[0].mmsi(), Some(20));
    }

    #[test]
    fn test_challenge_resets_when_challenger_leaves() {
        let tracks = [track(1, 500.0, 500.0)];
        let cfg = config(80);
        let first = fuse(&cfg, IMAGE, &[vessel(10, 530.0, 500.0)], &tracks, 0, BindingTable::new());
        let both = [vessel(10, 530.0, 500.0), vessel(20, 505.0, 500.0)];
        let challenged = fuse(&cfg, IMAGE, &both, &tracks, 40, first.bindings);
        let calm = fuse(&cfg, IMAGE, &[vessel(10, 530.0, 500.0)], &tracks, 80, challenged.bindings);
        assert_eq!(calm.bindings.by_mmsi(10).unwrap().challenged_since, None);
    }

    #[test]
    fn test_vanished_track_releases_binding() {
        let cfg = config(80);
        let first = fuse(
            &cfg,
            IMAGE,
            &[vessel(10, 500.0, 500.0)],
            &[track(1, 500.0, 500.0)],
            0,
            BindingTable::new(),
        );
        let next = fuse(&cfg, IMAGE, &[vessel(10, 500.0, 500.0)], &[], 40, first.bindings);
        assert!(next.bindings.is_empty());
    }

    #[test]
    fn test_engine_samples_events_once_per_second() {
        let mut engine = FusionEngine::new(FusionConfig::default(), IMAGE, 40);
        let tracks = [track(1, 500.0, 500.0)];
        let vessels = [vessel(10, 505.0, 500.0), vessel(20, 1500.0, 100.0)];
        for frame in 0..50 {
            engine.fuse(&vessels, &tracks, frame * 40);
        }
        let events = engine.take_events();
        // t = 0 and t = 1000, two vessels each
        assert_eq!(events.len(), 4);
        assert!(events[0].matched && events[0].track_id == Some(1));
        assert!(!events[1].matched && events[1].track_id.is_none());
        assert_eq!(events[2].timestamp, 1000);
        assert!(engine.events().is_empty());
    }
}
