//! Cross-frame AIS identity bindings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ais::Mmsi;

/// A persisted (visual track, MMSI) association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionBinding {
    pub track_id: u64,
    pub mmsi: Mmsi,
    /// Timestamp of the last frame the pair was matched.
    pub last_match: i64,
    /// First frame of the current run of frames in which another vessel was
    /// strictly closer to the bound track.
    pub challenged_since: Option<i64>,
}

/// One-to-one binding table, indexed both by MMSI and by track ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingTable {
    by_mmsi: BTreeMap<Mmsi, FusionBinding>,
    by_track: BTreeMap<u64, Mmsi>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_mmsi(&self, mmsi: Mmsi) -> Option<&FusionBinding> {
        self.by_mmsi.get(&mmsi)
    }

    pub fn by_track(&self, track_id: u64) -> Option<&FusionBinding> {
        self.by_track
            .get(&track_id)
            .and_then(|mmsi| self.by_mmsi.get(mmsi))
    }

    pub(crate) fn by_mmsi_mut(&mut self, mmsi: Mmsi) -> Option<&mut FusionBinding> {
        self.by_mmsi.get_mut(&mmsi)
    }

    /// Record a match at `timestamp`.
    ///
    /// Re-confirming an existing pair keeps its challenge state; any other
    /// binding held by either side is replaced.
    pub fn bind(&mut self, track_id: u64, mmsi: Mmsi, timestamp: i64) {
        if let Some(existing) = self.by_mmsi.get_mut(&mmsi) {
            if existing.track_id == track_id {
                existing.last_match = timestamp;
                return;
            }
        }
        self.unbind_mmsi(mmsi);
        self.unbind_track(track_id);
        self.by_mmsi.insert(
            mmsi,
            FusionBinding {
                track_id,
                mmsi,
                last_match: timestamp,
                challenged_since: None,
            },
        );
        self.by_track.insert(track_id, mmsi);
    }

    pub fn unbind_mmsi(&mut self, mmsi: Mmsi) -> Option<FusionBinding> {
        let binding = self.by_mmsi.remove(&mmsi)?;
        self.by_track.remove(&binding.track_id);
        Some(binding)
    }

    pub fn unbind_track(&mut self, track_id: u64) -> Option<FusionBinding> {
        let mmsi = self.by_track.remove(&track_id)?;
        self.by_mmsi.remove(&mmsi)
    }

    /// Keep only the bindings for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&FusionBinding) -> bool) {
        let dropped: Vec<Mmsi> = self
            .by_mmsi
            .values()
            .filter(|b| !keep(b))
            .map(|b| b.mmsi)
            .collect();
        for mmsi in dropped {
            self.unbind_mmsi(mmsi);
        }
    }

    /// Bindings ordered by MMSI.
    pub fn iter(&self) -> impl Iterator<Item = &FusionBinding> {
        self.by_mmsi.values()
    }

    pub fn mmsis(&self) -> Vec<Mmsi> {
        self.by_mmsi.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_mmsi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mmsi.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_replaces_both_sides() {
        let mut table = BindingTable::new();
        table.bind(1, 100, 0);
        table.bind(2, 200, 0);

        // MMSI 100 moves to track 2, evicting 200.
        table.bind(2, 100, 40);
        assert_eq!(table.len(), 1);
        assert_eq!(table.by_track(2).unwrap().mmsi, 100);
        assert!(table.by_track(1).is_none());
        assert!(table.by_mmsi(200).is_none());
    }

    #[test]
    fn test_rebind_keeps_challenge() {
        let mut table = BindingTable::new();
        table.bind(1, 100, 0);
        table.by_mmsi_mut(100).unwrap().challenged_since = Some(40);
        table.bind(1, 100, 80);
        let binding = table.by_mmsi(100).unwrap();
        assert_eq!(binding.last_match, 80);
        assert_eq!(binding.challenged_since, Some(40));
    }

    #[test]
    fn test_retain_keeps_indexes_in_sync() {
        let mut table = BindingTable::new();
        table.bind(1, 100, 0);
        table.bind(2, 200, 0);
        table.retain(|b| b.track_id != 1);
        assert!(table.by_track(1).is_none());
        assert!(table.by_mmsi(100).is_none());
        assert_eq!(table.mmsis(), vec![200]);
    }
}
