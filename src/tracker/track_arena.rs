//! Slot storage for visual tracks.
//!
//! Slots keep their index for the lifetime of a track so iteration order is
//! stable within a frame. Lost tracks are only released by [`TrackArena::sweep`],
//! which the tracker calls once at the end of each frame.

use crate::tracker::visual_track::VisualTrack;

#[derive(Debug, Clone, Default)]
pub struct TrackArena {
    slots: Vec<Option<VisualTrack>>,
    free: Vec<usize>,
    last_id: u64,
}

impl TrackArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next track ID. IDs start at 1 and are never reused.
    pub fn allocate_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn insert(&mut self, track: VisualTrack) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(track);
                slot
            }
            None => {
                self.slots.push(Some(track));
                self.slots.len() - 1
            }
        }
    }

    pub fn get(&self, slot: usize) -> Option<&VisualTrack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut VisualTrack> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Occupied slots ordered by track ID (oldest first).
    pub fn live_slots(&self) -> Vec<usize> {
        let mut slots: Vec<(u64, usize)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, t)| t.as_ref().map(|t| (t.track_id, slot)))
            .collect();
        slots.sort_unstable();
        slots.into_iter().map(|(_, slot)| slot).collect()
    }

    /// Tracks ordered by ID.
    pub fn tracks(&self) -> impl Iterator<Item = &VisualTrack> {
        self.live_slots().into_iter().filter_map(move |slot| self.get(slot))
    }

    /// Free every slot holding a lost track and return the released IDs.
    pub fn sweep(&mut self) -> Vec<u64> {
        let mut released = Vec::new();
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if entry.as_ref().is_some_and(|t| !t.status.is_alive()) {
                if let Some(track) = entry.take() {
                    released.push(track.track_id);
                }
                self.free.push(slot);
            }
        }
        released.sort_unstable();
        released
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
