//! Editor preview rotation: one global tick advances every zone's playlist.

use std::collections::BTreeMap;

use crate::playlist::{PlaylistEntry, ZonePlaylists};
use crate::types::EntityId;

/// Interval between preview ticks.
pub const PREVIEW_TICK_MS: u64 = 2_000;

/// Per-zone rotation index for the live preview.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewRotation {
    indices: BTreeMap<EntityId, usize>,
    zone_set: Vec<EntityId>,
}

impl PreviewRotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance every zone with a non-empty playlist by one entry, wrapping at
    /// the end. Zones with empty playlists are skipped.
    pub fn tick(&mut self, playlists: &ZonePlaylists) {
        for (zone_id, entries) in playlists.iter() {
            if entries.is_empty() {
                continue;
            }
            let index = self.indices.entry(zone_id.clone()).or_insert(0);
            *index = (*index + 1) % entries.len();
        }
    }

    /// Current index for a zone (0 for zones never ticked).
    pub fn index(&self, zone_id: &str) -> usize {
        self.indices.get(zone_id).copied().unwrap_or(0)
    }

    /// The entry currently showing in a zone, if its playlist is non-empty.
    pub fn current<'a>(
        &self,
        zone_id: &str,
        playlists: &'a ZonePlaylists,
    ) -> Option<&'a PlaylistEntry> {
        let entries = playlists.entries(zone_id);
        if entries.is_empty() {
            return None;
        }
        entries.get(self.index(zone_id) % entries.len())
    }

    /// Restart every zone from its first entry.
    pub fn reset(&mut self) {
        self.indices.clear();
    }

    /// Reset when the set of zone ids differs from the last one seen.
    ///
    /// Returns `true` if a reset happened.
    pub fn sync_zones(&mut self, zone_ids: &[EntityId]) -> bool {
        if self.zone_set.as_slice() == zone_ids {
            return false;
        }
        self.zone_set = zone_ids.to_vec();
        self.reset();
        true
    }
}
