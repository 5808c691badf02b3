//! Zone playlists: which media play in which zone, in what order and for how
//! long.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::media::{MediaItem, DEFAULT_MEDIA_DURATION_SECS};
use crate::types::EntityId;

/// One media reference inside a zone playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub media_id: EntityId,
    /// Per-entry play time in seconds, always `>= 1`.
    pub duration_secs: u32,
}

/// Move the element at `from` to position `to`, shifting the others.
///
/// Out-of-range indices leave the list unchanged.
pub fn reorder<T: Clone>(list: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = list.to_vec();
    if from >= out.len() || to >= out.len() || from == to {
        return out;
    }
    let item = out.remove(from);
    out.insert(to, item);
    out
}

/// Interpret a user-entered duration. Only finite whole numbers `>= 1` are
/// accepted.
pub fn accept_duration(seconds: f64) -> Option<u32> {
    let whole = seconds.is_finite() && seconds.fract() == 0.0;
    if whole && seconds >= 1.0 && seconds <= f64::from(u32::MAX) {
        Some(seconds as u32)
    } else {
        None
    }
}

/// Playlists for every zone of a layout, keyed by zone id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZonePlaylists {
    zones: BTreeMap<EntityId, Vec<PlaylistEntry>>,
}

impl ZonePlaylists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries for a zone; an unknown zone has an empty playlist.
    pub fn entries(&self, zone_id: &str) -> &[PlaylistEntry] {
        self.zones.get(zone_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Vec<PlaylistEntry>)> {
        self.zones.iter()
    }

    pub fn is_empty(&self, zone_id: &str) -> bool {
        self.entries(zone_id).is_empty()
    }

    /// Assign `media` to a zone.
    ///
    /// With an `index`, a media item already present in the playlist is moved
    /// there; otherwise a new entry is inserted at `index` (clamped to the
    /// playlist length). Without an index the entry is appended. Returns the
    /// position the entry ended up at.
    pub fn assign(&mut self, zone_id: &str, media: &MediaItem, index: Option<usize>) -> usize {
        let list = self.zones.entry(zone_id.to_string()).or_default();

        if let Some(target) = index {
            if let Some(existing) = list.iter().position(|e| e.media_id == media.id) {
                let target = target.min(list.len() - 1);
                *list = reorder(list, existing, target);
                return target;
            }
            let target = target.min(list.len());
            list.insert(target, entry_for(media));
            return target;
        }

        list.push(entry_for(media));
        list.len() - 1
    }

    /// Remove one entry. Returns it, or `None` when the index is out of range.
    pub fn remove(&mut self, zone_id: &str, index: usize) -> Option<PlaylistEntry> {
        let list = self.zones.get_mut(zone_id)?;
        if index >= list.len() {
            return None;
        }
        Some(list.remove(index))
    }

    /// Move an entry within a zone playlist.
    pub fn move_entry(&mut self, zone_id: &str, from: usize, to: usize) {
        if let Some(list) = self.zones.get_mut(zone_id) {
            *list = reorder(list, from, to);
        }
    }

    /// Override an entry's duration.
    ///
    /// Invalid input keeps the previous valid value. Returns the duration in
    /// effect afterwards, or `None` when the entry does not exist.
    pub fn set_duration(&mut self, zone_id: &str, index: usize, seconds: f64) -> Option<u32> {
        let entry = self.zones.get_mut(zone_id)?.get_mut(index)?;
        match accept_duration(seconds) {
            Some(valid) => entry.duration_secs = valid,
            None => {
                tracing::debug!(
                    zone_id,
                    index,
                    seconds,
                    "Rejected playlist duration, keeping previous"
                );
                if entry.duration_secs == 0 {
                    entry.duration_secs = DEFAULT_MEDIA_DURATION_SECS;
                }
            }
        }
        Some(entry.duration_secs)
    }

    /// [`set_duration`](Self::set_duration) for raw text input.
    pub fn set_duration_input(&mut self, zone_id: &str, index: usize, raw: &str) -> Option<u32> {
        let seconds = raw.trim().parse::<f64>().unwrap_or(f64::NAN);
        self.set_duration(zone_id, index, seconds)
    }

    /// Sum of entry durations for a zone, in seconds.
    pub fn total_duration(&self, zone_id: &str) -> u64 {
        self.entries(zone_id)
            .iter()
            .map(|e| u64::from(e.duration_secs))
            .sum()
    }

    /// Drop a zone's playlist entirely.
    pub fn remove_zone(&mut self, zone_id: &str) -> Option<Vec<PlaylistEntry>> {
        self.zones.remove(zone_id)
    }

    /// Drop playlists whose zone no longer exists.
    pub fn retain_zones(&mut self, zone_ids: &[EntityId]) {
        self.zones.retain(|id, _| zone_ids.contains(id));
    }
}

fn entry_for(media: &MediaItem) -> PlaylistEntry {
    PlaylistEntry {
        media_id: media.id.clone(),
        duration_secs: media.effective_duration(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaType;

    fn media(id: &str, duration: u32) -> MediaItem {
        MediaItem::new(id, id, MediaType::Image, duration)
    }

    fn ids(p: &ZonePlaylists, zone: &str) -> Vec<String> {
        p.entries(zone).iter().map(|e| e.media_id.clone()).collect()
    }

    #[test]
    fn assign_appends_and_inserts() {
        let mut p = ZonePlaylists::new();
        p.assign("z1", &media("a", 10), None);
        p.assign("z1", &media("b", 10), None);
        let at = p.assign("z1", &media("c", 10), Some(0));
        assert_eq!(at, 0);
        assert_eq!(ids(&p, "z1"), vec!["c", "a", "b"]);
    }

    #[test]
    fn assign_existing_with_index_reorders() {
        let mut p = ZonePlaylists::new();
        for id in ["a", "b", "c"] {
            p.assign("z1", &media(id, 10), None);
        }
        p.assign("z1", &media("a", 10), Some(2));
        assert_eq!(ids(&p, "z1"), vec!["b", "c", "a"]);
    }

    #[test]
    fn assign_clamps_index() {
        let mut p = ZonePlaylists::new();
        p.assign("z1", &media("a", 10), None);
        let at = p.assign("z1", &media("b", 10), Some(99));
        assert_eq!(at, 1);
    }

    #[test]
    fn remove_out_of_range_is_noop() {
        let mut p = ZonePlaylists::new();
        p.assign("z1", &media("a", 10), None);
        assert!(p.remove("z1", 5).is_none());
        assert!(p.remove("z9", 0).is_none());
        assert_eq!(p.remove("z1", 0).map(|e| e.media_id), Some("a".to_string()));
        assert!(p.is_empty("z1"));
    }

    #[test]
    fn set_duration_rejects_invalid_input() {
        let mut p = ZonePlaylists::new();
        p.assign("z1", &media("a", 12), None);
        assert_eq!(p.set_duration("z1", 0, 20.0), Some(20));
        assert_eq!(p.set_duration("z1", 0, 0.0), Some(20));
        assert_eq!(p.set_duration("z1", 0, -3.0), Some(20));
        assert_eq!(p.set_duration("z1", 0, 2.5), Some(20));
        assert_eq!(p.set_duration("z1", 0, f64::NAN), Some(20));
        assert_eq!(p.set_duration_input("z1", 0, "abc"), Some(20));
        assert_eq!(p.set_duration_input("z1", 0, " 7 "), Some(7));
        assert_eq!(p.set_duration("z1", 3, 7.0), None);
    }

    #[test]
    fn zero_duration_media_gets_default() {
        let mut p = ZonePlaylists::new();
        p.assign("z1", &media("a", 0), None);
        assert_eq!(p.entries("z1")[0].duration_secs, DEFAULT_MEDIA_DURATION_SECS);
    }

    #[test]
    fn total_duration_sums_entries() {
        let mut p = ZonePlaylists::new();
        p.assign("z1", &media("a", 10), None);
        p.assign("z1", &media("b", 15), None);
        assert_eq!(p.total_duration("z1"), 25);
        assert_eq!(p.total_duration("empty"), 0);
    }

    #[test]
    fn reorder_moves_element() {
        assert_eq!(reorder(&[1, 2, 3, 4], 0, 3), vec![2, 3, 4, 1]);
        assert_eq!(reorder(&[1, 2, 3, 4], 3, 1), vec![1, 4, 2, 3]);
        assert_eq!(reorder(&[1, 2], 0, 5), vec![1, 2]);
    }

    #[test]
    fn retain_zones_drops_orphans() {
        let mut p = ZonePlaylists::new();
        p.assign("z1", &media("a", 10), None);
        p.assign("z2", &media("b", 10), None);
        p.retain_zones(&["z2".to_string()]);
        assert!(p.is_empty("z1"));
        assert!(!p.is_empty("z2"));
    }
}
