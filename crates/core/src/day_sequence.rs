//! Day sequences: a 24-hour partition into time slots, each bound to one
//! content unit.
//!
//! Slot boundaries are wall-clock minutes in the sequence's reference UTC
//! offset. A slot covers `[start, end)`; `24:00` is accepted as an end time so
//! a slot can run to midnight.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::types::EntityId;

/// Minutes in one day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

// ---------------------------------------------------------------------------
// SlotTime
// ---------------------------------------------------------------------------

/// Minutes since midnight, `0..=1440`. Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(u16);

impl SlotTime {
    pub const MIDNIGHT: SlotTime = SlotTime(0);
    pub const END_OF_DAY: SlotTime = SlotTime(MINUTES_PER_DAY);

    /// `None` unless `hour:minute` is a valid clock time or exactly `24:00`.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if minute > 59 || hour > 24 || (hour == 24 && minute != 0) {
            return None;
        }
        Some(Self((hour * 60 + minute) as u16))
    }

    /// Wall-clock time truncated to the minute.
    pub fn from_naive(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

/// Parse an `"HH:MM"` string (one- or two-digit hour).
pub fn parse_hhmm(raw: &str) -> Result<SlotTime, CoreError> {
    let invalid = || CoreError::Validation(format!("Invalid time '{raw}'. Expected HH:MM"));
    let (h, m) = raw.trim().split_once(':').ok_or_else(invalid)?;
    let digits = |s: &str, max_len: usize| {
        !s.is_empty() && s.len() <= max_len && s.bytes().all(|b| b.is_ascii_digit())
    };
    if !digits(h, 2) || !digits(m, 2) || m.len() != 2 {
        return Err(invalid());
    }
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    SlotTime::new(hour, minute).ok_or_else(invalid)
}

impl FromStr for SlotTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hhmm(s)
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_hhmm(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Slots and sequences
// ---------------------------------------------------------------------------

/// What a slot plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotContentType {
    Media,
    Composition,
    Campaign,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: EntityId,
    pub start_time: SlotTime,
    pub end_time: SlotTime,
    pub content_type: SlotContentType,
    pub content_id: EntityId,
}

impl TimeSlot {
    /// `start ≤ now < end`. Slots with `start ≥ end` never match.
    pub fn contains(&self, now: SlotTime) -> bool {
        self.start_time <= now && now < self.end_time
    }

    pub fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time
    }

    fn intersects(&self, other: &TimeSlot) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }
}

/// Data-quality problems in a day sequence. The scheduler still resolves
/// deterministically when these are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotWarning {
    InvertedRange { slot_id: EntityId },
    Overlap { first: EntityId, second: EntityId },
}

/// An ordered list of slots covering one 24-hour cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySequence {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    /// Reference timezone as an offset east of UTC, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    pub slots: Vec<TimeSlot>,
}

impl DaySequence {
    pub fn new(id: impl Into<EntityId>, slots: Vec<TimeSlot>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            utc_offset_minutes: 0,
            slots,
        }
    }

    pub fn with_utc_offset(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// The reference offset; out-of-range offsets fall back to UTC.
    pub fn reference_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!(
                    sequence_id = %self.id,
                    utc_offset_minutes = self.utc_offset_minutes,
                    "Invalid UTC offset on day sequence, using UTC"
                );
                Utc.fix()
            })
    }

    /// The slot active at instant `at`, evaluated in the sequence's reference
    /// timezone.
    pub fn active_slot<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Option<&TimeSlot> {
        let local = at.with_timezone(&self.reference_offset());
        self.active_slot_at(SlotTime::from_naive(local.time()))
    }

    /// The first slot in list order containing `now`.
    ///
    /// If later slots also contain `now` the overlap is logged; the first
    /// slot still wins.
    pub fn active_slot_at(&self, now: SlotTime) -> Option<&TimeSlot> {
        let index = self.slots.iter().position(|s| s.contains(now))?;
        let winner = &self.slots[index];
        let shadowed: Vec<&str> = self.slots[index + 1..]
            .iter()
            .filter(|s| s.contains(now))
            .map(|s| s.id.as_str())
            .collect();
        if !shadowed.is_empty() {
            tracing::warn!(
                sequence_id = %self.id,
                at = %now,
                winner = %winner.id,
                shadowed = ?shadowed,
                "Overlapping time slots; first match wins"
            );
        }
        Some(winner)
    }

    /// Inverted ranges and overlapping pairs, in list order.
    pub fn validate(&self) -> Vec<SlotWarning> {
        let mut warnings = Vec::new();
        for slot in &self.slots {
            if !slot.is_well_formed() {
                warnings.push(SlotWarning::InvertedRange {
                    slot_id: slot.id.clone(),
                });
            }
        }
        for (i, a) in self.slots.iter().enumerate() {
            if !a.is_well_formed() {
                continue;
            }
            for b in self.slots[i + 1..].iter().filter(|b| b.is_well_formed()) {
                if a.intersects(b) {
                    warnings.push(SlotWarning::Overlap {
                        first: a.id.clone(),
                        second: b.id.clone(),
                    });
                }
            }
        }
        warnings
    }

    /// Uncovered `[start, end)` ranges of the day, in chronological order.
    pub fn coverage_gaps(&self) -> Vec<(SlotTime, SlotTime)> {
        let mut ranges: Vec<(SlotTime, SlotTime)> = self
            .slots
            .iter()
            .filter(|s| s.is_well_formed())
            .map(|s| (s.start_time, s.end_time))
            .collect();
        ranges.sort();

        let mut gaps = Vec::new();
        let mut cursor = SlotTime::MIDNIGHT;
        for (start, end) in ranges {
            if start > cursor {
                gaps.push((cursor, start));
            }
            cursor = cursor.max(end);
        }
        if cursor < SlotTime::END_OF_DAY {
            gaps.push((cursor, SlotTime::END_OF_DAY));
        }
        gaps
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
