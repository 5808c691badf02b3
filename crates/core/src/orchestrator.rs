//! Per-screen conflict resolution between direct publishes, planned
//! schedules and default content.
//!
//! Precedence, highest first:
//!
//! 1. active override quickplay, most recent `start_time` (ties go to the
//!    later entry in the list)
//! 2. on-air planned schedule, highest `priority` (ties go to the latest
//!    `start_date`, then the later entry). Day-sequence and campaign
//!    schedules are resolved through the [`Catalog`] down to the slot or
//!    composition on air; one that resolves to nothing (a gap between slots,
//!    a missing sequence) yields to the next schedule.
//! 3. active regular quickplay, most recent `start_time`
//! 4. active default quickplay, most recent `start_time`
//! 5. idle

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::composition::Campaign;
use crate::day_sequence::{DaySequence, SlotContentType, TimeSlot};
use crate::planned::{PlannedSchedule, ScheduleType};
use crate::quickplay::DirectPublish;
use crate::types::{EntityId, Timestamp};

/// What a screen should be showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ActiveContent {
    Override { publish_id: EntityId, content_id: EntityId },
    Scheduled {
        schedule_id: EntityId,
        content_id: EntityId,
        /// Day-sequence slot the content came from.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot_id: Option<EntityId>,
    },
    Direct { publish_id: EntityId, content_id: EntityId },
    Default { publish_id: EntityId, content_id: EntityId },
    Idle,
}

impl ActiveContent {
    pub fn content_id(&self) -> Option<&str> {
        match self {
            ActiveContent::Override { content_id, .. }
            | ActiveContent::Scheduled { content_id, .. }
            | ActiveContent::Direct { content_id, .. }
            | ActiveContent::Default { content_id, .. } => Some(content_id),
            ActiveContent::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ActiveContent::Idle)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Day sequences and campaigns that planned schedules point at.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog<'a> {
    pub day_sequences: &'a [DaySequence],
    pub campaigns: &'a [Campaign],
}

impl<'a> Catalog<'a> {
    pub fn day_sequence(&self, id: &str) -> Option<&'a DaySequence> {
        self.day_sequences.iter().find(|d| d.id == id)
    }

    pub fn campaign(&self, id: &str) -> Option<&'a Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }

    /// Content a schedule plays at `now`, with the day-sequence slot it came
    /// from. `None` when nothing is on air for it.
    pub fn resolve_schedule(
        &self,
        schedule: &PlannedSchedule,
        now: Timestamp,
    ) -> Option<(EntityId, Option<EntityId>)> {
        match schedule.schedule_type {
            ScheduleType::Simple => Some((schedule.content_id.clone(), None)),
            ScheduleType::Campaign => self
                .campaign_content(&schedule.content_id, &schedule.id, schedule.start_date, now)
                .map(|content| (content, None)),
            ScheduleType::DaySequence => {
                let Some(sequence) = self.day_sequence(&schedule.content_id) else {
                    tracing::warn!(
                        schedule_id = %schedule.id,
                        sequence_id = %schedule.content_id,
                        "Schedule references an unknown day sequence"
                    );
                    return None;
                };
                let slot = sequence.active_slot(&now)?;
                let content = self.slot_content(schedule, slot, now)?;
                Some((content, Some(slot.id.clone())))
            }
        }
    }

    fn slot_content(
        &self,
        schedule: &PlannedSchedule,
        slot: &TimeSlot,
        now: Timestamp,
    ) -> Option<EntityId> {
        match slot.content_type {
            SlotContentType::Media | SlotContentType::Composition => Some(slot.content_id.clone()),
            SlotContentType::Campaign => {
                let key = format!("{}/{}", schedule.id, slot.id);
                self.campaign_content(&slot.content_id, &key, schedule.start_date, now)
            }
        }
    }

    fn campaign_content(
        &self,
        campaign_id: &str,
        rotation_key: &str,
        started: Timestamp,
        now: Timestamp,
    ) -> Option<EntityId> {
        let Some(campaign) = self.campaign(campaign_id) else {
            tracing::warn!(campaign_id, rotation_key, "Schedule references an unknown campaign");
            return None;
        };
        campaign.composition_at(rotation_key, started, now).cloned()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Most recent by `start_time`; `max_by_key` keeps the last of equal keys.
fn latest<'a>(
    directs: &'a [DirectPublish],
    screen_id: &str,
    pred: impl Fn(&DirectPublish) -> bool,
) -> Option<&'a DirectPublish> {
    directs
        .iter()
        .filter(|d| d.is_active() && d.targets(screen_id) && pred(d))
        .max_by_key(|d| d.start_time)
}

/// Resolve what `screen_id` plays at `now`.
pub fn resolve_screen(
    screen_id: &str,
    directs: &[DirectPublish],
    schedules: &[PlannedSchedule],
    catalog: &Catalog<'_>,
    now: Timestamp,
) -> ActiveContent {
    if let Some(d) = latest(directs, screen_id, |d| d.overrides_schedules) {
        return ActiveContent::Override {
            publish_id: d.id.clone(),
            content_id: d.content_id.clone(),
        };
    }

    let mut on_air: Vec<(usize, &PlannedSchedule)> = schedules
        .iter()
        .enumerate()
        .filter(|(_, s)| s.targets(screen_id) && s.is_on_air(now))
        .collect();
    on_air.sort_by_key(|(i, s)| Reverse((s.priority, s.start_date, *i)));
    for (_, s) in on_air {
        if let Some((content_id, slot_id)) = catalog.resolve_schedule(s, now) {
            return ActiveContent::Scheduled {
                schedule_id: s.id.clone(),
                content_id,
                slot_id,
            };
        }
    }

    if let Some(d) = latest(directs, screen_id, |d| !d.overrides_schedules && !d.is_default) {
        return ActiveContent::Direct {
            publish_id: d.id.clone(),
            content_id: d.content_id.clone(),
        };
    }

    if let Some(d) = latest(directs, screen_id, |d| d.is_default && !d.overrides_schedules) {
        return ActiveContent::Default {
            publish_id: d.id.clone(),
            content_id: d.content_id.clone(),
        };
    }

    ActiveContent::Idle
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
