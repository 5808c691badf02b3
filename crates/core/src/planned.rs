//! Planned schedules: durable, date-ranged content assignments and their
//! lifecycle state machine.
//!
//! Lifecycle: `scheduled -> active` when the start date is reached,
//! `-> completed` once the end date has passed. `paused` is entered and left
//! by explicit user action. `pending_approval` only occurs before a schedule
//! ever becomes active, while a reviewer decision is outstanding.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::approval::ApprovalStatus;
use crate::error::CoreError;
use crate::types::{new_id, EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Priority constants
// ---------------------------------------------------------------------------

/// Priority for urgent schedules. Wins over everything else scheduled.
pub const PRIORITY_URGENT: i32 = 10;

/// Default priority.
pub const PRIORITY_NORMAL: i32 = 0;

/// Priority for filler content.
pub const PRIORITY_LOW: i32 = -10;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Simple,
    DaySequence,
    Campaign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    Scheduled,
    Paused,
    Completed,
    PendingApproval,
}

impl ScheduleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::Active => "active",
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::Paused => "paused",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::PendingApproval => "pending_approval",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    Once,
    Daily,
    Weekly,
    Monthly,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub mod state_machine {
    use super::ScheduleStatus::{self, *};
    use crate::error::CoreError;

    /// Statuses reachable from `from`. `Completed` is terminal.
    pub fn valid_transitions(from: ScheduleStatus) -> &'static [ScheduleStatus] {
        match from {
            // Approve -> Scheduled, reject -> Paused
            PendingApproval => &[Scheduled, Paused],
            Scheduled => &[Active, Paused, PendingApproval, Completed],
            Active => &[Paused, Completed],
            // Resume, or resubmit after a rejection. Resubmitting is further
            // limited to schedules that never went on air, see
            // `PlannedSchedule::ensure_submittable`.
            Paused => &[Active, Scheduled, PendingApproval, Completed],
            Completed => &[],
        }
    }

    pub fn can_transition(from: ScheduleStatus, to: ScheduleStatus) -> bool {
        valid_transitions(from).contains(&to)
    }

    pub fn validate_transition(from: ScheduleStatus, to: ScheduleStatus) -> Result<(), CoreError> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Invalid schedule transition: {} -> {}",
                from.as_str(),
                to.as_str()
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// PlannedSchedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSchedule {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub schedule_type: ScheduleType,
    pub target_screens: Vec<EntityId>,
    pub status: ScheduleStatus,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub priority: i32,
    pub content_id: EntityId,
    #[serde(default)]
    pub approval_status: Option<ApprovalStatus>,
    /// First time the schedule went `active`. Once set, the schedule can no
    /// longer enter `pending_approval`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<Timestamp>,
}

impl PlannedSchedule {
    /// A new schedule in `scheduled` state with normal priority and no
    /// recurrence.
    pub fn new(
        schedule_type: ScheduleType,
        content_id: impl Into<EntityId>,
        target_screens: Vec<EntityId>,
        start_date: Timestamp,
        end_date: Timestamp,
    ) -> Self {
        Self {
            id: new_id(),
            name: String::new(),
            schedule_type,
            target_screens,
            status: ScheduleStatus::Scheduled,
            start_date,
            end_date,
            recurrence: Recurrence::Once,
            priority: PRIORITY_NORMAL,
            content_id: content_id.into(),
            approval_status: None,
            activated_at: None,
        }
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn targets(&self, screen_id: &str) -> bool {
        self.target_screens.iter().any(|s| s == screen_id)
    }

    /// Move to `to`, rejecting transitions the state machine does not allow.
    pub fn transition(&mut self, to: ScheduleStatus) -> Result<(), CoreError> {
        state_machine::validate_transition(self.status, to)?;
        self.status = to;
        Ok(())
    }

    pub fn has_been_active(&self) -> bool {
        self.activated_at.is_some()
    }

    /// Check that the schedule may be (re)submitted for approval.
    pub fn ensure_submittable(&self) -> Result<(), CoreError> {
        if self.has_been_active() {
            return Err(CoreError::Conflict(format!(
                "Schedule {} has already been on air and cannot be submitted for approval",
                self.id
            )));
        }
        state_machine::validate_transition(self.status, ScheduleStatus::PendingApproval)
    }

    fn mark_active(&mut self, now: Timestamp) {
        self.activated_at.get_or_insert(now);
    }

    /// `start_date <= now <= end_date`.
    pub fn in_window(&self, now: Timestamp) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    /// Whether the recurrence rule selects the calendar day of `now`.
    ///
    /// Weekly schedules repeat on the start date's weekday. Monthly schedules
    /// repeat on the start date's day of month, or on the last day of shorter
    /// months.
    pub fn recurs_on(&self, now: Timestamp) -> bool {
        match self.recurrence {
            Recurrence::Once | Recurrence::Daily => true,
            Recurrence::Weekly => now.weekday() == self.start_date.weekday(),
            Recurrence::Monthly => {
                let wanted = self.start_date.day();
                let last = last_day_of_month(now.year(), now.month());
                now.day() == wanted.min(last)
            }
        }
    }

    /// Active, inside its window and selected by its recurrence.
    pub fn is_on_air(&self, now: Timestamp) -> bool {
        self.status == ScheduleStatus::Active && self.in_window(now) && self.recurs_on(now)
    }

    /// Apply clock-driven transitions. Returns the new status if it changed.
    ///
    /// `scheduled -> active` at the start date, `scheduled | active | paused
    /// -> completed` after the end date. Schedules awaiting approval are left
    /// for the reviewer.
    pub fn advance(&mut self, now: Timestamp) -> Option<ScheduleStatus> {
        let next = match self.status {
            ScheduleStatus::Scheduled | ScheduleStatus::Active | ScheduleStatus::Paused
                if now > self.end_date =>
            {
                ScheduleStatus::Completed
            }
            ScheduleStatus::Scheduled if now >= self.start_date => ScheduleStatus::Active,
            _ => return None,
        };
        self.status = next;
        if next == ScheduleStatus::Active {
            self.mark_active(now);
        }
        Some(next)
    }

    pub fn pause(&mut self) -> Result<(), CoreError> {
        match self.status {
            ScheduleStatus::Active | ScheduleStatus::Scheduled => {
                self.transition(ScheduleStatus::Paused)
            }
            other => Err(CoreError::Conflict(format!(
                "Cannot pause a schedule that is {}",
                other.as_str()
            ))),
        }
    }

    /// Resume a paused schedule: `active` if inside its window, otherwise
    /// `scheduled`. Rejected schedules must be resubmitted instead.
    pub fn resume(&mut self, now: Timestamp) -> Result<(), CoreError> {
        if self.status != ScheduleStatus::Paused {
            return Err(CoreError::Conflict(format!(
                "Cannot resume a schedule that is {}",
                self.status.as_str()
            )));
        }
        if self.approval_status == Some(ApprovalStatus::Rejected) {
            return Err(CoreError::Conflict(
                "Rejected schedules must be resubmitted for approval".to_string(),
            ));
        }
        if self.in_window(now) {
            self.transition(ScheduleStatus::Active)?;
            self.mark_active(now);
            Ok(())
        } else {
            self.transition(ScheduleStatus::Scheduled)
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::state_machine::*;
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32, h: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().expect("valid instant")
    }

    fn schedule() -> PlannedSchedule {
        PlannedSchedule::new(
            ScheduleType::DaySequence,
            "seq-1",
            vec!["screen-1".into()],
            at(2026, 3, 1, 0),
            at(2026, 3, 31, 23),
        )
    }

    // -- State machine ------------------------------------------------------

    #[test]
    fn completed_is_terminal() {
        assert!(valid_transitions(ScheduleStatus::Completed).is_empty());
    }

    #[test]
    fn pending_approval_only_resolves_to_scheduled_or_paused() {
        assert!(can_transition(ScheduleStatus::PendingApproval, ScheduleStatus::Scheduled));
        assert!(can_transition(ScheduleStatus::PendingApproval, ScheduleStatus::Paused));
        assert!(!can_transition(ScheduleStatus::PendingApproval, ScheduleStatus::Active));
    }

    #[test]
    fn active_cannot_go_back_to_pending_approval() {
        assert!(!can_transition(ScheduleStatus::Active, ScheduleStatus::PendingApproval));
    }

    #[test]
    fn validate_transition_names_both_states() {
        let err = validate_transition(ScheduleStatus::Completed, ScheduleStatus::Active)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("completed"));
        assert!(msg.contains("active"));
    }

    // -- Clock-driven lifecycle ---------------------------------------------

    #[test]
    fn advance_activates_then_completes() {
        let mut s = schedule();
        assert_eq!(s.advance(at(2026, 2, 28, 12)), None);
        assert_eq!(s.advance(at(2026, 3, 1, 0)), Some(ScheduleStatus::Active));
        assert_eq!(s.advance(at(2026, 3, 15, 0)), None);
        assert_eq!(s.advance(at(2026, 4, 1, 0)), Some(ScheduleStatus::Completed));
        assert_eq!(s.advance(at(2026, 5, 1, 0)), None);
    }

    #[test]
    fn pending_approval_is_not_advanced() {
        let mut s = schedule();
        s.status = ScheduleStatus::PendingApproval;
        assert_eq!(s.advance(at(2026, 3, 10, 0)), None);
        assert_eq!(s.advance(at(2026, 4, 10, 0)), None);
    }

    #[test]
    fn pause_and_resume_inside_window() {
        let mut s = schedule();
        s.advance(at(2026, 3, 2, 0));
        s.pause().expect("active schedules can pause");
        assert_eq!(s.status, ScheduleStatus::Paused);
        s.resume(at(2026, 3, 3, 0)).expect("paused schedules can resume");
        assert_eq!(s.status, ScheduleStatus::Active);
    }

    #[test]
    fn resume_before_window_goes_back_to_scheduled() {
        let mut s = schedule();
        s.pause().expect("scheduled schedules can pause");
        s.resume(at(2026, 2, 1, 0)).expect("resume");
        assert_eq!(s.status, ScheduleStatus::Scheduled);
    }

    #[test]
    fn activation_is_remembered_across_pause() {
        let mut s = schedule();
        assert!(s.ensure_submittable().is_ok());
        s.advance(at(2026, 3, 2, 0));
        assert_eq!(s.activated_at, Some(at(2026, 3, 2, 0)));
        s.pause().expect("pause");
        assert_matches!(s.ensure_submittable(), Err(CoreError::Conflict(_)));

        s.resume(at(2026, 3, 5, 0)).expect("resume");
        assert_eq!(s.activated_at, Some(at(2026, 3, 2, 0)));
    }

    #[test]
    fn paused_before_start_can_still_be_submitted() {
        let mut s = schedule();
        s.pause().expect("pause");
        assert!(s.ensure_submittable().is_ok());
    }

    #[test]
    fn rejected_schedule_cannot_resume() {
        let mut s = schedule();
        s.status = ScheduleStatus::Paused;
        s.approval_status = Some(ApprovalStatus::Rejected);
        assert_matches!(s.resume(at(2026, 3, 3, 0)), Err(CoreError::Conflict(_)));
        assert_eq!(s.status, ScheduleStatus::Paused);
    }

    #[test]
    fn pause_completed_is_conflict() {
        let mut s = schedule();
        s.status = ScheduleStatus::Completed;
        assert_matches!(s.pause(), Err(CoreError::Conflict(_)));
    }

    // -- Recurrence ---------------------------------------------------------

    #[test]
    fn weekly_recurs_on_start_weekday() {
        // 2026-03-01 is a Sunday.
        let mut s = schedule().with_recurrence(Recurrence::Weekly);
        s.status = ScheduleStatus::Active;
        assert!(s.is_on_air(at(2026, 3, 8, 10)));
        assert!(!s.is_on_air(at(2026, 3, 9, 10)));
    }

    #[test]
    fn monthly_clamps_to_last_day() {
        let mut s = PlannedSchedule::new(
            ScheduleType::Simple,
            "m1",
            vec![],
            at(2026, 1, 31, 0),
            at(2026, 12, 31, 0),
        )
        .with_recurrence(Recurrence::Monthly);
        s.status = ScheduleStatus::Active;
        assert!(s.is_on_air(at(2026, 2, 28, 9)));
        assert!(!s.is_on_air(at(2026, 2, 27, 9)));
        assert!(s.is_on_air(at(2026, 3, 31, 9)));
    }

    #[test]
    fn not_on_air_unless_active() {
        let s = schedule();
        assert!(!s.is_on_air(at(2026, 3, 10, 0)));
    }

    #[test]
    fn serializes_type_and_status_snake_case() {
        let mut s = schedule();
        s.status = ScheduleStatus::PendingApproval;
        let json = serde_json::to_value(&s).expect("serialize");
        assert_eq!(json["type"], "day_sequence");
        assert_eq!(json["status"], "pending_approval");
        assert_eq!(json["recurrence"], "once");
    }
}
