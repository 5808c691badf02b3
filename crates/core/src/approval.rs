//! Approval workflow for planned schedules under org-level controls.
//!
//! A request moves `pending -> approved | rejected` and is terminal after
//! that. Every operation validates all of its preconditions before touching
//! either the request or the schedule, so a failed call leaves both
//! unchanged.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::planned::{state_machine, PlannedSchedule, ScheduleStatus};
use crate::roles::Actor;
use crate::types::{new_id, EntityId, Timestamp};

/// Maximum length of a reviewer comment.
pub const MAX_COMMENT_LENGTH: usize = 2_000;

/// Status of an approval request, mirrored onto the schedule's
/// `approval_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: EntityId,
    pub schedule_id: EntityId,
    pub requested_by: EntityId,
    pub requested_at: Timestamp,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub reviewed_by: Option<EntityId>,
    #[serde(default)]
    pub reviewed_at: Option<Timestamp>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ApprovalRequest {
    fn new(schedule_id: &str, requested_by: &str, now: Timestamp) -> Self {
        Self {
            id: new_id(),
            schedule_id: schedule_id.to_string(),
            requested_by: requested_by.to_string(),
            requested_at: now,
            status: ApprovalStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            comment: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}

/// Reject comments longer than [`MAX_COMMENT_LENGTH`] characters.
pub fn validate_comment(comment: Option<&str>) -> Result<(), CoreError> {
    match comment {
        Some(c) if c.chars().count() > MAX_COMMENT_LENGTH => Err(CoreError::Validation(format!(
            "Comment exceeds {MAX_COMMENT_LENGTH} characters"
        ))),
        _ => Ok(()),
    }
}

/// Submit `schedule` for review.
///
/// Requires publish capability, no other pending request for the schedule,
/// and a schedule that has not started yet (`scheduled` or `paused`).
pub fn submit(
    schedule: &mut PlannedSchedule,
    existing: &[ApprovalRequest],
    actor: &Actor,
    now: Timestamp,
) -> Result<ApprovalRequest, CoreError> {
    actor.require_publisher()?;

    if existing
        .iter()
        .any(|r| r.schedule_id == schedule.id && r.is_pending())
    {
        return Err(CoreError::Conflict(format!(
            "Schedule {} already has a pending approval request",
            schedule.id
        )));
    }
    schedule.ensure_submittable()?;

    let request = ApprovalRequest::new(&schedule.id, &actor.id, now);
    schedule.status = ScheduleStatus::PendingApproval;
    schedule.approval_status = Some(ApprovalStatus::Pending);

    tracing::info!(
        schedule_id = %schedule.id,
        request_id = %request.id,
        requested_by = %actor.id,
        "Schedule submitted for approval"
    );
    Ok(request)
}

/// Approve a pending request: the schedule becomes `scheduled`.
pub fn approve(
    request: &mut ApprovalRequest,
    schedule: &mut PlannedSchedule,
    actor: &Actor,
    comment: Option<&str>,
    now: Timestamp,
) -> Result<(), CoreError> {
    decide(
        request,
        schedule,
        actor,
        comment,
        now,
        ApprovalStatus::Approved,
        ScheduleStatus::Scheduled,
    )
}

/// Reject a pending request: the schedule becomes `paused`.
pub fn reject(
    request: &mut ApprovalRequest,
    schedule: &mut PlannedSchedule,
    actor: &Actor,
    comment: Option<&str>,
    now: Timestamp,
) -> Result<(), CoreError> {
    decide(
        request,
        schedule,
        actor,
        comment,
        now,
        ApprovalStatus::Rejected,
        ScheduleStatus::Paused,
    )
}

fn decide(
    request: &mut ApprovalRequest,
    schedule: &mut PlannedSchedule,
    actor: &Actor,
    comment: Option<&str>,
    now: Timestamp,
    decision: ApprovalStatus,
    schedule_status: ScheduleStatus,
) -> Result<(), CoreError> {
    actor.require_reviewer()?;
    validate_comment(comment)?;

    if request.status.is_terminal() {
        return Err(CoreError::Conflict(format!(
            "Approval request {} was already {}",
            request.id,
            match request.status {
                ApprovalStatus::Approved => "approved",
                _ => "rejected",
            }
        )));
    }
    if request.schedule_id != schedule.id {
        return Err(CoreError::Internal(format!(
            "Approval request {} does not belong to schedule {}",
            request.id, schedule.id
        )));
    }
    state_machine::validate_transition(schedule.status, schedule_status)?;

    request.status = decision;
    request.reviewed_by = Some(actor.id.clone());
    request.reviewed_at = Some(now);
    request.comment = comment.map(str::to_string);

    schedule.status = schedule_status;
    schedule.approval_status = Some(decision);

    tracing::info!(
        schedule_id = %schedule.id,
        request_id = %request.id,
        reviewed_by = %actor.id,
        decision = ?decision,
        "Approval request decided"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
