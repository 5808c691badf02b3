//! Mapping from core session events and data-quality warnings to
//! [`SignageEvent`]s. The payload is always the serialized core event.

use serde_json::json;
use zonecast_core::session::{DataQualityWarning, SessionEvent};
use zonecast_core::types::Timestamp;

use crate::bus::SignageEvent;

pub const APPROVAL_REQUESTED: &str = "approval.requested";
pub const APPROVAL_APPROVED: &str = "approval.approved";
pub const APPROVAL_REJECTED: &str = "approval.rejected";
pub const SCHEDULE_CREATED: &str = "schedule.created";
pub const SCHEDULE_STATUS_CHANGED: &str = "schedule.status_changed";
pub const SCHEDULE_DELETED: &str = "schedule.deleted";
pub const QUICKPLAY_STARTED: &str = "quickplay.started";
pub const QUICKPLAY_PAUSED: &str = "quickplay.paused";
pub const QUICKPLAY_RESUMED: &str = "quickplay.resumed";
pub const QUICKPLAY_CANCELLED: &str = "quickplay.cancelled";
pub const QUICKPLAY_COMPLETED: &str = "quickplay.completed";
pub const ORG_CONTROLS_CHANGED: &str = "org.controls_changed";
pub const DAY_SEQUENCE_SAVED: &str = "day_sequence.saved";
pub const CAMPAIGN_SAVED: &str = "campaign.saved";
pub const DATA_QUALITY_WARNING: &str = "data_quality.warning";

/// Convert a session event. `actor_id` is the user whose command produced
/// it, or `None` for clock-driven events.
pub fn from_session_event(
    event: &SessionEvent,
    actor_id: Option<&str>,
    at: Timestamp,
) -> SignageEvent {
    let payload = serde_json::to_value(event).unwrap_or_else(|_| json!({}));

    let signage = match event {
        SessionEvent::ScheduleCreated { schedule_id, .. } => {
            SignageEvent::new(SCHEDULE_CREATED, at).with_source("schedule", schedule_id.as_str())
        }
        SessionEvent::ScheduleStatusChanged { schedule_id, .. } => {
            SignageEvent::new(SCHEDULE_STATUS_CHANGED, at)
                .with_source("schedule", schedule_id.as_str())
        }
        SessionEvent::ScheduleDeleted { schedule_id } => {
            SignageEvent::new(SCHEDULE_DELETED, at).with_source("schedule", schedule_id.as_str())
        }
        SessionEvent::ApprovalRequested { schedule_id, .. } => {
            SignageEvent::new(APPROVAL_REQUESTED, at).with_source("schedule", schedule_id.as_str())
        }
        SessionEvent::ApprovalDecided { schedule_id, status, .. } => {
            let event_type = match status {
                zonecast_core::approval::ApprovalStatus::Rejected => APPROVAL_REJECTED,
                _ => APPROVAL_APPROVED,
            };
            SignageEvent::new(event_type, at).with_source("schedule", schedule_id.as_str())
        }
        SessionEvent::QuickplayStarted { publish_id, .. } => {
            SignageEvent::new(QUICKPLAY_STARTED, at).with_source("quickplay", publish_id.as_str())
        }
        SessionEvent::QuickplayPaused { publish_id } => {
            SignageEvent::new(QUICKPLAY_PAUSED, at).with_source("quickplay", publish_id.as_str())
        }
        SessionEvent::QuickplayResumed { publish_id } => {
            SignageEvent::new(QUICKPLAY_RESUMED, at).with_source("quickplay", publish_id.as_str())
        }
        SessionEvent::QuickplayCancelled { publish_id } => {
            SignageEvent::new(QUICKPLAY_CANCELLED, at).with_source("quickplay", publish_id.as_str())
        }
        SessionEvent::QuickplayCompleted { publish_id, .. } => {
            SignageEvent::new(QUICKPLAY_COMPLETED, at).with_source("quickplay", publish_id.as_str())
        }
        SessionEvent::OrgControlsChanged { .. } => SignageEvent::new(ORG_CONTROLS_CHANGED, at),
        SessionEvent::DaySequenceSaved { sequence_id } => SignageEvent::new(DAY_SEQUENCE_SAVED, at)
            .with_source("day_sequence", sequence_id.as_str()),
        SessionEvent::CampaignSaved { campaign_id } => {
            SignageEvent::new(CAMPAIGN_SAVED, at).with_source("campaign", campaign_id.as_str())
        }
    };

    let signage = signage.with_payload(payload);
    match actor_id {
        Some(actor) => signage.with_actor(actor),
        None => signage,
    }
}

pub fn from_data_quality_warning(warning: &DataQualityWarning, at: Timestamp) -> SignageEvent {
    let source = match warning {
        DataQualityWarning::InvertedScheduleWindow { schedule_id }
        | DataQualityWarning::UntargetedSchedule { schedule_id }
        | DataQualityWarning::MissingApprovalRequest { schedule_id }
        | DataQualityWarning::DuplicatePendingApproval { schedule_id }
        | DataQualityWarning::ResubmittedAfterAir { schedule_id }
        | DataQualityWarning::MissingScheduleContent { schedule_id, .. } => {
            ("schedule", schedule_id)
        }
        DataQualityWarning::OrphanApproval { request_id, .. } => ("approval_request", request_id),
    };
    SignageEvent::new(DATA_QUALITY_WARNING, at)
        .with_source(source.0, source.1.as_str())
        .with_payload(serde_json::to_value(warning).unwrap_or_else(|_| json!({})))
}
