//! The publishing session: quickplays, planned schedules and approval
//! requests for one organization, mutated only through [`Command`]s.
//!
//! Every command either succeeds and returns the [`SessionEvent`]s it
//! produced, or fails with a [`CoreError`] and leaves the session exactly as
//! it was. Clock-driven changes go through [`Session::tick_countdown`],
//! [`Session::tick_quickplay`] and [`Session::advance_schedules`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::approval::{self, ApprovalRequest, ApprovalStatus};
use crate::composition::Campaign;
use crate::day_sequence::DaySequence;
use crate::error::CoreError;
use crate::orchestrator::{self, ActiveContent, Catalog};
use crate::planned::{PlannedSchedule, ScheduleStatus, ScheduleType};
use crate::quickplay::{self, DirectPublish};
use crate::roles::Actor;
use crate::types::{EntityId, Timestamp};

/// Maximum number of undo entries kept by [`History`].
pub const MAX_HISTORY_DEPTH: usize = 100;

/// Commands that cannot be undone. Approval decisions are final and a
/// submitted request can only be withdrawn by rejecting it.
pub const NON_UNDOABLE_COMMANDS: &[&str] =
    &["submit_for_approval", "approve_request", "reject_request"];

/// Returns `true` if the named command cannot be undone.
pub fn is_non_undoable(command: &str) -> bool {
    NON_UNDOABLE_COMMANDS.contains(&command)
}

// ---------------------------------------------------------------------------
// Commands and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    CreateSchedule {
        schedule: PlannedSchedule,
    },
    SubmitForApproval {
        schedule_id: EntityId,
    },
    ApproveRequest {
        request_id: EntityId,
        #[serde(default)]
        comment: Option<String>,
    },
    RejectRequest {
        request_id: EntityId,
        #[serde(default)]
        comment: Option<String>,
    },
    PauseSchedule {
        schedule_id: EntityId,
    },
    ResumeSchedule {
        schedule_id: EntityId,
    },
    DeleteSchedule {
        schedule_id: EntityId,
    },
    StartQuickplay {
        content_id: EntityId,
        target_screens: Vec<EntityId>,
        duration_minutes: u32,
        #[serde(rename = "override", default)]
        overrides_schedules: bool,
        #[serde(default)]
        is_default: bool,
    },
    PauseQuickplay {
        publish_id: EntityId,
    },
    ResumeQuickplay {
        publish_id: EntityId,
    },
    CancelQuickplay {
        publish_id: EntityId,
    },
    SetOrgControls {
        enabled: bool,
    },
    SaveDaySequence {
        sequence: DaySequence,
    },
    SaveCampaign {
        campaign: Campaign,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateSchedule { .. } => "create_schedule",
            Command::SubmitForApproval { .. } => "submit_for_approval",
            Command::ApproveRequest { .. } => "approve_request",
            Command::RejectRequest { .. } => "reject_request",
            Command::PauseSchedule { .. } => "pause_schedule",
            Command::ResumeSchedule { .. } => "resume_schedule",
            Command::DeleteSchedule { .. } => "delete_schedule",
            Command::StartQuickplay { .. } => "start_quickplay",
            Command::PauseQuickplay { .. } => "pause_quickplay",
            Command::ResumeQuickplay { .. } => "resume_quickplay",
            Command::CancelQuickplay { .. } => "cancel_quickplay",
            Command::SetOrgControls { .. } => "set_org_controls",
            Command::SaveDaySequence { .. } => "save_day_sequence",
            Command::SaveCampaign { .. } => "save_campaign",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ScheduleCreated {
        schedule_id: EntityId,
        status: ScheduleStatus,
    },
    ScheduleStatusChanged {
        schedule_id: EntityId,
        from: ScheduleStatus,
        to: ScheduleStatus,
    },
    ScheduleDeleted {
        schedule_id: EntityId,
    },
    ApprovalRequested {
        request_id: EntityId,
        schedule_id: EntityId,
        requested_by: EntityId,
    },
    ApprovalDecided {
        request_id: EntityId,
        schedule_id: EntityId,
        status: ApprovalStatus,
        reviewed_by: EntityId,
        comment: Option<String>,
    },
    QuickplayStarted {
        publish_id: EntityId,
        content_id: EntityId,
    },
    QuickplayPaused {
        publish_id: EntityId,
    },
    QuickplayResumed {
        publish_id: EntityId,
    },
    QuickplayCancelled {
        publish_id: EntityId,
    },
    QuickplayCompleted {
        publish_id: EntityId,
        content_id: EntityId,
        completed_at: Timestamp,
    },
    OrgControlsChanged {
        enabled: bool,
    },
    DaySequenceSaved {
        sequence_id: EntityId,
    },
    CampaignSaved {
        campaign_id: EntityId,
    },
}

/// Inconsistencies found in a loaded session. Commands never produce them;
/// they come from hand-edited or stale snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    InvertedScheduleWindow { schedule_id: EntityId },
    UntargetedSchedule { schedule_id: EntityId },
    OrphanApproval { request_id: EntityId, schedule_id: EntityId },
    MissingApprovalRequest { schedule_id: EntityId },
    DuplicatePendingApproval { schedule_id: EntityId },
    /// A day-sequence or campaign schedule whose content is not in the
    /// session.
    MissingScheduleContent { schedule_id: EntityId, content_id: EntityId },
    /// A schedule that went on air and is now waiting for approval again.
    ResubmittedAfterAir { schedule_id: EntityId },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub directs: Vec<DirectPublish>,
    #[serde(default)]
    pub schedules: Vec<PlannedSchedule>,
    #[serde(default)]
    pub approvals: Vec<ApprovalRequest>,
    #[serde(default)]
    pub org_controls_enabled: bool,
    #[serde(default)]
    pub day_sequences: Vec<DaySequence>,
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
}

impl Session {
    pub fn new(org_controls_enabled: bool) -> Self {
        Self {
            org_controls_enabled,
            ..Self::default()
        }
    }

    pub fn schedule(&self, id: &str) -> Option<&PlannedSchedule> {
        self.schedules.iter().find(|s| s.id == id)
    }

    pub fn direct(&self, id: &str) -> Option<&DirectPublish> {
        self.directs.iter().find(|d| d.id == id)
    }

    pub fn approval(&self, id: &str) -> Option<&ApprovalRequest> {
        self.approvals.iter().find(|r| r.id == id)
    }

    pub fn day_sequence(&self, id: &str) -> Option<&DaySequence> {
        self.day_sequences.iter().find(|d| d.id == id)
    }

    pub fn campaign(&self, id: &str) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog {
            day_sequences: &self.day_sequences,
            campaigns: &self.campaigns,
        }
    }

    /// Pending approval requests, oldest first.
    pub fn pending_approvals(&self) -> impl Iterator<Item = &ApprovalRequest> {
        self.approvals.iter().filter(|r| r.is_pending())
    }

    /// Apply `command` on behalf of `actor`.
    ///
    /// On error nothing changes.
    pub fn apply(
        &mut self,
        actor: &Actor,
        command: Command,
        now: Timestamp,
    ) -> Result<Vec<SessionEvent>, CoreError> {
        let (next, events) = self.apply_snapshot(actor, command, now)?;
        *self = next;
        Ok(events)
    }

    /// Apply `command` to a copy of the session and return the new snapshot.
    pub fn apply_snapshot(
        &self,
        actor: &Actor,
        command: Command,
        now: Timestamp,
    ) -> Result<(Session, Vec<SessionEvent>), CoreError> {
        let name = command.name();
        let mut next = self.clone();
        match next.execute(actor, command, now) {
            Ok(events) => {
                tracing::debug!(
                    command = name,
                    actor = %actor.id,
                    events = events.len(),
                    "Command applied"
                );
                Ok((next, events))
            }
            Err(e) => {
                tracing::debug!(command = name, actor = %actor.id, error = %e, "Command rejected");
                Err(e)
            }
        }
    }

    fn execute(
        &mut self,
        actor: &Actor,
        command: Command,
        now: Timestamp,
    ) -> Result<Vec<SessionEvent>, CoreError> {
        match command {
            Command::CreateSchedule { schedule } => self.create_schedule(actor, schedule, now),
            Command::SubmitForApproval { schedule_id } => {
                actor.require_publisher()?;
                if !self.org_controls_enabled {
                    return Err(CoreError::Conflict(
                        "Approval workflow is disabled for this organization".to_string(),
                    ));
                }
                self.submit_for_approval(actor, &schedule_id, now)
            }
            Command::ApproveRequest { request_id, comment } => {
                self.decide(actor, &request_id, comment.as_deref(), now, true)
            }
            Command::RejectRequest { request_id, comment } => {
                self.decide(actor, &request_id, comment.as_deref(), now, false)
            }
            Command::PauseSchedule { schedule_id } => {
                actor.require_publisher()?;
                let s = self.schedule_mut(&schedule_id)?;
                let from = s.status;
                s.pause()?;
                Ok(vec![status_changed(s, from)])
            }
            Command::ResumeSchedule { schedule_id } => {
                actor.require_publisher()?;
                let s = self.schedule_mut(&schedule_id)?;
                let from = s.status;
                s.resume(now)?;
                Ok(vec![status_changed(s, from)])
            }
            Command::DeleteSchedule { schedule_id } => {
                actor.require_publisher()?;
                let index = self
                    .schedules
                    .iter()
                    .position(|s| s.id == schedule_id)
                    .ok_or_else(|| CoreError::not_found("schedule", schedule_id.as_str()))?;
                self.schedules.remove(index);
                self.approvals
                    .retain(|r| !(r.schedule_id == schedule_id && r.is_pending()));
                Ok(vec![SessionEvent::ScheduleDeleted { schedule_id }])
            }
            Command::StartQuickplay {
                content_id,
                target_screens,
                duration_minutes,
                overrides_schedules,
                is_default,
            } => {
                actor.require_publisher()?;
                if target_screens.is_empty() {
                    return Err(CoreError::Validation(
                        "Quickplay needs at least one target screen".to_string(),
                    ));
                }
                let publish = DirectPublish::new(content_id, target_screens, duration_minutes, now)?
                    .with_override(overrides_schedules)
                    .as_default(is_default);
                let event = SessionEvent::QuickplayStarted {
                    publish_id: publish.id.clone(),
                    content_id: publish.content_id.clone(),
                };
                self.directs.push(publish);
                Ok(vec![event])
            }
            Command::PauseQuickplay { publish_id } => {
                actor.require_publisher()?;
                self.direct_mut(&publish_id)?.pause()?;
                Ok(vec![SessionEvent::QuickplayPaused { publish_id }])
            }
            Command::ResumeQuickplay { publish_id } => {
                actor.require_publisher()?;
                self.direct_mut(&publish_id)?.resume()?;
                Ok(vec![SessionEvent::QuickplayResumed { publish_id }])
            }
            Command::CancelQuickplay { publish_id } => {
                actor.require_publisher()?;
                let index = self
                    .directs
                    .iter()
                    .position(|d| d.id == publish_id)
                    .ok_or_else(|| CoreError::not_found("quickplay", publish_id.as_str()))?;
                self.directs.remove(index);
                Ok(vec![SessionEvent::QuickplayCancelled { publish_id }])
            }
            Command::SetOrgControls { enabled } => {
                actor.require_admin()?;
                if self.org_controls_enabled == enabled {
                    return Ok(Vec::new());
                }
                self.org_controls_enabled = enabled;
                Ok(vec![SessionEvent::OrgControlsChanged { enabled }])
            }
            Command::SaveDaySequence { sequence } => {
                actor.require_publisher()?;
                let warnings = sequence.validate();
                if !warnings.is_empty() {
                    tracing::info!(
                        sequence_id = %sequence.id,
                        warning_count = warnings.len(),
                        "Saving day sequence with slot warnings"
                    );
                }
                let sequence_id = sequence.id.clone();
                upsert(&mut self.day_sequences, sequence, |d| &d.id);
                Ok(vec![SessionEvent::DaySequenceSaved { sequence_id }])
            }
            Command::SaveCampaign { campaign } => {
                actor.require_publisher()?;
                campaign
                    .validate()
                    .map_err(|e| CoreError::Validation(format!("Invalid campaign: {e}")))?;
                if campaign.composition_ids.is_empty() {
                    return Err(CoreError::Validation(
                        "A campaign needs at least one composition".to_string(),
                    ));
                }
                if let Some(warning) = campaign.weight_warning() {
                    tracing::info!(
                        campaign_id = %campaign.id,
                        ?warning,
                        "Campaign weights do not total 100%"
                    );
                }
                let campaign_id = campaign.id.clone();
                upsert(&mut self.campaigns, campaign, |c| &c.id);
                Ok(vec![SessionEvent::CampaignSaved { campaign_id }])
            }
        }
    }

    fn schedule_mut(&mut self, id: &str) -> Result<&mut PlannedSchedule, CoreError> {
        self.schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::not_found("schedule", id))
    }

    fn direct_mut(&mut self, id: &str) -> Result<&mut DirectPublish, CoreError> {
        self.directs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| CoreError::not_found("quickplay", id))
    }

    /// New schedules start `scheduled`. Under org controls they are
    /// submitted for approval straight away.
    fn create_schedule(
        &mut self,
        actor: &Actor,
        mut schedule: PlannedSchedule,
        now: Timestamp,
    ) -> Result<Vec<SessionEvent>, CoreError> {
        actor.require_publisher()?;
        if schedule.end_date < schedule.start_date {
            return Err(CoreError::Validation(
                "Schedule end date is before its start date".to_string(),
            ));
        }
        if schedule.target_screens.is_empty() {
            return Err(CoreError::Validation(
                "Schedule needs at least one target screen".to_string(),
            ));
        }
        if self.schedule(&schedule.id).is_some() {
            return Err(CoreError::Conflict(format!(
                "Schedule {} already exists",
                schedule.id
            )));
        }

        schedule.status = ScheduleStatus::Scheduled;
        schedule.approval_status = None;
        schedule.activated_at = None;
        let schedule_id = schedule.id.clone();
        self.schedules.push(schedule);

        let mut events = Vec::new();
        if self.org_controls_enabled {
            events.extend(self.submit_for_approval(actor, &schedule_id, now)?);
        }
        let status = self.schedule_mut(&schedule_id)?.status;
        events.insert(0, SessionEvent::ScheduleCreated { schedule_id, status });
        Ok(events)
    }

    fn submit_for_approval(
        &mut self,
        actor: &Actor,
        schedule_id: &str,
        now: Timestamp,
    ) -> Result<Vec<SessionEvent>, CoreError> {
        let index = self
            .schedules
            .iter()
            .position(|s| s.id == schedule_id)
            .ok_or_else(|| CoreError::not_found("schedule", schedule_id))?;
        let from = self.schedules[index].status;
        let request = approval::submit(&mut self.schedules[index], &self.approvals, actor, now)?;

        let events = vec![
            status_changed(&self.schedules[index], from),
            SessionEvent::ApprovalRequested {
                request_id: request.id.clone(),
                schedule_id: request.schedule_id.clone(),
                requested_by: request.requested_by.clone(),
            },
        ];
        self.approvals.push(request);
        Ok(events)
    }

    fn decide(
        &mut self,
        actor: &Actor,
        request_id: &str,
        comment: Option<&str>,
        now: Timestamp,
        approve: bool,
    ) -> Result<Vec<SessionEvent>, CoreError> {
        let request_index = self
            .approvals
            .iter()
            .position(|r| r.id == request_id)
            .ok_or_else(|| CoreError::not_found("approval_request", request_id))?;
        let schedule_id = self.approvals[request_index].schedule_id.clone();
        let schedule_index = self
            .schedules
            .iter()
            .position(|s| s.id == schedule_id)
            .ok_or_else(|| CoreError::not_found("schedule", schedule_id.as_str()))?;

        let request = &mut self.approvals[request_index];
        let schedule = &mut self.schedules[schedule_index];
        let from = schedule.status;
        if approve {
            approval::approve(request, schedule, actor, comment, now)?;
        } else {
            approval::reject(request, schedule, actor, comment, now)?;
        }

        Ok(vec![
            status_changed(schedule, from),
            SessionEvent::ApprovalDecided {
                request_id: request.id.clone(),
                schedule_id,
                status: request.status,
                reviewed_by: actor.id.clone(),
                comment: request.comment.clone(),
            },
        ])
    }

    // -- Clock-driven -------------------------------------------------------

    /// One countdown second for every quickplay. Completed ones are removed.
    pub fn tick_countdown(&mut self, now: Timestamp) -> Vec<SessionEvent> {
        quickplay::tick_all(&mut self.directs)
            .into_iter()
            .map(|p| completed(p, now))
            .collect()
    }

    /// One countdown second for a single quickplay, as fired by its own
    /// timer. Unknown ids are ignored.
    pub fn tick_quickplay(&mut self, publish_id: &str, now: Timestamp) -> Vec<SessionEvent> {
        let Some(index) = self.directs.iter().position(|d| d.id == publish_id) else {
            return Vec::new();
        };
        if self.directs[index].tick() {
            let publish = self.directs.remove(index);
            return vec![completed(publish, now)];
        }
        Vec::new()
    }

    /// Start and complete planned schedules whose dates have been reached.
    pub fn advance_schedules(&mut self, now: Timestamp) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for s in &mut self.schedules {
            let from = s.status;
            if let Some(to) = s.advance(now) {
                tracing::info!(
                    schedule_id = %s.id,
                    from = from.as_str(),
                    to = to.as_str(),
                    "Schedule advanced"
                );
                events.push(SessionEvent::ScheduleStatusChanged {
                    schedule_id: s.id.clone(),
                    from,
                    to,
                });
            }
        }
        events
    }

    /// Check a loaded session for records that commands could not have
    /// produced.
    pub fn audit(&self) -> Vec<DataQualityWarning> {
        let mut warnings = Vec::new();
        for s in &self.schedules {
            if s.end_date < s.start_date {
                warnings.push(DataQualityWarning::InvertedScheduleWindow {
                    schedule_id: s.id.clone(),
                });
            }
            if s.target_screens.is_empty() {
                warnings.push(DataQualityWarning::UntargetedSchedule {
                    schedule_id: s.id.clone(),
                });
            }
            let pending = self
                .pending_approvals()
                .filter(|r| r.schedule_id == s.id)
                .count();
            if s.status == ScheduleStatus::PendingApproval && pending == 0 {
                warnings.push(DataQualityWarning::MissingApprovalRequest {
                    schedule_id: s.id.clone(),
                });
            }
            if pending > 1 {
                warnings.push(DataQualityWarning::DuplicatePendingApproval {
                    schedule_id: s.id.clone(),
                });
            }
            if s.status == ScheduleStatus::PendingApproval && s.has_been_active() {
                warnings.push(DataQualityWarning::ResubmittedAfterAir {
                    schedule_id: s.id.clone(),
                });
            }
            let content_known = match s.schedule_type {
                ScheduleType::Simple => true,
                ScheduleType::DaySequence => self.day_sequence(&s.content_id).is_some(),
                ScheduleType::Campaign => self.campaign(&s.content_id).is_some(),
            };
            if !content_known {
                warnings.push(DataQualityWarning::MissingScheduleContent {
                    schedule_id: s.id.clone(),
                    content_id: s.content_id.clone(),
                });
            }
        }
        for r in &self.approvals {
            if self.schedule(&r.schedule_id).is_none() && r.is_pending() {
                warnings.push(DataQualityWarning::OrphanApproval {
                    request_id: r.id.clone(),
                    schedule_id: r.schedule_id.clone(),
                });
            }
        }
        for w in &warnings {
            tracing::warn!(warning = ?w, "Session data-quality warning");
        }
        warnings
    }

    /// What `screen_id` plays at `now`.
    pub fn resolve_screen(&self, screen_id: &str, now: Timestamp) -> ActiveContent {
        let catalog = self.catalog();
        orchestrator::resolve_screen(screen_id, &self.directs, &self.schedules, &catalog, now)
    }
}

/// Replace the entry with the same id, or append.
fn upsert<T>(list: &mut Vec<T>, item: T, id: impl Fn(&T) -> &EntityId) {
    match list.iter().position(|x| id(x) == id(&item)) {
        Some(index) => list[index] = item,
        None => list.push(item),
    }
}

/// Put `state` in place of the entry `id`, or remove the entry when `state`
/// is `None`.
fn put<T>(list: &mut Vec<T>, id: &str, state: Option<T>, key: impl Fn(&T) -> &EntityId) {
    let index = list.iter().position(|x| key(x) == id);
    match (state, index) {
        (Some(item), Some(i)) => list[i] = item,
        (Some(item), None) => list.push(item),
        (None, Some(i)) => {
            list.remove(i);
        }
        (None, None) => {}
    }
}

fn status_changed(schedule: &PlannedSchedule, from: ScheduleStatus) -> SessionEvent {
    SessionEvent::ScheduleStatusChanged {
        schedule_id: schedule.id.clone(),
        from,
        to: schedule.status,
    }
}

fn completed(publish: DirectPublish, now: Timestamp) -> SessionEvent {
    tracing::info!(
        publish_id = %publish.id,
        content_id = %publish.content_id,
        "Quickplay completed"
    );
    SessionEvent::QuickplayCompleted {
        publish_id: publish.id,
        content_id: publish.content_id,
        completed_at: now,
    }
}

// ---------------------------------------------------------------------------
// Undo / redo
// ---------------------------------------------------------------------------

/// The part of the session one command touched, as it stood at one point.
#[derive(Debug, Clone)]
enum Record {
    Schedule {
        id: EntityId,
        state: Option<PlannedSchedule>,
    },
    Quickplay {
        id: EntityId,
        state: Option<DirectPublish>,
    },
    DaySequence {
        id: EntityId,
        state: Option<DaySequence>,
    },
    Campaign {
        id: EntityId,
        state: Option<Campaign>,
    },
    OrgControls {
        enabled: bool,
    },
}

impl Record {
    /// The record an event's command touched, captured from `session`.
    fn touched_by(event: &SessionEvent, session: &Session) -> Option<Record> {
        let blank = match event {
            SessionEvent::ScheduleCreated { schedule_id, .. }
            | SessionEvent::ScheduleStatusChanged { schedule_id, .. }
            | SessionEvent::ScheduleDeleted { schedule_id } => Record::Schedule {
                id: schedule_id.clone(),
                state: None,
            },
            SessionEvent::QuickplayStarted { publish_id, .. }
            | SessionEvent::QuickplayPaused { publish_id }
            | SessionEvent::QuickplayResumed { publish_id }
            | SessionEvent::QuickplayCancelled { publish_id } => Record::Quickplay {
                id: publish_id.clone(),
                state: None,
            },
            SessionEvent::DaySequenceSaved { sequence_id } => Record::DaySequence {
                id: sequence_id.clone(),
                state: None,
            },
            SessionEvent::CampaignSaved { campaign_id } => Record::Campaign {
                id: campaign_id.clone(),
                state: None,
            },
            SessionEvent::OrgControlsChanged { enabled } => {
                Record::OrgControls { enabled: *enabled }
            }
            SessionEvent::ApprovalRequested { .. }
            | SessionEvent::ApprovalDecided { .. }
            | SessionEvent::QuickplayCompleted { .. } => return None,
        };
        Some(blank.recapture(session))
    }

    /// The same record with its state as it is in `session` now.
    fn recapture(&self, session: &Session) -> Record {
        match self {
            Record::Schedule { id, .. } => Record::Schedule {
                id: id.clone(),
                state: session.schedule(id).cloned(),
            },
            Record::Quickplay { id, .. } => Record::Quickplay {
                id: id.clone(),
                state: session.direct(id).cloned(),
            },
            Record::DaySequence { id, .. } => Record::DaySequence {
                id: id.clone(),
                state: session.day_sequence(id).cloned(),
            },
            Record::Campaign { id, .. } => Record::Campaign {
                id: id.clone(),
                state: session.campaign(id).cloned(),
            },
            Record::OrgControls { .. } => Record::OrgControls {
                enabled: session.org_controls_enabled,
            },
        }
    }

    fn authorize(&self, actor: &Actor) -> Result<(), CoreError> {
        match self {
            Record::OrgControls { .. } => actor.require_admin(),
            _ => actor.require_publisher(),
        }
    }

    /// Write this record back into `session`. `from` is the state the entry
    /// expected to find; anything the clock changed since is kept.
    fn restore(&self, session: &mut Session, from: &Record) {
        match self {
            Record::Schedule { id, state } => {
                let current = session.schedule(id).cloned();
                let state = match (state.clone(), current) {
                    (Some(_), Some(current)) if current.status == ScheduleStatus::Completed => {
                        tracing::debug!(schedule_id = %id, "Schedule has completed, not restored");
                        return;
                    }
                    (Some(mut target), Some(current)) => {
                        target.activated_at = current.activated_at.or(target.activated_at);
                        Some(target)
                    }
                    (target, _) => target,
                };
                put(&mut session.schedules, id, state, |s| &s.id);
            }
            Record::Quickplay { id, state } => {
                let current = session.direct(id).map(|d| d.remaining_time);
                let expected_absent = matches!(from, Record::Quickplay { state: None, .. });
                let state = match (state.clone(), current) {
                    (Some(mut target), Some(remaining)) => {
                        target.remaining_time = remaining;
                        Some(target)
                    }
                    (Some(_), None) if !expected_absent => {
                        tracing::debug!(publish_id = %id, "Quickplay has completed, not restored");
                        return;
                    }
                    (target, _) => target,
                };
                put(&mut session.directs, id, state, |d| &d.id);
            }
            Record::DaySequence { id, state } => {
                put(&mut session.day_sequences, id, state.clone(), |d| &d.id);
            }
            Record::Campaign { id, state } => {
                put(&mut session.campaigns, id, state.clone(), |c| &c.id);
            }
            Record::OrgControls { enabled } => session.org_controls_enabled = *enabled,
        }
    }
}

/// One undoable step: the touched record before and after it.
#[derive(Debug, Clone)]
struct Entry {
    command: &'static str,
    before: Record,
    after: Record,
}

impl Entry {
    /// Move `session` from `after` back to `before` and return the entry
    /// that reverses the move.
    fn step(self, session: &mut Session) -> Entry {
        let present = self.after.recapture(session);
        self.before.restore(session, &self.after);
        let reached = self.before.recapture(session);
        Entry {
            command: self.command,
            before: present,
            after: reached,
        }
    }
}

/// Bounded undo/redo stacks. Each entry covers only the record its command
/// touched, so quickplay countdowns and clock-driven schedule changes made
/// in between survive an undo.
///
/// Commands in [`NON_UNDOABLE_COMMANDS`], and any command that changes
/// approval requests, clear both stacks.
#[derive(Debug, Clone, Default)]
pub struct History {
    past: VecDeque<Entry>,
    future: Vec<Entry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a command and record what it touched if it succeeds.
    pub fn apply(
        &mut self,
        session: &mut Session,
        actor: &Actor,
        command: Command,
        now: Timestamp,
    ) -> Result<Vec<SessionEvent>, CoreError> {
        let name = command.name();
        let (next, events) = session.apply_snapshot(actor, command, now)?;
        let previous = std::mem::replace(session, next);

        if is_non_undoable(name) || previous.approvals != session.approvals {
            if self.can_undo() || self.can_redo() {
                tracing::debug!(command = name, "Undo history cleared");
            }
            self.clear();
            return Ok(events);
        }

        if let Some(before) = events.first().and_then(|e| Record::touched_by(e, &previous)) {
            let after = before.recapture(session);
            if self.past.len() == MAX_HISTORY_DEPTH {
                self.past.pop_front();
            }
            self.past.push_back(Entry {
                command: name,
                before,
                after,
            });
            self.future.clear();
        }
        Ok(events)
    }

    /// Revert the last recorded command. `actor` needs the same role the
    /// command needed; on error nothing changes. `Ok(false)` when there is
    /// nothing to undo.
    pub fn undo(&mut self, current: &mut Session, actor: &Actor) -> Result<bool, CoreError> {
        let Some(entry) = self.past.back() else {
            return Ok(false);
        };
        entry.before.authorize(actor)?;
        let Some(entry) = self.past.pop_back() else {
            return Ok(false);
        };
        tracing::debug!(command = entry.command, actor = %actor.id, "Undo");
        self.future.push(entry.step(current));
        Ok(true)
    }

    pub fn redo(&mut self, current: &mut Session, actor: &Actor) -> Result<bool, CoreError> {
        let Some(entry) = self.future.last() else {
            return Ok(false);
        };
        entry.before.authorize(actor)?;
        let Some(entry) = self.future.pop() else {
            return Ok(false);
        };
        tracing::debug!(command = entry.command, actor = %actor.id, "Redo");
        self.past.push_back(entry.step(current));
        Ok(true)
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.past.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planned::ScheduleType;
    use crate::roles::Role;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 4, 10, 8, 0, 0).single().expect("valid instant")
    }

    fn admin() -> Actor {
        Actor::new("admin-1", Role::Admin)
    }

    fn publisher() -> Actor {
        Actor::new("pub-1", Role::Publisher)
    }

    fn reviewer() -> Actor {
        Actor::new("rev-1", Role::Reviewer)
    }

    fn plan(content: &str) -> PlannedSchedule {
        PlannedSchedule::new(
            ScheduleType::Simple,
            content,
            vec!["screen-1".into()],
            now() + Duration::hours(1),
            now() + Duration::days(2),
        )
    }

    fn start_quickplay(minutes: u32) -> Command {
        Command::StartQuickplay {
            content_id: "media-1".into(),
            target_screens: vec!["screen-1".into()],
            duration_minutes: minutes,
            overrides_schedules: false,
            is_default: false,
        }
    }

    fn request_id(events: &[SessionEvent]) -> EntityId {
        events
            .iter()
            .find_map(|e| match e {
                SessionEvent::ApprovalRequested { request_id, .. } => Some(request_id.clone()),
                _ => None,
            })
            .expect("approval requested")
    }

    #[test]
    fn create_without_org_controls_is_scheduled() {
        let mut session = Session::new(false);
        let s = plan("c1");
        let id = s.id.clone();
        let events = session
            .apply(&publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        assert_eq!(
            events,
            vec![SessionEvent::ScheduleCreated {
                schedule_id: id.clone(),
                status: ScheduleStatus::Scheduled
            }]
        );
        assert!(session.approvals.is_empty());
        assert_eq!(session.schedule(&id).map(|s| s.status), Some(ScheduleStatus::Scheduled));
    }

    #[test]
    fn create_with_org_controls_requests_approval() {
        let mut session = Session::new(true);
        let s = plan("c1");
        let id = s.id.clone();
        let events = session
            .apply(&publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        assert_matches!(
            events.first(),
            Some(SessionEvent::ScheduleCreated { status: ScheduleStatus::PendingApproval, .. })
        );
        assert_eq!(session.pending_approvals().count(), 1);
        assert_eq!(
            session.schedule(&id).and_then(|s| s.approval_status),
            Some(ApprovalStatus::Pending)
        );
    }

    #[test]
    fn approval_round_trip_and_second_approve_conflicts() {
        let mut session = Session::new(true);
        let s = plan("c1");
        let id = s.id.clone();
        let events = session
            .apply(&publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        let request_id = request_id(&events);

        let approve = Command::ApproveRequest {
            request_id: request_id.clone(),
            comment: Some("looks good".into()),
        };
        session.apply(&reviewer(), approve.clone(), now()).expect("approve");
        assert_eq!(session.schedule(&id).map(|s| s.status), Some(ScheduleStatus::Scheduled));

        let before = session.clone();
        assert_matches!(session.apply(&reviewer(), approve, now()), Err(CoreError::Conflict(_)));
        assert_eq!(session, before);
    }

    #[test]
    fn forbidden_command_leaves_session_unchanged() {
        let mut session = Session::new(true);
        let before = session.clone();
        assert_matches!(
            session.apply(&reviewer(), Command::CreateSchedule { schedule: plan("c1") }, now()),
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            session.apply(&publisher(), Command::SetOrgControls { enabled: false }, now()),
            Err(CoreError::Forbidden(_))
        );
        assert_eq!(session, before);
    }

    #[test]
    fn rejected_schedule_can_be_resubmitted() {
        let mut session = Session::new(true);
        let s = plan("c1");
        let id = s.id.clone();
        let events = session
            .apply(&publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        session
            .apply(
                &reviewer(),
                Command::RejectRequest {
                    request_id: request_id(&events),
                    comment: None,
                },
                now(),
            )
            .expect("reject");
        assert_eq!(session.schedule(&id).map(|s| s.status), Some(ScheduleStatus::Paused));
        let resume = Command::ResumeSchedule { schedule_id: id.clone() };
        assert_matches!(
            session.apply(&publisher(), resume, now()),
            Err(CoreError::Conflict(_))
        );

        session
            .apply(&publisher(), Command::SubmitForApproval { schedule_id: id }, now())
            .expect("resubmit");
        assert_eq!(session.approvals.len(), 2);
        assert_eq!(session.pending_approvals().count(), 1);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut session = Session::new(false);
        assert_matches!(
            session.apply(&publisher(), Command::PauseSchedule { schedule_id: "x".into() }, now()),
            Err(CoreError::NotFound { entity: "schedule", .. })
        );
        assert_matches!(
            session.apply(&publisher(), Command::CancelQuickplay { publish_id: "x".into() }, now()),
            Err(CoreError::NotFound { entity: "quickplay", .. })
        );
    }

    #[test]
    fn inverted_schedule_dates_are_rejected() {
        let mut session = Session::new(false);
        let mut s = plan("c1");
        s.end_date = s.start_date - Duration::hours(1);
        assert_matches!(
            session.apply(&publisher(), Command::CreateSchedule { schedule: s }, now()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn quickplay_counts_down_to_completion() {
        let mut session = Session::new(false);
        session.apply(&publisher(), start_quickplay(10), now()).expect("start");
        assert_eq!(session.directs[0].remaining_time, 600);

        for _ in 0..599 {
            assert!(session.tick_countdown(now()).is_empty());
        }
        let events = session.tick_countdown(now());
        assert_matches!(events.as_slice(), [SessionEvent::QuickplayCompleted { .. }]);
        assert!(session.directs.is_empty());
    }

    #[test]
    fn tick_quickplay_only_touches_one_publish() {
        let mut session = Session::new(false);
        session.apply(&publisher(), start_quickplay(1), now()).expect("start");
        session.apply(&publisher(), start_quickplay(1), now()).expect("start");
        let first = session.directs[0].id.clone();
        session.tick_quickplay(&first, now());
        assert_eq!(session.directs[0].remaining_time, 59);
        assert_eq!(session.directs[1].remaining_time, 60);
        assert!(session.tick_quickplay("missing", now()).is_empty());
    }

    #[test]
    fn paused_quickplay_holds_its_remaining_time() {
        let mut session = Session::new(false);
        session.apply(&publisher(), start_quickplay(1), now()).expect("start");
        let id = session.directs[0].id.clone();
        session
            .apply(&publisher(), Command::PauseQuickplay { publish_id: id.clone() }, now())
            .expect("pause");
        for _ in 0..100 {
            session.tick_countdown(now());
        }
        assert_eq!(session.direct(&id).map(|d| d.remaining_time), Some(60));
    }

    #[test]
    fn advance_schedules_emits_transitions() {
        let mut session = Session::new(false);
        let s = plan("c1");
        let id = s.id.clone();
        session
            .apply(&publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");

        assert!(session.advance_schedules(now()).is_empty());
        let events = session.advance_schedules(now() + Duration::hours(2));
        assert_eq!(
            events,
            vec![SessionEvent::ScheduleStatusChanged {
                schedule_id: id.clone(),
                from: ScheduleStatus::Scheduled,
                to: ScheduleStatus::Active,
            }]
        );
        assert_eq!(
            session.resolve_screen("screen-1", now() + Duration::hours(2)).content_id(),
            Some("c1")
        );
    }

    #[test]
    fn delete_drops_pending_requests() {
        let mut session = Session::new(true);
        let s = plan("c1");
        let id = s.id.clone();
        session
            .apply(&publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        session
            .apply(&publisher(), Command::DeleteSchedule { schedule_id: id }, now())
            .expect("delete");
        assert!(session.schedules.is_empty());
        assert_eq!(session.pending_approvals().count(), 0);
    }

    #[test]
    fn set_org_controls_is_idempotent() {
        let mut session = Session::new(false);
        let events = session
            .apply(&admin(), Command::SetOrgControls { enabled: true }, now())
            .expect("enable");
        assert_eq!(events, vec![SessionEvent::OrgControlsChanged { enabled: true }]);
        assert!(session
            .apply(&admin(), Command::SetOrgControls { enabled: true }, now())
            .expect("enable again")
            .is_empty());
    }

    #[test]
    fn apply_snapshot_does_not_mutate() {
        let session = Session::new(false);
        let (next, _) = session
            .apply_snapshot(&publisher(), start_quickplay(5), now())
            .expect("start");
        assert!(session.directs.is_empty());
        assert_eq!(next.directs.len(), 1);
    }

    #[test]
    fn snapshot_serializes_round_trip() {
        let mut session = Session::new(true);
        session
            .apply(&publisher(), Command::CreateSchedule { schedule: plan("c1") }, now())
            .expect("create");
        session.apply(&publisher(), start_quickplay(5), now()).expect("start");
        let json = serde_json::to_string(&session).expect("serialize");
        let back: Session = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, session);
    }

    #[test]
    fn command_deserializes_from_tagged_json() {
        let json = r#"{"command":"start_quickplay","content_id":"m","target_screens":["s"],
            "duration_minutes":3,"override":true}"#;
        let cmd: Command = serde_json::from_str(json).expect("deserialize");
        assert_matches!(
            cmd,
            Command::StartQuickplay { overrides_schedules: true, is_default: false, .. }
        );
    }

    #[test]
    fn audit_flags_hand_edited_snapshots() {
        let mut session = Session::new(false);
        session
            .apply(&publisher(), Command::CreateSchedule { schedule: plan("c1") }, now())
            .expect("create");
        assert!(session.audit().is_empty());

        let id = session.schedules[0].id.clone();
        session.schedules[0].status = ScheduleStatus::PendingApproval;
        session.schedules[0].target_screens.clear();
        assert_eq!(
            session.audit(),
            vec![
                DataQualityWarning::UntargetedSchedule { schedule_id: id.clone() },
                DataQualityWarning::MissingApprovalRequest { schedule_id: id },
            ]
        );
    }

    #[test]
    fn submit_requires_org_controls() {
        let mut session = Session::new(false);
        let s = plan("c1");
        let id = s.id.clone();
        session
            .apply(&publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        let before = session.clone();
        assert_matches!(
            session.apply(&publisher(), Command::SubmitForApproval { schedule_id: id }, now()),
            Err(CoreError::Conflict(_))
        );
        assert_eq!(session, before);
    }

    #[test]
    fn schedule_paused_on_air_cannot_be_resubmitted() {
        let mut session = Session::new(true);
        let s = plan("c1");
        let id = s.id.clone();
        let events = session
            .apply(&publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        let approve = Command::ApproveRequest {
            request_id: request_id(&events),
            comment: None,
        };
        session.apply(&reviewer(), approve, now()).expect("approve");
        session.advance_schedules(now() + Duration::hours(2));
        assert_eq!(session.schedule(&id).map(|s| s.status), Some(ScheduleStatus::Active));

        session
            .apply(&publisher(), Command::PauseSchedule { schedule_id: id.clone() }, now())
            .expect("pause");
        let before = session.clone();
        let submit = Command::SubmitForApproval { schedule_id: id.clone() };
        assert_matches!(session.apply(&publisher(), submit, now()), Err(CoreError::Conflict(_)));
        assert_eq!(session, before);

        session
            .apply(&publisher(), Command::ResumeSchedule { schedule_id: id.clone() }, now())
            .expect("resume");
        assert_eq!(session.schedule(&id).map(|s| s.status), Some(ScheduleStatus::Active));
    }

    #[test]
    fn catalog_commands_feed_screen_resolution() {
        use crate::day_sequence::{parse_hhmm, SlotContentType, TimeSlot};
        use crate::rotation::RotationPolicy;

        let mut session = Session::new(false);
        let slot = |id: &str, start: &str, end: &str, content: &str| TimeSlot {
            id: id.into(),
            start_time: parse_hhmm(start).expect("start"),
            end_time: parse_hhmm(end).expect("end"),
            content_type: SlotContentType::Media,
            content_id: content.into(),
        };
        let sequence = DaySequence::new(
            "seq-1",
            vec![
                slot("morning", "06:00", "12:00", "coffee"),
                slot("noon", "12:00", "14:00", "lunch"),
            ],
        );
        let events = session
            .apply(&publisher(), Command::SaveDaySequence { sequence }, now())
            .expect("save");
        assert_eq!(events, vec![SessionEvent::DaySequenceSaved { sequence_id: "seq-1".into() }]);

        let mut s = plan("seq-1");
        s.schedule_type = ScheduleType::DaySequence;
        s.start_date = now() - Duration::hours(1);
        session
            .apply(&publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        session.advance_schedules(now());
        assert!(session.audit().is_empty());

        let day = |h: u32, m: u32| {
            Utc.with_ymd_and_hms(2026, 4, 10, h, m, 0).single().expect("valid instant")
        };
        assert_eq!(session.resolve_screen("screen-1", day(11, 59)).content_id(), Some("coffee"));
        assert_eq!(session.resolve_screen("screen-1", day(12, 0)).content_id(), Some("lunch"));

        assert_matches!(
            session.apply(
                &publisher(),
                Command::SaveCampaign {
                    campaign: Campaign::new("Empty", Vec::new(), RotationPolicy::Sequential),
                },
                now()
            ),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn audit_flags_missing_sequence() {
        let mut session = Session::new(false);
        let mut s = plan("seq-missing");
        s.schedule_type = ScheduleType::DaySequence;
        let id = s.id.clone();
        session
            .apply(&publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        assert_eq!(
            session.audit(),
            vec![DataQualityWarning::MissingScheduleContent {
                schedule_id: id,
                content_id: "seq-missing".into(),
            }]
        );
    }

    // -- History ------------------------------------------------------------

    #[test]
    fn non_undoable_commands() {
        assert!(is_non_undoable("submit_for_approval"));
        assert!(is_non_undoable("approve_request"));
        assert!(is_non_undoable("reject_request"));
        assert!(!is_non_undoable("start_quickplay"));
        assert!(!is_non_undoable("pause_schedule"));
    }

    #[test]
    fn undo_and_redo_step_through_commands() {
        let mut session = Session::new(false);
        let mut history = History::new();
        history.apply(&mut session, &publisher(), start_quickplay(5), now()).expect("start");
        history.apply(&mut session, &publisher(), start_quickplay(5), now()).expect("start");
        assert_eq!(session.directs.len(), 2);

        assert_matches!(history.undo(&mut session, &publisher()), Ok(true));
        assert_eq!(session.directs.len(), 1);
        assert_matches!(history.undo(&mut session, &publisher()), Ok(true));
        assert!(session.directs.is_empty());
        assert_matches!(history.undo(&mut session, &publisher()), Ok(false));

        assert_matches!(history.redo(&mut session, &publisher()), Ok(true));
        assert_eq!(session.directs.len(), 1);
    }

    #[test]
    fn undo_requires_the_commands_role() {
        let mut session = Session::new(false);
        let mut history = History::new();
        history.apply(&mut session, &publisher(), start_quickplay(5), now()).expect("start");
        history
            .apply(&mut session, &admin(), Command::SetOrgControls { enabled: true }, now())
            .expect("enable");

        let before = session.clone();
        assert_matches!(history.undo(&mut session, &publisher()), Err(CoreError::Forbidden(_)));
        assert_eq!(session, before);
        assert_eq!(history.depth(), 2);

        assert_matches!(history.undo(&mut session, &admin()), Ok(true));
        assert!(!session.org_controls_enabled);
        assert_matches!(history.undo(&mut session, &reviewer()), Err(CoreError::Forbidden(_)));
        assert_matches!(
            history.undo(&mut session, &Actor::new("viewer-1", Role::Viewer)),
            Err(CoreError::Forbidden(_))
        );
        assert_eq!(session.directs.len(), 1);
        assert_matches!(history.redo(&mut session, &reviewer()), Err(CoreError::Forbidden(_)));
        assert!(!session.org_controls_enabled);
    }

    #[test]
    fn approval_decisions_cannot_be_undone() {
        let mut session = Session::new(true);
        let mut history = History::new();
        history.apply(&mut session, &publisher(), start_quickplay(5), now()).expect("start");
        let s = plan("c1");
        let id = s.id.clone();
        let events = history
            .apply(&mut session, &publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        assert!(!history.can_undo());

        let request = request_id(&events);
        history
            .apply(
                &mut session,
                &reviewer(),
                Command::ApproveRequest { request_id: request.clone(), comment: None },
                now(),
            )
            .expect("approve");
        assert_matches!(history.undo(&mut session, &admin()), Ok(false));
        assert_eq!(session.approval(&request).map(|r| r.status), Some(ApprovalStatus::Approved));
        assert_eq!(session.schedule(&id).map(|s| s.status), Some(ScheduleStatus::Scheduled));
        assert_eq!(session.directs.len(), 1);
    }

    #[test]
    fn reject_and_resubmit_clear_history() {
        let mut session = Session::new(true);
        let mut history = History::new();
        let s = plan("c1");
        let id = s.id.clone();
        let events = history
            .apply(&mut session, &publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        history
            .apply(
                &mut session,
                &reviewer(),
                Command::RejectRequest { request_id: request_id(&events), comment: None },
                now(),
            )
            .expect("reject");
        assert!(!history.can_undo());

        history
            .apply(&mut session, &publisher(), start_quickplay(5), now())
            .expect("start");
        assert!(history.can_undo());
        history
            .apply(
                &mut session,
                &publisher(),
                Command::SubmitForApproval { schedule_id: id.clone() },
                now(),
            )
            .expect("resubmit");
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_matches!(history.undo(&mut session, &admin()), Ok(false));
        assert_eq!(session.pending_approvals().count(), 1);
        assert_eq!(
            session.schedule(&id).map(|s| s.status),
            Some(ScheduleStatus::PendingApproval)
        );
    }

    #[test]
    fn undo_keeps_countdowns_and_clock_completions() {
        let mut session = Session::new(false);
        let mut history = History::new();
        history.apply(&mut session, &publisher(), start_quickplay(1), now()).expect("start");
        let short = session.directs[0].id.clone();
        history.apply(&mut session, &publisher(), start_quickplay(10), now()).expect("start");
        let long = session.directs[1].id.clone();
        history
            .apply(
                &mut session,
                &publisher(),
                Command::PauseQuickplay { publish_id: short.clone() },
                now(),
            )
            .expect("pause");
        history
            .apply(
                &mut session,
                &publisher(),
                Command::ResumeQuickplay { publish_id: short.clone() },
                now(),
            )
            .expect("resume");

        for _ in 0..60 {
            session.tick_countdown(now());
        }
        assert!(session.direct(&short).is_none());
        assert_eq!(session.direct(&long).map(|d| d.remaining_time), Some(540));

        // Undoing the resume of a finished quickplay does not bring it back.
        assert_matches!(history.undo(&mut session, &publisher()), Ok(true));
        assert!(session.direct(&short).is_none());
        assert_eq!(session.direct(&long).map(|d| d.remaining_time), Some(540));

        history
            .apply(
                &mut session,
                &publisher(),
                Command::PauseQuickplay { publish_id: long.clone() },
                now(),
            )
            .expect("pause");
        assert_matches!(history.undo(&mut session, &publisher()), Ok(true));
        assert_matches!(session.direct(&long), Some(d) if d.is_active() && d.remaining_time == 540);

        session.tick_countdown(now());
        assert_matches!(history.redo(&mut session, &publisher()), Ok(true));
        assert_matches!(
            session.direct(&long),
            Some(d) if !d.is_active() && d.remaining_time == 539
        );
    }

    #[test]
    fn undo_of_cancel_restores_the_quickplay() {
        let mut session = Session::new(false);
        let mut history = History::new();
        history.apply(&mut session, &publisher(), start_quickplay(5), now()).expect("start");
        let id = session.directs[0].id.clone();
        history
            .apply(
                &mut session,
                &publisher(),
                Command::CancelQuickplay { publish_id: id.clone() },
                now(),
            )
            .expect("cancel");
        assert!(session.directs.is_empty());

        assert_matches!(history.undo(&mut session, &publisher()), Ok(true));
        assert_eq!(session.direct(&id).map(|d| d.remaining_time), Some(300));
    }

    #[test]
    fn undo_does_not_reopen_completed_schedule() {
        let mut session = Session::new(false);
        let mut history = History::new();
        let s = plan("c1");
        let id = s.id.clone();
        history
            .apply(&mut session, &publisher(), Command::CreateSchedule { schedule: s }, now())
            .expect("create");
        history
            .apply(
                &mut session,
                &publisher(),
                Command::PauseSchedule { schedule_id: id.clone() },
                now(),
            )
            .expect("pause");
        history
            .apply(
                &mut session,
                &publisher(),
                Command::ResumeSchedule { schedule_id: id.clone() },
                now(),
            )
            .expect("resume");
        session.advance_schedules(now() + Duration::days(3));
        assert_eq!(session.schedule(&id).map(|s| s.status), Some(ScheduleStatus::Completed));

        assert_matches!(history.undo(&mut session, &publisher()), Ok(true));
        assert_eq!(session.schedule(&id).map(|s| s.status), Some(ScheduleStatus::Completed));
    }

    #[test]
    fn failed_command_is_not_recorded() {
        let mut session = Session::new(false);
        let mut history = History::new();
        let result = history.apply(&mut session, &reviewer(), start_quickplay(5), now());
        assert!(result.is_err());
        assert!(!history.can_undo());
    }

    #[test]
    fn new_command_clears_redo_and_depth_is_bounded() {
        let mut session = Session::new(false);
        let mut history = History::new();
        for _ in 0..(MAX_HISTORY_DEPTH + 5) {
            history.apply(&mut session, &publisher(), start_quickplay(1), now()).expect("start");
        }
        assert_eq!(history.depth(), MAX_HISTORY_DEPTH);

        history.undo(&mut session, &publisher()).expect("undo");
        assert!(history.can_redo());
        history.apply(&mut session, &publisher(), start_quickplay(1), now()).expect("start");
        assert!(!history.can_redo());
    }
}
