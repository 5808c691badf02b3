//! The session driver.
//!
//! [`Driver`] owns the single [`Session`] inside one tokio task. Callers talk
//! to it through a [`DriverHandle`]; timers fire into the same task, so the
//! session is never shared or locked. Every command and clock-driven change
//! is published on the [`EventBus`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use zonecast_core::composition::Composition;
use zonecast_core::error::CoreError;
use zonecast_core::orchestrator::ActiveContent;
use zonecast_core::preview::PreviewRotation;
use zonecast_core::roles::Actor;
use zonecast_core::session::{Command, History, Session, SessionEvent};
use zonecast_core::timer::{CountdownTimers, TimerScheduler, TimerTask};
use zonecast_core::types::{EntityId, Timestamp};
use zonecast_events::{from_data_quality_warning, from_session_event, EventBus};

use crate::config::RuntimeConfig;
use crate::timers::{FiredTimer, TokioScheduler};

/// Capacity of the request channel between handles and the driver.
const REQUEST_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Read a session snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> anyhow::Result<Session> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file {}", path.display()))?;
    let session = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid session file {}", path.display()))?;
    Ok(session)
}

/// Write a session snapshot as pretty JSON.
pub fn save_snapshot(path: &Path, session: &Session) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write session file {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

enum Request {
    Apply {
        actor: Actor,
        command: Command,
        reply: oneshot::Sender<Result<Vec<SessionEvent>, CoreError>>,
    },
    Undo {
        actor: Actor,
        reply: oneshot::Sender<Result<bool, CoreError>>,
    },
    Redo {
        actor: Actor,
        reply: oneshot::Sender<Result<bool, CoreError>>,
    },
    Resolve {
        screen_id: EntityId,
        reply: oneshot::Sender<ActiveContent>,
    },
    Snapshot {
        reply: oneshot::Sender<Session>,
    },
    Preview {
        composition: Composition,
    },
    CurrentPreview {
        composition_id: EntityId,
        reply: oneshot::Sender<Option<BTreeMap<EntityId, EntityId>>>,
    },
    PendingTimers {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable handle for sending requests to a running [`Driver`].
#[derive(Clone)]
pub struct DriverHandle {
    sender: mpsc::Sender<Request>,
}

impl DriverHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> anyhow::Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| anyhow::anyhow!("Session driver has stopped"))?;
        response.await.context("Session driver dropped the request")
    }

    /// Apply a command. The outer error means the driver is gone; the inner
    /// one is the command's own outcome.
    pub async fn apply(
        &self,
        actor: Actor,
        command: Command,
    ) -> anyhow::Result<Result<Vec<SessionEvent>, CoreError>> {
        self.request(|reply| Request::Apply { actor, command, reply }).await
    }

    /// Revert the last undoable command on behalf of `actor`, who needs the
    /// role that command needed. `Ok(Ok(false))` when there is nothing to
    /// undo.
    pub async fn undo(&self, actor: Actor) -> anyhow::Result<Result<bool, CoreError>> {
        self.request(|reply| Request::Undo { actor, reply }).await
    }

    /// Re-apply the last undone command. Same rules as [`undo`](Self::undo).
    pub async fn redo(&self, actor: Actor) -> anyhow::Result<Result<bool, CoreError>> {
        self.request(|reply| Request::Redo { actor, reply }).await
    }

    /// What a screen plays right now.
    pub async fn resolve(&self, screen_id: impl Into<EntityId>) -> anyhow::Result<ActiveContent> {
        let screen_id = screen_id.into();
        self.request(|reply| Request::Resolve { screen_id, reply }).await
    }

    /// A copy of the current session.
    pub async fn snapshot(&self) -> anyhow::Result<Session> {
        self.request(|reply| Request::Snapshot { reply }).await
    }

    /// Start rotating a composition's zone playlists on the preview tick.
    pub async fn preview(&self, composition: Composition) -> anyhow::Result<()> {
        self.sender
            .send(Request::Preview { composition })
            .await
            .map_err(|_| anyhow::anyhow!("Session driver has stopped"))
    }

    /// Media currently shown in each zone of a previewed composition.
    pub async fn current_preview(
        &self,
        composition_id: impl Into<EntityId>,
    ) -> anyhow::Result<Option<BTreeMap<EntityId, EntityId>>> {
        let composition_id = composition_id.into();
        self.request(|reply| Request::CurrentPreview { composition_id, reply }).await
    }

    /// Timers currently armed, including the preview tick and the schedule
    /// check.
    pub async fn pending_timers(&self) -> anyhow::Result<usize> {
        self.request(|reply| Request::PendingTimers { reply }).await
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

struct PreviewTarget {
    composition: Composition,
    rotation: PreviewRotation,
}

impl PreviewTarget {
    fn current(&self) -> BTreeMap<EntityId, EntityId> {
        self.composition
            .template()
            .zones
            .iter()
            .filter_map(|z| {
                self.rotation
                    .current(&z.id, self.composition.playlists())
                    .map(|e| (z.id.clone(), e.media_id.clone()))
            })
            .collect()
    }
}

pub struct Driver {
    config: RuntimeConfig,
    session: Session,
    history: History,
    bus: Arc<EventBus>,
    scheduler: TokioScheduler,
    fired: mpsc::UnboundedReceiver<FiredTimer>,
    countdowns: CountdownTimers,
    previews: Vec<PreviewTarget>,
}

impl Driver {
    /// Build a driver around `session`. Must be called inside a tokio
    /// runtime; the preview tick and schedule check are armed immediately.
    pub fn new(config: RuntimeConfig, session: Session, bus: Arc<EventBus>) -> Self {
        let (scheduler, fired) = TokioScheduler::new();
        let countdowns = CountdownTimers::new(config.countdown_tick);
        let mut driver = Self {
            config,
            session,
            history: History::new(),
            bus,
            scheduler,
            fired,
            countdowns,
            previews: Vec::new(),
        };

        let now = Utc::now();
        for warning in driver.session.audit() {
            driver.bus.publish(from_data_quality_warning(&warning, now));
        }
        let events = driver.session.advance_schedules(now);
        driver.publish(&events, None, now);
        driver.sync_countdowns();
        driver
            .scheduler
            .schedule(driver.config.preview_tick, TimerTask::PreviewTick);
        driver
            .scheduler
            .schedule(driver.config.schedule_check, TimerTask::ScheduleCheck);
        driver
    }

    /// Spawn the driver loop. The task ends when `cancel` fires and yields
    /// the final session.
    pub fn spawn(
        self,
        cancel: CancellationToken,
    ) -> (DriverHandle, tokio::task::JoinHandle<Session>) {
        let (sender, receiver) = mpsc::channel(REQUEST_BUFFER);
        let handle = tokio::spawn(self.run(receiver, cancel));
        (DriverHandle { sender }, handle)
    }

    async fn run(
        mut self,
        mut requests: mpsc::Receiver<Request>,
        cancel: CancellationToken,
    ) -> Session {
        tracing::info!(
            schedules = self.session.schedules.len(),
            quickplays = self.session.directs.len(),
            org_controls = self.session.org_controls_enabled,
            "Session driver started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Session driver cancelled");
                    break;
                }
                Some(fired) = self.fired.recv() => self.on_timer(fired),
                Some(request) = requests.recv() => self.on_request(request),
            }
        }

        self.countdowns.cancel_all(&mut self.scheduler);
        self.scheduler.shutdown();
        self.session
    }

    fn on_timer(&mut self, fired: FiredTimer) {
        if !self.scheduler.acknowledge(fired.token) {
            tracing::trace!(token = fired.token.0, "Dropping cancelled timer");
            return;
        }
        let now = Utc::now();

        match fired.task {
            TimerTask::PreviewTick => {
                for target in &mut self.previews {
                    target.rotation.tick(target.composition.playlists());
                    tracing::debug!(
                        composition_id = %target.composition.id(),
                        zones = ?target.current(),
                        "Preview advanced"
                    );
                }
                self.scheduler.schedule(self.config.preview_tick, TimerTask::PreviewTick);
            }
            TimerTask::QuickplayCountdown { publish_id } => {
                self.countdowns.fired(&publish_id);
                let events = self.session.tick_quickplay(&publish_id, now);
                self.publish(&events, None, now);
                self.sync_countdowns();
            }
            TimerTask::ScheduleCheck => {
                let events = self.session.advance_schedules(now);
                self.publish(&events, None, now);
                self.scheduler.schedule(self.config.schedule_check, TimerTask::ScheduleCheck);
            }
        }
    }

    fn on_request(&mut self, request: Request) {
        let now = Utc::now();
        match request {
            Request::Apply { actor, command, reply } => {
                let result = self.history.apply(&mut self.session, &actor, command, now);
                match &result {
                    Ok(events) => {
                        self.publish(events, Some(&actor.id), now);
                        self.sync_countdowns();
                    }
                    Err(e) => tracing::info!(actor = %actor.id, error = %e, "Command rejected"),
                }
                let _ = reply.send(result);
            }
            Request::Undo { actor, reply } => {
                let result = self.history.undo(&mut self.session, &actor);
                self.after_history_step("undo", &actor, &result, now);
                let _ = reply.send(result);
            }
            Request::Redo { actor, reply } => {
                let result = self.history.redo(&mut self.session, &actor);
                self.after_history_step("redo", &actor, &result, now);
                let _ = reply.send(result);
            }
            Request::Resolve { screen_id, reply } => {
                let _ = reply.send(self.session.resolve_screen(&screen_id, now));
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(self.session.clone());
            }
            Request::Preview { composition } => {
                self.previews.retain(|p| p.composition.id() != composition.id());
                tracing::info!(composition_id = %composition.id(), "Previewing composition");
                self.previews.push(PreviewTarget {
                    composition,
                    rotation: PreviewRotation::new(),
                });
            }
            Request::CurrentPreview { composition_id, reply } => {
                let current = self
                    .previews
                    .iter()
                    .find(|p| p.composition.id() == composition_id)
                    .map(PreviewTarget::current);
                let _ = reply.send(current);
            }
            Request::PendingTimers { reply } => {
                let _ = reply.send(self.scheduler.pending());
            }
        }
    }

    /// A restored schedule may already be due, so the clock catches up
    /// before countdowns are re-armed.
    fn after_history_step(
        &mut self,
        step: &str,
        actor: &Actor,
        result: &Result<bool, CoreError>,
        now: Timestamp,
    ) {
        match result {
            Ok(true) => {
                tracing::info!(step, actor = %actor.id, "History step applied");
                let events = self.session.advance_schedules(now);
                self.publish(&events, None, now);
                self.sync_countdowns();
            }
            Ok(false) => tracing::debug!(step, actor = %actor.id, "Nothing to step"),
            Err(e) => tracing::info!(step, actor = %actor.id, error = %e, "History step rejected"),
        }
    }

    fn sync_countdowns(&mut self) {
        let cancelled = self.countdowns.sync(&mut self.scheduler, &self.session.directs);
        if cancelled > 0 {
            tracing::debug!(
                cancelled,
                armed = self.countdowns.len(),
                "Quickplay countdowns synced"
            );
        }
    }

    fn publish(&self, events: &[SessionEvent], actor_id: Option<&str>, now: Timestamp) {
        for event in events {
            self.bus.publish(from_session_event(event, actor_id, now));
        }
    }
}
