//! Timer abstraction for the periodic work the core needs driven from
//! outside: the preview rotation tick, quickplay countdowns and schedule
//! checks.
//!
//! The core never sleeps. A [`TimerScheduler`] hands out [`TimerToken`]s and
//! later reports which [`TimerTask`]s are due. [`ManualScheduler`] is a fake
//! clock for tests; the runtime crate provides a tokio-backed scheduler.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::quickplay::DirectPublish;
use crate::types::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerTask {
    PreviewTick,
    QuickplayCountdown { publish_id: EntityId },
    ScheduleCheck,
}

/// Handle for cancelling a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

pub trait TimerScheduler {
    /// Schedule `task` to fire once after `after`.
    fn schedule(&mut self, after: Duration, task: TimerTask) -> TimerToken;

    /// Cancel a pending task. Returns `false` if it already fired or was
    /// never scheduled.
    fn cancel(&mut self, token: TimerToken) -> bool;

    /// Number of tasks scheduled and not yet fired or cancelled.
    fn pending(&self) -> usize;
}

#[derive(Debug, Clone)]
struct Pending {
    token: TimerToken,
    due: Duration,
    task: TimerTask,
}

/// Deterministic scheduler driven by [`advance`](ManualScheduler::advance).
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_token: u64,
    pending: Vec<Pending>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the fake clock.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Move the clock forward and return every task that came due, ordered
    /// by due time (ties in scheduling order).
    pub fn advance(&mut self, by: Duration) -> Vec<TimerTask> {
        self.now += by;
        let now = self.now;
        let (mut due, rest): (Vec<Pending>, Vec<Pending>) =
            self.pending.drain(..).partition(|p| p.due <= now);
        self.pending = rest;
        due.sort_by_key(|p| (p.due, p.token));
        due.into_iter().map(|p| p.task).collect()
    }

    /// Whether any pending task matches `task`.
    pub fn is_scheduled(&self, task: &TimerTask) -> bool {
        self.pending.iter().any(|p| &p.task == task)
    }
}

impl TimerScheduler for ManualScheduler {
    fn schedule(&mut self, after: Duration, task: TimerTask) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.pending.push(Pending {
            token,
            due: self.now + after,
            task,
        });
        token
    }

    fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.token != token);
        self.pending.len() != before
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// Quickplay countdowns
// ---------------------------------------------------------------------------

/// One countdown timer per active quickplay.
///
/// Timers are one-shot: after a countdown fires, call
/// [`fired`](Self::fired) and then [`sync`](Self::sync) to arm the next
/// second. Publishes that are paused, completed or removed lose their timer
/// on the next sync.
#[derive(Debug, Clone, Default)]
pub struct CountdownTimers {
    interval: Duration,
    tokens: BTreeMap<EntityId, TimerToken>,
}

impl CountdownTimers {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            tokens: BTreeMap::new(),
        }
    }

    /// Arm a timer for every active publish that has none and cancel the
    /// timers of publishes that are no longer active. Returns the number of
    /// timers cancelled.
    pub fn sync<S: TimerScheduler + ?Sized>(
        &mut self,
        scheduler: &mut S,
        publishes: &[DirectPublish],
    ) -> usize {
        let stale: Vec<EntityId> = self
            .tokens
            .keys()
            .filter(|id| !publishes.iter().any(|p| &p.id == *id && p.is_active()))
            .cloned()
            .collect();
        for id in &stale {
            if let Some(token) = self.tokens.remove(id) {
                scheduler.cancel(token);
                tracing::debug!(publish_id = %id, "Cancelled quickplay countdown");
            }
        }

        for p in publishes.iter().filter(|p| p.is_active()) {
            if !self.tokens.contains_key(&p.id) {
                let task = TimerTask::QuickplayCountdown {
                    publish_id: p.id.clone(),
                };
                let token = scheduler.schedule(self.interval, task);
                self.tokens.insert(p.id.clone(), token);
            }
        }
        stale.len()
    }

    /// Forget the token of a countdown that has fired.
    pub fn fired(&mut self, publish_id: &str) {
        self.tokens.remove(publish_id);
    }

    /// Cancel every armed countdown.
    pub fn cancel_all<S: TimerScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        for (_, token) in std::mem::take(&mut self.tokens) {
            scheduler.cancel(token);
        }
    }

    pub fn is_armed(&self, publish_id: &str) -> bool {
        self.tokens.contains_key(publish_id)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
