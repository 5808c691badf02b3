//! Tokio-backed [`TimerScheduler`].
//!
//! Every scheduled task is a spawned tokio task sleeping under its own
//! [`CancellationToken`]. When the sleep finishes the task is sent on an
//! unbounded mpsc channel as a [`FiredTimer`]. The receiver must hand each
//! fired token back through [`TokioScheduler::acknowledge`]; a `false`
//! result means the timer was cancelled after it fired and the task must be
//! dropped.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use zonecast_core::timer::{TimerScheduler, TimerTask, TimerToken};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTimer {
    pub token: TimerToken,
    pub task: TimerTask,
}

pub struct TokioScheduler {
    next_token: u64,
    timers: HashMap<TimerToken, CancellationToken>,
    shutdown: CancellationToken,
    sender: mpsc::UnboundedSender<FiredTimer>,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver its timers fire into.
    ///
    /// Must be used from inside a tokio runtime.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FiredTimer>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            next_token: 0,
            timers: HashMap::new(),
            shutdown: CancellationToken::new(),
            sender,
        };
        (scheduler, receiver)
    }

    /// Mark a fired timer as handled. Returns `false` for timers that were
    /// cancelled in the meantime.
    pub fn acknowledge(&mut self, token: TimerToken) -> bool {
        self.timers.remove(&token).is_some()
    }

    /// Cancel every pending timer.
    pub fn shutdown(&mut self) {
        self.shutdown.cancel();
        self.timers.clear();
    }
}

impl TimerScheduler for TokioScheduler {
    fn schedule(&mut self, after: Duration, task: TimerTask) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        let cancel = self.shutdown.child_token();
        self.timers.insert(token, cancel.clone());

        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    if sender.send(FiredTimer { token, task }).is_err() {
                        tracing::debug!(token = token.0, "Timer receiver closed");
                    }
                }
            }
        });
        token
    }

    fn cancel(&mut self, token: TimerToken) -> bool {
        match self.timers.remove(&token) {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn pending(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_delay() {
        let (mut scheduler, mut rx) = TokioScheduler::new();
        let token = scheduler.schedule(Duration::from_secs(2), TimerTask::PreviewTick);
        assert_eq!(scheduler.pending(), 1);

        let fired = rx.recv().await.expect("timer fires");
        assert_eq!(fired, FiredTimer { token, task: TimerTask::PreviewTick });
        assert!(scheduler.acknowledge(token));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (mut scheduler, mut rx) = TokioScheduler::new();
        let cancelled = scheduler.schedule(Duration::from_secs(1), TimerTask::ScheduleCheck);
        let kept = scheduler.schedule(Duration::from_secs(3), TimerTask::PreviewTick);
        assert!(scheduler.cancel(cancelled));
        assert!(!scheduler.cancel(cancelled));

        let fired = rx.recv().await.expect("remaining timer fires");
        assert_eq!(fired.token, kept);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_everything() {
        let (mut scheduler, mut rx) = TokioScheduler::new();
        scheduler.schedule(Duration::from_secs(1), TimerTask::PreviewTick);
        scheduler.schedule(Duration::from_secs(1), TimerTask::ScheduleCheck);
        scheduler.shutdown();
        assert_eq!(scheduler.pending(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
