//! Quickplay: ephemeral, time-boxed direct publishes with a per-second
//! countdown.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{new_id, EntityId, Timestamp};

/// Countdown tick interval in milliseconds.
pub const COUNTDOWN_TICK_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectStatus {
    Active,
    Paused,
    Completed,
}

impl DirectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectStatus::Active => "active",
            DirectStatus::Paused => "paused",
            DirectStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectPublish {
    pub id: EntityId,
    pub content_id: EntityId,
    pub target_screens: Vec<EntityId>,
    pub status: DirectStatus,
    pub start_time: Timestamp,
    /// Minutes.
    pub duration: u32,
    /// Seconds.
    pub remaining_time: u64,
    #[serde(rename = "override", default)]
    pub overrides_schedules: bool,
    #[serde(default)]
    pub is_default: bool,
}

impl DirectPublish {
    /// A new active publish. Zero-minute durations are rejected.
    pub fn new(
        content_id: impl Into<EntityId>,
        target_screens: Vec<EntityId>,
        duration_minutes: u32,
        start_time: Timestamp,
    ) -> Result<Self, CoreError> {
        if duration_minutes == 0 {
            return Err(CoreError::Validation(
                "Quickplay duration must be at least one minute".to_string(),
            ));
        }
        Ok(Self {
            id: new_id(),
            content_id: content_id.into(),
            target_screens,
            status: DirectStatus::Active,
            start_time,
            duration: duration_minutes,
            remaining_time: u64::from(duration_minutes) * 60,
            overrides_schedules: false,
            is_default: false,
        })
    }

    pub fn with_override(mut self, overrides_schedules: bool) -> Self {
        self.overrides_schedules = overrides_schedules;
        self
    }

    pub fn as_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn targets(&self, screen_id: &str) -> bool {
        self.target_screens.iter().any(|s| s == screen_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == DirectStatus::Active
    }

    /// One countdown second. Only active publishes count down; returns
    /// `true` when this tick completed the publish.
    pub fn tick(&mut self) -> bool {
        if self.status != DirectStatus::Active {
            return false;
        }
        self.remaining_time = self.remaining_time.saturating_sub(1);
        if self.remaining_time == 0 {
            self.status = DirectStatus::Completed;
            return true;
        }
        false
    }

    pub fn pause(&mut self) -> Result<(), CoreError> {
        match self.status {
            DirectStatus::Active => {
                self.status = DirectStatus::Paused;
                Ok(())
            }
            other => Err(CoreError::Conflict(format!(
                "Cannot pause a quickplay that is {}",
                other.as_str()
            ))),
        }
    }

    pub fn resume(&mut self) -> Result<(), CoreError> {
        match self.status {
            DirectStatus::Paused => {
                self.status = DirectStatus::Active;
                Ok(())
            }
            other => Err(CoreError::Conflict(format!(
                "Cannot resume a quickplay that is {}",
                other.as_str()
            ))),
        }
    }
}

/// Tick every publish once and drop the ones that completed.
///
/// Returns the completed publishes in list order.
pub fn tick_all(publishes: &mut Vec<DirectPublish>) -> Vec<DirectPublish> {
    let mut completed = Vec::new();
    publishes.retain_mut(|p| {
        if p.tick() {
            completed.push(p.clone());
            false
        } else {
            true
        }
    });
    completed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
