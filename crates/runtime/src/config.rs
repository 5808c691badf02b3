use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use zonecast_core::preview::PREVIEW_TICK_MS;
use zonecast_core::quickplay::COUNTDOWN_TICK_MS;

const DEFAULT_SCHEDULE_CHECK_SECS: u64 = 30;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Interval of the global preview rotation tick.
    pub preview_tick: Duration,
    /// Interval of each quickplay countdown.
    pub countdown_tick: Duration,
    /// How often planned schedules are advanced against the clock.
    pub schedule_check: Duration,
    /// Whether new schedules go through the approval workflow. Only applies
    /// when no session snapshot is loaded.
    pub org_controls_enabled: bool,
    /// Optional JSON session snapshot to start from.
    pub session_file: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            preview_tick: Duration::from_millis(PREVIEW_TICK_MS),
            countdown_tick: Duration::from_millis(COUNTDOWN_TICK_MS),
            schedule_check: Duration::from_secs(DEFAULT_SCHEDULE_CHECK_SECS),
            org_controls_enabled: false,
            session_file: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `PREVIEW_TICK_MS`       | `2000`  |
    /// | `COUNTDOWN_TICK_MS`     | `1000`  |
    /// | `SCHEDULE_CHECK_SECS`   | `30`    |
    /// | `ORG_CONTROLS_ENABLED`  | `false` |
    /// | `ZONECAST_SESSION_FILE` | unset   |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let preview_tick = match lookup("PREVIEW_TICK_MS") {
            Some(v) => Duration::from_millis(
                parse_positive(&v).context("PREVIEW_TICK_MS must be a positive integer")?,
            ),
            None => defaults.preview_tick,
        };
        let countdown_tick = match lookup("COUNTDOWN_TICK_MS") {
            Some(v) => Duration::from_millis(
                parse_positive(&v).context("COUNTDOWN_TICK_MS must be a positive integer")?,
            ),
            None => defaults.countdown_tick,
        };
        let schedule_check = match lookup("SCHEDULE_CHECK_SECS") {
            Some(v) => Duration::from_secs(
                parse_positive(&v).context("SCHEDULE_CHECK_SECS must be a positive integer")?,
            ),
            None => defaults.schedule_check,
        };
        let org_controls_enabled = match lookup("ORG_CONTROLS_ENABLED") {
            Some(v) => parse_bool(&v).with_context(|| {
                format!("ORG_CONTROLS_ENABLED must be true or false, got '{v}'")
            })?,
            None => defaults.org_controls_enabled,
        };
        let session_file = lookup("ZONECAST_SESSION_FILE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            preview_tick,
            countdown_tick,
            schedule_check,
            org_controls_enabled,
            session_file,
        })
    }
}

fn parse_positive(raw: &str) -> anyhow::Result<u64> {
    let value: u64 = raw.trim().parse()?;
    anyhow::ensure!(value > 0, "value must be greater than zero");
    Ok(value)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
