//! `zonecast-runtime` -- session driver daemon.
//!
//! Loads an optional session snapshot, runs the preview tick, quickplay
//! countdowns and schedule checks on tokio timers, and accepts JSON commands
//! on stdin (one per line, see [`zonecast_runtime::console`]). On shutdown
//! the session is written back to the snapshot file, if one is configured.
//!
//! # Environment variables
//!
//! | Variable                | Required | Default | Description                              |
//! |-------------------------|----------|---------|------------------------------------------|
//! | `PREVIEW_TICK_MS`       | no       | `2000`  | Preview rotation interval                |
//! | `COUNTDOWN_TICK_MS`     | no       | `1000`  | Quickplay countdown interval             |
//! | `SCHEDULE_CHECK_SECS`   | no       | `30`    | Planned schedule check interval          |
//! | `ORG_CONTROLS_ENABLED`  | no       | `false` | Approval gate for a fresh session        |
//! | `ZONECAST_SESSION_FILE` | no       | --      | JSON session snapshot to load and save   |
//! | `RUST_LOG`              | no       | see below | Tracing filter                         |
//!
//! `RUST_LOG` defaults to `zonecast_runtime=info,zonecast_core=info`.

use std::sync::Arc;

use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zonecast_core::session::Session;
use zonecast_events::EventBus;
use zonecast_runtime::config::RuntimeConfig;
use zonecast_runtime::console;
use zonecast_runtime::driver::{self, Driver};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zonecast_runtime=info,zonecast_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = ?e, "zonecast-runtime failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = RuntimeConfig::from_env()?;
    tracing::info!(
        preview_tick_ms = config.preview_tick.as_millis() as u64,
        countdown_tick_ms = config.countdown_tick.as_millis() as u64,
        schedule_check_secs = config.schedule_check.as_secs(),
        "Loaded runtime configuration"
    );

    let session = match &config.session_file {
        Some(path) => {
            let session = driver::load_snapshot(path)?;
            tracing::info!(path = %path.display(), "Loaded session snapshot");
            session
        }
        None => Session::new(config.org_controls_enabled),
    };

    // --- Event bus ---
    let bus = Arc::new(EventBus::default());
    let mut notifications = bus.subscribe();
    let log_handle = tokio::spawn(async move {
        while let Ok(event) = notifications.recv().await {
            tracing::info!(
                event_type = %event.event_type,
                source = ?event.source_entity_id,
                actor = ?event.actor_id,
                "Notification"
            );
        }
    });

    // --- Driver ---
    let cancel = CancellationToken::new();
    let (handle, driver_handle) =
        Driver::new(config.clone(), session, Arc::clone(&bus)).spawn(cancel.clone());

    let console_handle = tokio::spawn(console::run(
        handle,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    console_handle.abort();
    let session = driver_handle.await?;
    drop(bus);
    log_handle.abort();

    if let Some(path) = &config.session_file {
        driver::save_snapshot(path, &session)?;
        tracing::info!(path = %path.display(), "Saved session snapshot");
    }
    Ok(())
}
