//! Line-oriented JSON control channel.
//!
//! Each input line is one [`ConsoleInput`]; each produces exactly one JSON
//! output line. Used by the binary on stdin/stdout.
//!
//! ```text
//! {"op":"apply","actor":{"id":"u1","role":"publisher"},
//!  "command":{"command":"start_quickplay","content_id":"m1",
//!             "target_screens":["s1"],"duration_minutes":5}}
//! {"op":"resolve","screen_id":"s1"}
//! {"op":"undo","actor":{"id":"u1","role":"publisher"}}
//! ```
//!
//! Inputs are shown wrapped; on the wire each one is a single line.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use zonecast_core::error::CoreError;
use zonecast_core::roles::Actor;
use zonecast_core::session::Command;
use zonecast_core::types::EntityId;

use crate::driver::DriverHandle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConsoleInput {
    Apply { actor: Actor, command: Command },
    Undo { actor: Actor },
    Redo { actor: Actor },
    Resolve { screen_id: EntityId },
    Snapshot,
}

/// Handle one input line and return the output line.
pub async fn handle_line(handle: &DriverHandle, line: &str) -> anyhow::Result<serde_json::Value> {
    let input: ConsoleInput = match serde_json::from_str(line) {
        Ok(input) => input,
        Err(e) => return Ok(json!({"ok": false, "error": format!("Invalid input: {e}")})),
    };

    let output = match input {
        ConsoleInput::Apply { actor, command } => match handle.apply(actor, command).await? {
            Ok(events) => json!({"ok": true, "events": events}),
            Err(e) => json!({"ok": false, "error": e.to_string()}),
        },
        ConsoleInput::Undo { actor } => stepped(handle.undo(actor).await?),
        ConsoleInput::Redo { actor } => stepped(handle.redo(actor).await?),
        ConsoleInput::Resolve { screen_id } => {
            json!({"ok": true, "active": handle.resolve(screen_id).await?})
        }
        ConsoleInput::Snapshot => json!({"ok": true, "session": handle.snapshot().await?}),
    };
    Ok(output)
}

fn stepped(result: Result<bool, CoreError>) -> serde_json::Value {
    match result {
        Ok(changed) => json!({"ok": changed}),
        Err(e) => json!({"ok": false, "error": e.to_string()}),
    }
}

/// Read lines until EOF, writing one response line per input line. Blank
/// lines are skipped.
pub async fn run<R, W>(handle: DriverHandle, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let output = handle_line(&handle, &line).await?;
        writer.write_all(output.to_string().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    tracing::info!("Console input closed");
    Ok(())
}
