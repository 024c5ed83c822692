//! `watch`: run the polling driver and print changes until Ctrl-C.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use bluestar_core::{Controller, DeviceState, Snapshot, UpdateStatus};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output::{self, on_off};

/// One line of watch output.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent<'a> {
    State {
        id: &'a str,
        name: &'a str,
        state: &'a DeviceState,
    },
    Removed {
        id: &'a str,
    },
    UpdateFailed {
        message: &'a str,
    },
}

impl WatchEvent<'_> {
    fn line(&self) -> String {
        let now = Utc::now().format("%H:%M:%S");
        match self {
            Self::State { id, name, state } => format!(
                "{now} {name} ({id}): power {} mode {} set {:.1}°C room {:.1}°C fan {}{}",
                on_off(state.power),
                state.mode,
                state.target_temp,
                state.current_temp,
                state.fan_speed,
                if state.connected { "" } else { " [offline]" },
            ),
            Self::Removed { id } => format!("{now} {id}: removed"),
            Self::UpdateFailed { message } => format!("{now} update failed: {message}"),
        }
    }
}

fn emit(event: &WatchEvent<'_>, global: &GlobalOpts) -> Result<(), CliError> {
    let out = match global.output {
        OutputFormat::Table | OutputFormat::Plain => event.line(),
        // Streams are one JSON document per line.
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            output::render_json(event, true)?
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Print every device whose state differs from `previous`.
fn emit_changes(
    previous: &Snapshot,
    current: &Snapshot,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    for (id, state) in &current.states {
        if previous.state(id) == Some(state) {
            continue;
        }
        let name = current.device(id).map_or(id.as_str(), |d| d.name.as_str());
        emit(&WatchEvent::State { id, name, state }, global)?;
    }
    for id in previous.states.keys() {
        if !current.states.contains_key(id) {
            emit(&WatchEvent::Removed { id }, global)?;
        }
    }
    Ok(())
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let mut snapshots = controller.subscribe();
    let mut statuses = controller.subscribe_status();

    controller.connect().await?;
    if controller.config().refresh_interval.is_zero() {
        tracing::warn!("refresh interval is 0; only the initial snapshot will be shown");
    }

    let mut last: Arc<Snapshot> = snapshots.borrow_and_update().clone();
    emit_changes(&Snapshot::default(), &last, global)?;
    statuses.mark_unchanged();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = snapshots.borrow_and_update().clone();
                emit_changes(&last, &current, global)?;
                last = current;
            }
            changed = statuses.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = statuses.borrow_and_update().clone();
                if let UpdateStatus::Failed { ref message, .. } = status {
                    emit(&WatchEvent::UpdateFailed { message }, global)?;
                }
            }
        }
    }

    tracing::debug!("watch stopped");
    Ok(())
}
