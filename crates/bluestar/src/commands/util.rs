//! Shared helpers for command handlers.

use std::sync::Arc;

use bluestar_core::{Controller, Snapshot};

use crate::error::CliError;

/// Log in and take one snapshot, without starting the polling task.
pub async fn fresh_snapshot(controller: &Controller) -> Result<Arc<Snapshot>, CliError> {
    controller.login().await?;
    Ok(controller.refresh().await?)
}

/// Resolve a device identifier (thing ID or display name) to its ID.
///
/// IDs match exactly; names match case-insensitively and must be unique.
pub fn resolve_device_id(snapshot: &Snapshot, identifier: &str) -> Result<String, CliError> {
    if snapshot.devices.contains_key(identifier) {
        return Ok(identifier.to_owned());
    }

    let mut by_name = snapshot
        .devices
        .values()
        .filter(|d| d.name.eq_ignore_ascii_case(identifier));
    match (by_name.next(), by_name.next()) {
        (Some(device), None) => Ok(device.id.clone()),
        (Some(_), Some(_)) => Err(CliError::Validation {
            field: "device".into(),
            reason: format!("name '{identifier}' matches several units; use the ID"),
        }),
        (None, _) => Err(CliError::NotFound {
            identifier: identifier.into(),
        }),
    }
}
