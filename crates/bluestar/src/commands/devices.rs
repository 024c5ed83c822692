//! Device listing and status handlers.

use serde::Serialize;
use tabled::Tabled;

use bluestar_core::{Controller, Device, DeviceState, Snapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, on_off};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

/// A device joined with its last reported state.
#[derive(Debug, Serialize)]
pub struct DeviceView<'a> {
    #[serde(flatten)]
    pub device: &'a Device,
    pub state: Option<&'a DeviceState>,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Set")]
    target: String,
    #[tabled(rename = "Room")]
    current: String,
    #[tabled(rename = "Fan")]
    fan: String,
}

impl From<&DeviceView<'_>> for DeviceRow {
    fn from(v: &DeviceView<'_>) -> Self {
        let (id, name) = (v.device.id.clone(), v.device.name.clone());
        let Some(s) = v.state else {
            let dash = || "-".to_owned();
            return Self {
                id,
                name,
                online: dash(),
                power: dash(),
                mode: dash(),
                target: dash(),
                current: dash(),
                fan: dash(),
            };
        };
        Self {
            id,
            name,
            online: if s.connected { "yes" } else { "no" }.into(),
            power: on_off(s.power).into(),
            mode: s.mode.to_string(),
            target: format!("{:.1}°C", s.target_temp),
            current: format!("{:.1}°C", s.current_temp),
            fan: s.fan_speed.to_string(),
        }
    }
}

pub fn views(snapshot: &Snapshot) -> Vec<DeviceView<'_>> {
    snapshot
        .devices
        .values()
        .map(|device| DeviceView {
            device,
            state: snapshot.state(&device.id),
        })
        .collect()
}

pub fn detail(v: &DeviceView<'_>) -> String {
    let mut lines = vec![
        format!("ID:        {}", v.device.id),
        format!("Name:      {}", v.device.name),
    ];
    let Some(s) = v.state else {
        lines.push("State:     (not reported)".into());
        return lines.join("\n");
    };
    lines.extend([
        format!("Online:    {}", if s.connected { "yes" } else { "no" }),
        format!("Power:     {}", on_off(s.power)),
        format!("Mode:      {}", s.mode),
        format!("Set temp:  {:.1}°C", s.target_temp),
        format!("Room temp: {:.1}°C", s.current_temp),
        format!("Fan:       {}", s.fan_speed),
        format!("Swing:     v{} h{}", s.vertical_swing, s.horizontal_swing),
        format!("Display:   {}", on_off(s.display)),
        format!("RSSI:      {} dBm", s.rssi),
        format!("Error:     {}", s.error_code),
        format!("Source:    {}", s.source),
        format!("Reported:  {}", s.timestamp),
    ]);
    lines.join("\n")
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = util::fresh_snapshot(controller).await?;
    let rows = views(&snapshot);
    let out = output::render_list(
        &global.output,
        &rows,
        |v| DeviceRow::from(v),
        |v| v.device.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn status(
    controller: &Controller,
    device: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = util::fresh_snapshot(controller).await?;
    let id = util::resolve_device_id(&snapshot, device)?;
    let view = views(&snapshot)
        .into_iter()
        .find(|v| v.device.id == id)
        .ok_or_else(|| CliError::NotFound {
            identifier: device.into(),
        })?;
    let out = output::render_single(&global.output, &view, detail, |v| v.device.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
