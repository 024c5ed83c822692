//! Control command handler.

use bluestar_core::{ControlIntent, ControlOutcome, Controller};

use crate::cli::{ControlArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, on_off};

use super::util;

impl From<&ControlArgs> for ControlIntent {
    fn from(args: &ControlArgs) -> Self {
        Self {
            power: args.power.map(bool::from),
            mode: args.mode,
            target_temp: args.temp,
            fan_speed: args.fan,
            vertical_swing: args.vswing,
            horizontal_swing: args.hswing,
            display: args.display.map(bool::from),
        }
    }
}

fn validate(intent: &ControlIntent) -> Result<(), CliError> {
    if intent.is_empty() {
        return Err(CliError::Validation {
            field: "control".into(),
            reason: "nothing to change; pass at least one setting".into(),
        });
    }
    if let Some(t) = intent.target_temp {
        if !t.is_finite() {
            return Err(CliError::Validation {
                field: "temp".into(),
                reason: format!("expected a temperature in °C, got {t}"),
            });
        }
    }
    Ok(())
}

/// Table rendering shared with `sync`.
pub fn outcome_detail(outcome: &ControlOutcome) -> String {
    let mut lines = vec![
        format!("Method:    {}", outcome.method),
        format!(
            "Confirmed: {}",
            if outcome.confirmed { "yes" } else { "no" }
        ),
    ];
    match &outcome.state {
        Some(s) => lines.extend([
            format!("Power:     {}", on_off(s.power)),
            format!("Mode:      {}", s.mode),
            format!("Set temp:  {:.1}°C", s.target_temp),
            format!("Fan:       {}", s.fan_speed),
        ]),
        None => lines.push("State:     (refresh failed)".into()),
    }
    lines.join("\n")
}

pub async fn handle(
    controller: &Controller,
    args: &ControlArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let intent = ControlIntent::from(args);
    validate(&intent)?;

    let snapshot = util::fresh_snapshot(controller).await?;
    let id = util::resolve_device_id(&snapshot, &args.device)?;

    let outcome = controller.control_device(&id, &intent).await?;
    if !outcome.confirmed {
        tracing::warn!(device = %id, method = %outcome.method, "change was not confirmed");
    }

    let out = output::render_single(&global.output, &outcome, outcome_detail, |o| {
        o.method.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
