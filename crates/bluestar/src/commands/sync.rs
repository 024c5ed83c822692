//! Force-sync handler.

use bluestar_core::Controller;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{control::outcome_detail, util};

pub async fn handle(
    controller: &Controller,
    device: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = util::fresh_snapshot(controller).await?;
    let id = util::resolve_device_id(&snapshot, device)?;

    let outcome = controller.force_sync(&id).await?;
    let out = output::render_single(&global.output, &outcome, outcome_detail, |o| {
        o.method.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
