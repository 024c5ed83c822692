//! Command handlers.

pub mod config_cmd;
pub mod control;
pub mod devices;
pub mod sync;
pub mod util;
pub mod watch;

use bluestar_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::list(controller, global).await,
        Command::Status(args) => devices::status(controller, &args.device, global).await,
        Command::Control(args) => control::handle(controller, &args, global).await,
        Command::Sync(args) => sync::handle(controller, &args.device, global).await,
        Command::Watch(_) => watch::handle(controller, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
