//! Command dispatch: bridges CLI args -> core Controller -> output formatting.

pub mod apply;
pub mod config_cmd;
pub mod devices;
pub mod domains;
pub mod refresh;
pub mod routes;
pub mod watch;

use dantesync_core::SyncConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a domain-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: SyncConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Domains => domains::handle(config, global).await,
        Command::Devices => devices::handle(config, global).await,
        Command::Routes(args) => routes::handle(config, args, global).await,
        Command::Apply(args) => apply::handle(config, args, global).await,
        Command::Refresh => refresh::handle(config, global).await,
        Command::Watch(args) => watch::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
