//! Command routing

use anyhow::Result;

use crate::app::AppConfig;
use crate::cli::args::Commands;
use crate::cli::commands;

/// Execute a parsed command; no subcommand means `run`
pub async fn execute_command(command: Option<Commands>, app: &AppConfig) -> Result<()> {
    match command {
        None | Some(Commands::Run) => commands::run::execute(app).await,
        Some(Commands::Serve { host, port }) => commands::serve::execute(app, host, port).await,
        Some(Commands::Predict { input, run }) => {
            commands::predict::execute(app, input.as_deref(), run.as_deref())
        }
        Some(Commands::Runs { command }) => commands::runs::execute(app, command),
    }
}
