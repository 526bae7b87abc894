use clap::Parser;

use tabflow::app::{handle_fatal_error, initialize_app, AppConfig};
use tabflow::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app = match AppConfig::new(cli.verbose) {
        Ok(app) => app.with_config_path(cli.config),
        Err(e) => handle_fatal_error(e, cli.verbose),
    };
    initialize_app(&app);

    if let Err(e) = execute_command(cli.command, &app).await {
        handle_fatal_error(e, app.verbose);
    }
}
