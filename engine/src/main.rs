// Dozio team task and reporting bot
// Main entry point for the dozio binary

use clap::Parser;
use dozio_engine::cli::{Cli, Command};
use dozio_engine::config::Config;
use dozio_engine::handlers::{
    handle_doctor, handle_setup, handle_start, handle_tasks, handle_users, OutputFormat,
};
use dozio_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let loaded = match &cli.config {
        Some(config_path) => Config::load_from_path(config_path),
        None => Config::load_or_create(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            init_telemetry();
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };

    // A subscriber can only be installed once, so wait for the config level
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Dozio v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Start => {
            tracing::info!("Starting bot...");
            handle_start(&config).await
        }

        Command::Setup => handle_setup().await,

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }

        Command::Users => handle_users(&config, format).await,

        Command::Tasks => handle_tasks(&config, format).await,
    }
}
