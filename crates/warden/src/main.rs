//! Warden command-line entry point.

use clap::Parser;
use std::time::Duration;
use warden::WardenConfig;
use warden::cli::{Cli, Commands, handle_replay_command, handle_validate_command};
use warden::core::{LoggingConfig, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { blocklist } => {
            init_tracing(&LoggingConfig::default());
            if !handle_validate_command(cli.config, blocklist).await? {
                std::process::exit(1);
            }
        }
        Commands::Replay {
            events,
            default_score,
            grace_secs,
        } => {
            let config = WardenConfig::load(cli.config.as_deref())?;
            init_tracing(config.logging());
            handle_replay_command(
                config,
                events,
                default_score,
                Duration::from_secs(grace_secs),
            )
            .await?;
        }
    }

    Ok(())
}
