//! Hot Reload CLI - reload plugins in a vault as their files change

mod cli;
mod commands;
mod config;
mod error;
mod vault;
mod watch;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

pub use error::CliError;

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command_async(cli))
}

async fn run_command_async(cli: Cli) -> anyhow::Result<()> {
    let mut config = config::load(cli.config.as_deref())?;
    if let Commands::Watch {
        reload_on_start: true,
    } = cli.command
    {
        config.reload_on_first_observation = true;
    }

    let root = std::fs::canonicalize(&cli.vault)
        .map_err(|e| CliError::VaultError(format!("{}: {}", cli.vault.display(), e)))?;
    let vault = Arc::new(vault::LocalVault::open(root, config.layout.clone()));

    match cli.command {
        Commands::Watch { .. } => commands::watch::run(vault, config).await?,
        Commands::Reload { plugin_id } => {
            commands::reload::run(vault, config, &plugin_id).await?
        }
        Commands::List => commands::list::run(vault, config).await?,
    }

    Ok(())
}
