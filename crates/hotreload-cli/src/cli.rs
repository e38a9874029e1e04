//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hot Reload CLI - reload plugins as their files change
#[derive(Parser)]
#[command(name = "hotreload")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Vault root directory
    #[arg(long, global = true, env = "HOTRELOAD_VAULT", default_value = ".")]
    pub vault: PathBuf,

    /// Configuration file path (toml, yaml or json)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Watch the vault and reload opted-in plugins on change
    Watch {
        /// Report files seen for the first time as changes
        #[arg(long)]
        reload_on_start: bool,
    },

    /// Reload one plugin now
    Reload {
        /// Plugin id
        plugin_id: String,
    },

    /// List installed plugins and their reload opt-in
    List,
}
