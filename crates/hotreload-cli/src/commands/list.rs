//! `hotreload list` command implementation

use std::sync::Arc;

use colored::Colorize;
use hotreload_core::{HotReloadConfig, HotReloadManager};

use crate::vault::LocalVault;

/// Execute the `hotreload list` command
pub async fn run(vault: Arc<LocalVault>, config: HotReloadConfig) -> anyhow::Result<()> {
    let mut manager = HotReloadManager::start(config, vault.host()).await?;
    manager.flush().await?;
    let registry = manager.registry().await;
    manager.shutdown().await?;

    println!("{} Listing plugins", "→".green());
    println!();

    if registry.is_empty() {
        println!("  No plugins installed.");
        return Ok(());
    }

    let enabled = vault.enabled_plugins().await;
    let width = registry
        .entries()
        .iter()
        .map(|entry| entry.plugin_id.len())
        .max()
        .unwrap_or(0);

    for entry in registry.entries() {
        let state = if enabled.contains(&entry.plugin_id) {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        let hot = if registry.is_opted_in(&entry.plugin_id) {
            "hot-reload".cyan()
        } else {
            "".normal()
        };
        println!(
            "  {:width$}  {:<8}  {:<10}  {}",
            entry.plugin_id,
            state,
            hot,
            entry.directory_name.dimmed(),
            width = width
        );
    }

    Ok(())
}
