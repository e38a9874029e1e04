//! `hotreload reload` command implementation

use std::sync::Arc;

use colored::Colorize;
use hotreload_core::{HotReloadConfig, HotReloadManager, ReloadEvent};

use super::print_event;
use crate::vault::LocalVault;

/// Execute the `hotreload reload <id>` command
pub async fn run(
    vault: Arc<LocalVault>,
    config: HotReloadConfig,
    plugin_id: &str,
) -> anyhow::Result<()> {
    let mut manager = HotReloadManager::start(config, vault.host()).await?;
    manager.flush().await?;

    if manager.registry().await.dir_for_plugin(plugin_id).is_none() {
        manager.shutdown().await?;
        anyhow::bail!("Plugin {} is not installed", plugin_id);
    }

    let mut events = manager.subscribe();
    manager.reload_now(plugin_id)?;
    manager.flush().await?;
    manager.shutdown().await?;

    let mut failure = None;
    while let Ok(event) = events.try_recv() {
        print_event(&event);
        if let ReloadEvent::OperationFailed { error, .. } = event {
            failure = Some(error);
        }
    }

    match failure {
        Some(error) => Err(anyhow::anyhow!(error)),
        None => {
            println!("{} Done", "✓".green());
            Ok(())
        }
    }
}
