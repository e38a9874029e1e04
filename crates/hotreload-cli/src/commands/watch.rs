//! `hotreload watch` command implementation

use std::sync::Arc;

use colored::Colorize;
use hotreload_core::{HotReloadConfig, HotReloadManager};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::print_event;
use crate::vault::LocalVault;
use crate::watch::RawWatcher;

/// Execute the `hotreload watch` command
pub async fn run(vault: Arc<LocalVault>, config: HotReloadConfig) -> anyhow::Result<()> {
    let (watcher, mut raw_rx) = RawWatcher::new()?;
    vault.attach_watcher(watcher.clone());

    let plugin_folder = vault.resolve(config.layout.root());
    if let Err(e) = watcher.watch_root(&plugin_folder) {
        warn!("Cannot watch {}: {}", plugin_folder.display(), e);
    }

    let mut manager = HotReloadManager::start(config, vault.host()).await?;
    let mut events = manager.subscribe();

    println!(
        "{} Watching {} (type {} to rescan, Ctrl-C to stop)",
        "→".green(),
        plugin_folder.display(),
        "scan".bold()
    );

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(change) = raw_rx.recv() => {
                let path = change.path.as_deref().and_then(|path| vault.relativize(path));
                manager.handle_raw_event(path.as_deref()).await;
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match line.trim() {
                    "" => {}
                    "scan" => manager.request_scan(),
                    other => println!("{} Unknown command: {}", "!".yellow(), other),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!("Dropped {} reload events", skipped),
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    manager.shutdown().await?;
    watcher.clear();
    println!("{} Stopped", "✓".green());
    Ok(())
}
