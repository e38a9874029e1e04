//! CLI command implementations

pub mod list;
pub mod reload;
pub mod watch;

use colored::Colorize;
use hotreload_core::ReloadEvent;

/// Print a reload event the way the daemon reports progress
pub(crate) fn print_event(event: &ReloadEvent) {
    match event {
        ReloadEvent::Reindexed { plugins, opted_in } => {
            println!(
                "{} Indexed {} plugins ({} opted in)",
                "→".green(),
                plugins,
                opted_in.len()
            );
        }
        ReloadEvent::ChangeDetected { path } => {
            println!("{} Changed: {}", "→".cyan(), path.dimmed());
        }
        ReloadEvent::ReloadStarted { plugin_id } => {
            println!("{} Reloading {}", "→".cyan(), plugin_id.bold());
        }
        ReloadEvent::ReloadCompleted { .. } => {}
        ReloadEvent::ReloadSkipped { plugin_id } => {
            println!(
                "{} Skipped {}: plugin is not enabled",
                "!".yellow(),
                plugin_id
            );
        }
        ReloadEvent::OperationFailed { operation, error } => {
            println!("{} {} failed: {}", "✗".red(), operation, error);
        }
        _ => {}
    }
}
