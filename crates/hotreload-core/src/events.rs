//! Reload events broadcast to subscribers

use std::time::Duration;

/// Hot-reload event
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReloadEvent {
    /// Registry replaced after a reindex
    Reindexed {
        plugins: usize,
        opted_in: Vec<String>,
    },
    /// A scan found a modified file
    ChangeDetected { path: String },
    /// Reload dequeued and starting
    ReloadStarted { plugin_id: String },
    /// Plugin disabled and re-enabled
    ReloadCompleted {
        plugin_id: String,
        duration: Duration,
    },
    /// Reload skipped because the plugin was not enabled
    ReloadSkipped { plugin_id: String },
    /// A queued operation failed; the queue moved on
    OperationFailed { operation: String, error: String },
}

impl ReloadEvent {
    /// Plugin this event concerns, if any
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            ReloadEvent::ReloadStarted { plugin_id }
            | ReloadEvent::ReloadCompleted { plugin_id, .. }
            | ReloadEvent::ReloadSkipped { plugin_id } => Some(plugin_id),
            _ => None,
        }
    }
}
