//! Typed errors for the reload core.

use thiserror::Error;

/// Errors returned by host collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostError {
    /// An I/O error surfaced while talking to the host file system.
    #[error("Host I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The host does not know the requested plugin.
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// The host rejected a lifecycle call.
    #[error("Host rejected {action} for plugin {plugin_id}: {reason}")]
    Rejected {
        action: &'static str,
        plugin_id: String,
        reason: String,
    },

    /// A (de)serialization error surfaced while reading host data.
    #[error("Host serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Catch-all for errors that don't fit the above categories.
    #[error("{0}")]
    Other(String),
}

/// Result type for host collaborator calls
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised by queued reload operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReloadError {
    #[error("Failed to disable plugin {plugin_id}: {source}")]
    Disable {
        plugin_id: String,
        #[source]
        source: HostError,
    },

    #[error("Failed to enable plugin {plugin_id}: {source}")]
    Enable {
        plugin_id: String,
        #[source]
        source: HostError,
    },

    #[error("Reindex failed: {0}")]
    Reindex(#[source] HostError),

    #[error("Watch registration failed for {path}: {source}")]
    Watch {
        path: String,
        #[source]
        source: HostError,
    },

    #[error("Operation queue closed")]
    QueueClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for reload operations
pub type ReloadResult<T> = Result<T, ReloadError>;
