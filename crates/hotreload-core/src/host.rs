//! Host collaborators
//!
//! Everything the reload core consumes from the application it is embedded in:
//! - Manifest enumeration and plugin lifecycle control
//! - File-system stat/existence queries and raw watch registration
//! - Process-wide toggle storage (the debug flag)
//! - User notifications and settings persistence
//!
//! Paths crossing this boundary are vault-relative and `/`-separated.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HostResult, ReloadError, ReloadResult};

/// An installed plugin as listed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Logical plugin identifier
    pub id: String,
    /// Vault-relative install directory, e.g. `.obsidian/plugins/foo`
    pub dir: String,
}

impl PluginManifest {
    pub fn new(id: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dir: dir.into(),
        }
    }

    /// Last path component of the install directory
    pub fn directory_name(&self) -> Option<&str> {
        self.dir.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

/// Modification metadata returned by [`VaultFs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub modified_at: SystemTime,
}

/// Plugin manifest listing and lifecycle control.
#[async_trait]
pub trait PluginHost: Send + Sync {
    /// List every installed plugin manifest.
    async fn manifests(&self) -> HostResult<Vec<PluginManifest>>;

    /// Whether the plugin is currently enabled.
    async fn is_enabled(&self, plugin_id: &str) -> bool;

    async fn disable(&self, plugin_id: &str) -> HostResult<()>;

    async fn enable(&self, plugin_id: &str) -> HostResult<()>;
}

/// File-system queries against the vault.
#[async_trait]
pub trait VaultFs: Send + Sync {
    /// Stat a file. `Ok(None)` means the file does not exist.
    async fn stat(&self, path: &str) -> HostResult<Option<FileStat>>;

    async fn exists(&self, path: &str) -> HostResult<bool>;

    /// Whether raw change events for `path` require an explicit watch
    /// registration on this platform.
    async fn watch_needed(&self, path: &str) -> HostResult<bool>;

    /// Register `path` so raw change events are delivered for it.
    async fn start_watch_path(&self, path: &str) -> HostResult<()>;
}

/// Persistent process-wide key/value toggles.
///
/// Synchronous so a scoped guard can restore a value on drop.
pub trait ToggleStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);
}

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Load/save surface for the small opaque settings object.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> HostResult<Option<serde_json::Value>>;

    async fn save(&self, data: serde_json::Value) -> HostResult<()>;
}

/// Bundle of host collaborators handed to the core at activation.
#[derive(Clone)]
pub struct Host {
    pub plugins: Arc<dyn PluginHost>,
    pub fs: Arc<dyn VaultFs>,
    pub toggles: Arc<dyn ToggleStore>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: Arc<dyn SettingsStore>,
}

/// Register a raw watch for `path` when the platform policy asks for one.
pub async fn ensure_watched(fs: &dyn VaultFs, path: &str) -> ReloadResult<()> {
    let needed = fs
        .watch_needed(path)
        .await
        .map_err(|source| ReloadError::Watch {
            path: path.to_string(),
            source,
        })?;

    if needed {
        fs.start_watch_path(path)
            .await
            .map_err(|source| ReloadError::Watch {
                path: path.to_string(),
                source,
            })?;
        debug!("Watching {}", path);
    }

    Ok(())
}
