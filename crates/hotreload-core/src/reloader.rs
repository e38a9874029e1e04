//! Disable/enable cycle for a single plugin

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{ReloadError, ReloadResult};
use crate::host::{Host, ToggleStore};

/// Outcome of a reload request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Reloaded { duration: Duration },
    /// The plugin was not enabled, so nothing was touched
    SkippedDisabled,
}

/// Scoped override of a process-wide toggle.
///
/// The prior value, including its absence, is written back when the guard
/// drops, on every exit path.
pub struct DebugToggleGuard {
    store: Arc<dyn ToggleStore>,
    key: String,
    previous: Option<String>,
}

impl DebugToggleGuard {
    pub fn acquire(store: Arc<dyn ToggleStore>, key: &str, value: &str) -> Self {
        let previous = store.get(key);
        store.set(key, value);
        Self {
            store,
            key: key.to_string(),
            previous,
        }
    }

    /// Value the toggle had before the guard was acquired
    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }
}

impl Drop for DebugToggleGuard {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => self.store.set(&self.key, &previous),
            None => self.store.remove(&self.key),
        }
    }
}

/// Reloads plugins through the host lifecycle API
#[derive(Clone)]
pub struct Reloader {
    host: Host,
    toggle_key: String,
    toggle_value: String,
}

impl Reloader {
    pub fn new(host: Host, toggle_key: &str, toggle_value: &str) -> Self {
        Self {
            host,
            toggle_key: toggle_key.to_string(),
            toggle_value: toggle_value.to_string(),
        }
    }

    /// Disable then re-enable `plugin_id` with the debug toggle switched on
    /// for the enable step. Plugins that are not enabled are left alone.
    pub async fn reload(&self, plugin_id: &str) -> ReloadResult<ReloadOutcome> {
        if !self.host.plugins.is_enabled(plugin_id).await {
            debug!("Skipping reload of disabled plugin {}", plugin_id);
            return Ok(ReloadOutcome::SkippedDisabled);
        }

        let start = Instant::now();

        self.host
            .plugins
            .disable(plugin_id)
            .await
            .map_err(|source| ReloadError::Disable {
                plugin_id: plugin_id.to_string(),
                source,
            })?;
        debug!("disabled {}", plugin_id);

        {
            let _debug = DebugToggleGuard::acquire(
                self.host.toggles.clone(),
                &self.toggle_key,
                &self.toggle_value,
            );
            self.host
                .plugins
                .enable(plugin_id)
                .await
                .map_err(|source| ReloadError::Enable {
                    plugin_id: plugin_id.to_string(),
                    source,
                })?;
        }
        debug!("enabled {}", plugin_id);

        self.host
            .notifier
            .notify(&format!("Plugin \"{}\" has been reloaded", plugin_id));

        Ok(ReloadOutcome::Reloaded {
            duration: start.elapsed(),
        })
    }
}
