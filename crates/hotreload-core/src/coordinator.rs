//! Reload coordinator
//!
//! Debounces scan, reindex and per-plugin reload requests, then admits the
//! surviving request into the serialized [`OperationQueue`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::classifier::Action;
use crate::config::HotReloadConfig;
use crate::debounce::Debouncer;
use crate::error::ReloadResult;
use crate::queue::{Operation, OperationQueue};

/// Key of one debounce timer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DebounceKey {
    Scan,
    Reindex,
    Reload(String),
}

/// Debounce windows per request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceWindows {
    pub scan: Duration,
    pub reindex: Duration,
    pub reload: Duration,
}

impl From<&HotReloadConfig> for DebounceWindows {
    fn from(config: &HotReloadConfig) -> Self {
        Self {
            scan: config.scan_debounce,
            reindex: config.reindex_debounce,
            reload: config.reload_debounce,
        }
    }
}

struct CoordinatorInner {
    queue: OperationQueue,
    windows: DebounceWindows,
    timers: Debouncer<DebounceKey>,
}

/// Cheap-to-clone handle shared by the manager and the queue worker
#[derive(Clone)]
pub struct ReloadCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl ReloadCoordinator {
    pub fn new(queue: OperationQueue, windows: DebounceWindows) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                queue,
                windows,
                timers: Debouncer::new(),
            }),
        }
    }

    pub fn windows(&self) -> DebounceWindows {
        self.inner.windows
    }

    /// Ask for a scan once the scan window settles
    pub fn request_scan(&self) {
        self.schedule(DebounceKey::Scan, self.inner.windows.scan, Operation::Scan);
    }

    /// Ask for a reindex once the reindex window settles
    pub fn request_reindex(&self) {
        self.schedule(
            DebounceKey::Reindex,
            self.inner.windows.reindex,
            Operation::Reindex,
        );
    }

    /// Ask for a reload of `plugin_id` once its own window settles
    pub fn request_reload(&self, plugin_id: &str) {
        self.schedule(
            DebounceKey::Reload(plugin_id.to_string()),
            self.inner.windows.reload,
            Operation::Reload(plugin_id.to_string()),
        );
    }

    /// Route a classified action
    pub fn dispatch(&self, action: Action) {
        match action {
            Action::Ignore => {}
            Action::WatchNewDirectory(path) => {
                if let Err(e) = self.enqueue(Operation::WatchDirectory(path)) {
                    warn!("Failed to queue directory watch: {}", e);
                }
            }
            Action::Reindex => self.request_reindex(),
            Action::Reload(plugin_id) => self.request_reload(&plugin_id),
        }
    }

    /// Admit an operation immediately, bypassing debounce
    pub fn enqueue(&self, operation: Operation) -> ReloadResult<()> {
        self.inner.queue.push(operation)
    }

    pub fn is_pending(&self, key: &DebounceKey) -> bool {
        self.inner.timers.is_pending(key)
    }

    pub fn pending(&self) -> Vec<DebounceKey> {
        self.inner.timers.pending()
    }

    /// Drop every pending debounce timer
    pub fn cancel_pending(&self) {
        self.inner.timers.cancel_all();
    }

    fn schedule(&self, key: DebounceKey, delay: Duration, operation: Operation) {
        let queue = self.inner.queue.clone();
        debug!("Debouncing {:?} for {:?}", key, delay);
        self.inner.timers.schedule(key, delay, move || {
            if let Err(e) = queue.push(operation) {
                warn!("Dropping debounced operation: {}", e);
            }
        });
    }
}
