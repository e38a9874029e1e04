//! Hot-reload manager
//!
//! Owns the process-scoped reload state for one activation: the stat cache,
//! the plugin registry, the debounce timers and the queue worker. Created on
//! activation, discarded on [`HotReloadManager::shutdown`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::classifier::{Action, classify};
use crate::config::{HotReloadConfig, HotReloadSettings};
use crate::coordinator::{DebounceWindows, ReloadCoordinator};
use crate::error::{ReloadError, ReloadResult};
use crate::events::ReloadEvent;
use crate::host::{Host, ensure_watched};
use crate::queue::{Operation, OperationHandler, OperationQueue, run_queue};
use crate::registry::PluginRegistry;
use crate::reloader::{ReloadOutcome, Reloader};
use crate::scanner::Scanner;
use crate::stat_cache::StatCache;

/// Executes queued operations. Sole owner of the stat cache and the only
/// writer of the registry.
struct ReloadWorker {
    config: HotReloadConfig,
    host: Host,
    stat_cache: StatCache,
    registry: Arc<RwLock<PluginRegistry>>,
    coordinator: ReloadCoordinator,
    reloader: Reloader,
    events: broadcast::Sender<ReloadEvent>,
}

impl ReloadWorker {
    async fn reindex(&mut self) -> ReloadResult<()> {
        let build = PluginRegistry::reindex(
            self.host.plugins.as_ref(),
            self.host.fs.as_ref(),
            &self.config.layout,
        )
        .await?;

        for dir in &build.watch_dirs {
            if let Err(e) = ensure_watched(self.host.fs.as_ref(), dir).await {
                warn!("{}", e);
            }
        }

        let plugins = build.registry.len();
        let opted_in = build.registry.opted_in();
        *self.registry.write().await = build.registry;

        let _ = self.events.send(ReloadEvent::Reindexed { plugins, opted_in });
        Ok(())
    }

    async fn scan(&mut self) -> ReloadResult<()> {
        let registry = self.registry.read().await;
        let changed = Scanner::new(&self.config.layout)
            .with_report_first(self.config.reload_on_first_observation)
            .scan(&mut self.stat_cache, &registry, self.host.fs.as_ref())
            .await;

        for path in changed {
            let action = classify(&path, &self.config.layout, &registry);
            debug!("{} -> {:?}", path, action);
            let _ = self.events.send(ReloadEvent::ChangeDetected { path });
            self.coordinator.dispatch(action);
        }

        Ok(())
    }

    async fn reload(&mut self, plugin_id: String) -> ReloadResult<()> {
        let _ = self.events.send(ReloadEvent::ReloadStarted {
            plugin_id: plugin_id.clone(),
        });

        match self.reloader.reload(&plugin_id).await? {
            ReloadOutcome::Reloaded { duration } => {
                info!("Plugin {} reloaded in {:?}", plugin_id, duration);
                let _ = self.events.send(ReloadEvent::ReloadCompleted {
                    plugin_id,
                    duration,
                });
            }
            ReloadOutcome::SkippedDisabled => {
                let _ = self.events.send(ReloadEvent::ReloadSkipped { plugin_id });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl OperationHandler for ReloadWorker {
    async fn handle(&mut self, operation: Operation) -> ReloadResult<()> {
        match operation {
            Operation::Reindex => self.reindex().await,
            Operation::Scan => self.scan().await,
            Operation::Reload(plugin_id) => self.reload(plugin_id).await,
            Operation::WatchDirectory(path) => ensure_watched(self.host.fs.as_ref(), &path).await,
            Operation::Barrier(done) => {
                let _ = done.send(());
                Ok(())
            }
            Operation::Stop => Ok(()),
        }
    }
}

/// Hot-reload manager
pub struct HotReloadManager {
    config: HotReloadConfig,
    host: Host,
    coordinator: ReloadCoordinator,
    registry: Arc<RwLock<PluginRegistry>>,
    settings: HotReloadSettings,
    event_tx: broadcast::Sender<ReloadEvent>,
    worker: Option<JoinHandle<()>>,
}

impl HotReloadManager {
    /// Activate: load settings, spawn the queue worker, queue the initial
    /// reindex and plugin-folder watch, and request the first scan.
    pub async fn start(config: HotReloadConfig, host: Host) -> ReloadResult<Self> {
        info!(
            "Starting hot-reload manager for {}",
            config.layout.root()
        );

        let settings = match host.settings.load().await {
            Ok(stored) => HotReloadSettings::merged(stored),
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                HotReloadSettings::default()
            }
        };

        let (queue, rx) = OperationQueue::channel();
        let (event_tx, _) = broadcast::channel(1024);
        let registry = Arc::new(RwLock::new(PluginRegistry::new()));
        let coordinator = ReloadCoordinator::new(queue, DebounceWindows::from(&config));

        let worker = ReloadWorker {
            config: config.clone(),
            host: host.clone(),
            stat_cache: StatCache::new(),
            registry: registry.clone(),
            coordinator: coordinator.clone(),
            reloader: Reloader::new(
                host.clone(),
                &config.debug_toggle_key,
                &config.debug_toggle_value,
            ),
            events: event_tx.clone(),
        };
        let worker = tokio::spawn(run_queue(rx, worker, event_tx.clone()));

        coordinator.enqueue(Operation::Reindex)?;
        coordinator.enqueue(Operation::WatchDirectory(
            config.layout.root().to_string(),
        ))?;
        coordinator.request_scan();

        Ok(Self {
            config,
            host,
            coordinator,
            registry,
            settings,
            event_tx,
            worker: Some(worker),
        })
    }

    /// Subscribe to reload events
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &HotReloadConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &ReloadCoordinator {
        &self.coordinator
    }

    /// Check plugins for changes and reload them. Entry point for raw
    /// change notifications and the user command alike.
    pub fn request_scan(&self) {
        self.coordinator.request_scan();
    }

    /// Ask for a debounced reindex
    pub fn request_reindex(&self) {
        self.coordinator.request_reindex();
    }

    /// Ask for a debounced reload of one plugin
    pub fn request_reload(&self, plugin_id: &str) {
        self.coordinator.request_reload(plugin_id);
    }

    /// Queue a reload of `plugin_id` right away, bypassing debounce
    pub fn reload_now(&self, plugin_id: &str) -> ReloadResult<()> {
        self.coordinator
            .enqueue(Operation::Reload(plugin_id.to_string()))
    }

    /// Handle a raw change notification.
    ///
    /// A path payload, when the host supplies one, is classified so new
    /// plugin directories and registry inputs are picked up; reloads still
    /// come only from the stat diff of the scan requested here.
    pub async fn handle_raw_event(&self, path: Option<&str>) {
        if let Some(path) = path {
            let action = {
                let registry = self.registry.read().await;
                classify(path, &self.config.layout, &registry)
            };
            match action {
                Action::WatchNewDirectory(_) | Action::Reindex => {
                    debug!("Raw change {} -> {:?}", path, action);
                    self.coordinator.dispatch(action);
                }
                Action::Reload(_) | Action::Ignore => {}
            }
        }

        self.coordinator.request_scan();
    }

    /// Copy of the current registry
    pub async fn registry(&self) -> PluginRegistry {
        self.registry.read().await.clone()
    }

    pub fn settings(&self) -> &HotReloadSettings {
        &self.settings
    }

    /// Replace and persist the settings object
    pub async fn save_settings(&mut self, settings: HotReloadSettings) -> ReloadResult<()> {
        let data = serde_json::to_value(&settings)
            .map_err(|e| ReloadError::Internal(format!("Failed to encode settings: {}", e)))?;
        self.host
            .settings
            .save(data)
            .await
            .map_err(|e| ReloadError::Internal(format!("Failed to save settings: {}", e)))?;
        self.settings = settings;
        Ok(())
    }

    /// Wait until every operation admitted so far has finished
    pub async fn flush(&self) -> ReloadResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.coordinator.enqueue(Operation::Barrier(done_tx))?;
        done_rx.await.map_err(|_| ReloadError::QueueClosed)
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Deactivate: cancel pending debounce timers, let admitted operations
    /// finish (bounded by the shutdown timeout) and drop all state.
    pub async fn shutdown(&mut self) -> ReloadResult<()> {
        info!("Stopping hot-reload manager");
        self.coordinator.cancel_pending();

        let Some(mut worker) = self.worker.take() else {
            return Ok(());
        };

        if self.coordinator.enqueue(Operation::Stop).is_err() {
            debug!("Operation queue already closed");
        }

        match tokio::time::timeout(self.config.shutdown_timeout, &mut worker).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Queue worker ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "Queue worker did not stop within {:?}, aborting",
                    self.config.shutdown_timeout
                );
                worker.abort();
            }
        }
        // Operations drained before Stop may have scheduled new timers
        self.coordinator.cancel_pending();

        *self.registry.write().await = PluginRegistry::new();
        info!("Hot-reload manager stopped");
        Ok(())
    }
}

impl Drop for HotReloadManager {
    fn drop(&mut self) {
        self.coordinator.cancel_pending();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
