//! Raw change notifications from the operating system
//!
//! Wraps a `notify` watcher. Events are reduced to the changed path and
//! forwarded over a tokio channel; deciding what a change means is left to
//! the reload core.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A raw change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    /// Absolute path reported by the platform, when it reported one
    pub path: Option<PathBuf>,
}

/// Shared handle to the platform watcher
#[derive(Clone)]
pub struct RawWatcher {
    watcher: Arc<Mutex<RecommendedWatcher>>,
    watched: Arc<Mutex<HashSet<PathBuf>>>,
}

impl RawWatcher {
    /// Start the platform watcher. Nothing is watched until a path is added.
    pub fn new() -> Result<(Self, mpsc::Receiver<RawChange>), notify::Error> {
        let (tx, rx) = mpsc::channel(1024);

        let watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    if event.paths.is_empty() {
                        let _ = tx.blocking_send(RawChange { path: None });
                    }
                    for path in event.paths {
                        let _ = tx.blocking_send(RawChange { path: Some(path) });
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            },
            Config::default(),
        )?;

        Ok((
            Self {
                watcher: Arc::new(Mutex::new(watcher)),
                watched: Arc::new(Mutex::new(HashSet::new())),
            },
            rx,
        ))
    }

    /// Watch the plugin folder itself. Platforms that deliver recursive
    /// events get a recursive watch; elsewhere each plugin directory is
    /// added separately as it is indexed.
    pub fn watch_root(&self, path: &Path) -> Result<(), notify::Error> {
        let mode = if cfg!(any(target_os = "macos", target_os = "windows")) {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        self.watch(path, mode)
    }

    /// Watch a single directory, non-recursively
    pub fn watch_directory(&self, path: &Path) -> Result<(), notify::Error> {
        self.watch(path, RecursiveMode::NonRecursive)
    }

    fn watch(&self, path: &Path, mode: RecursiveMode) -> Result<(), notify::Error> {
        if !self.watched.lock().insert(path.to_path_buf()) {
            debug!("Already watching {:?}", path);
            return Ok(());
        }

        let result = self.watcher.lock().watch(path, mode);
        if let Err(e) = result {
            self.watched.lock().remove(path);
            return Err(e);
        }
        info!("Watching {:?} ({:?})", path, mode);
        Ok(())
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched.lock().contains(path)
    }

    /// Stop watching everything
    pub fn clear(&self) {
        let mut watched = self.watched.lock();
        let mut watcher = self.watcher.lock();
        for path in watched.drain() {
            if let Err(e) = watcher.unwatch(&path) {
                debug!("Failed to unwatch {:?}: {}", path, e);
            }
        }
    }
}
