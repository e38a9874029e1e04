//! Plugin hot reload
//!
//! Detects edits to opted-in plugins inside a vault and reloads them in place:
//! - Stat-based change detection over each plugin's tracked files
//! - Plugin registry rebuilt from the host's manifest listing
//! - Path classification for raw change notifications
//! - Per-key debouncing in front of one serialized operation queue
//! - Disable/enable cycle with a scoped debug toggle
//!
//! The host application is reached only through the traits in [`host`].

pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod events;
pub mod host;
pub mod manager;
pub mod queue;
pub mod registry;
pub mod reloader;
pub mod scanner;
pub mod stat_cache;

pub use classifier::{Action, classify};
pub use config::{HotReloadConfig, HotReloadSettings, PluginLayout};
pub use coordinator::{DebounceKey, DebounceWindows, ReloadCoordinator};
pub use debounce::Debouncer;
pub use error::{HostError, HostResult, ReloadError, ReloadResult};
pub use events::ReloadEvent;
pub use host::{
    FileStat, Host, Notifier, PluginHost, PluginManifest, SettingsStore, ToggleStore, VaultFs,
};
pub use manager::HotReloadManager;
pub use queue::{Operation, OperationHandler, OperationQueue};
pub use registry::{PluginDirEntry, PluginRegistry, RegistryBuild};
pub use reloader::{DebugToggleGuard, ReloadOutcome, Reloader};
pub use scanner::Scanner;
pub use stat_cache::{Observation, StatCache, StatRecord};
