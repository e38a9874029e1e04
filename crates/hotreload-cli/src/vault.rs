//! File-system backed host
//!
//! Serves a vault directory on disk to the reload core. Plugin state that a
//! desktop host would keep in memory lives in small JSON files next to the
//! plugin folder so separate CLI runs agree on it.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use hotreload_core::{
    FileStat, Host, HostError, HostResult, Notifier, PluginHost, PluginLayout, PluginManifest,
    SettingsStore, ToggleStore, VaultFs,
};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::watch::RawWatcher;

const ENABLED_PLUGINS_FILE: &str = "community-plugins.json";
const TOGGLES_FILE: &str = "hotreload-toggles.json";
const SETTINGS_DIR: &str = "hot-reload";
const SETTINGS_FILE: &str = "data.json";

#[derive(Debug, Deserialize)]
struct ManifestFile {
    id: String,
}

/// Vault on the local file system
pub struct LocalVault {
    root: PathBuf,
    layout: PluginLayout,
    config_dir: String,
    toggles: Mutex<BTreeMap<String, String>>,
    watcher: Mutex<Option<RawWatcher>>,
}

impl LocalVault {
    /// Open the vault rooted at `root`, loading previously saved toggles.
    pub fn open(root: impl Into<PathBuf>, layout: PluginLayout) -> Self {
        let root = root.into();
        let config_dir = match layout.root().rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => String::new(),
        };

        let vault = Self {
            root,
            layout,
            config_dir,
            toggles: Mutex::new(BTreeMap::new()),
            watcher: Mutex::new(None),
        };

        let toggles_file = vault.config_file(TOGGLES_FILE);
        let content = std::fs::read_to_string(vault.resolve(&toggles_file));
        *vault.toggles.lock() = parse_json(&toggles_file, content).unwrap_or_default();
        vault
    }

    /// Route watch registrations to `watcher`
    pub fn attach_watcher(&self, watcher: RawWatcher) {
        *self.watcher.lock() = Some(watcher);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &PluginLayout {
        &self.layout
    }

    /// Host handles backed by this vault
    pub fn host(self: &Arc<Self>) -> Host {
        Host {
            plugins: self.clone(),
            fs: self.clone(),
            toggles: self.clone(),
            notifier: self.clone(),
            settings: self.clone(),
        }
    }

    /// Absolute path of a vault-relative `/`-separated path
    pub fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }

    /// Vault-relative `/`-separated form of an absolute path, if it is inside
    /// the vault
    pub fn relativize(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }

    /// Ids listed as enabled in the vault configuration
    pub async fn enabled_plugins(&self) -> BTreeSet<String> {
        let path = self.config_file(ENABLED_PLUGINS_FILE);
        let content = tokio::fs::read_to_string(self.resolve(&path)).await;
        parse_json::<Vec<String>>(&path, content)
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    fn config_file(&self, name: &str) -> String {
        if self.config_dir.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.config_dir, name)
        }
    }

    fn settings_file(&self) -> String {
        format!(
            "{}/{}",
            self.layout.plugin_dir(SETTINGS_DIR),
            SETTINGS_FILE
        )
    }

    fn persist_toggles(&self, toggles: &BTreeMap<String, String>) {
        let path = self.resolve(&self.config_file(TOGGLES_FILE));
        let result = serde_json::to_string_pretty(toggles)
            .map_err(HostError::from)
            .and_then(|content| {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, content).map_err(HostError::from)
            });
        if let Err(e) = result {
            warn!("Failed to persist toggles to {}: {}", path.display(), e);
        }
    }

    async fn find_manifest(&self, plugin_id: &str) -> HostResult<PluginManifest> {
        self.manifests()
            .await?
            .into_iter()
            .find(|manifest| manifest.id == plugin_id)
            .ok_or_else(|| HostError::PluginNotFound(plugin_id.to_string()))
    }
}

/// Decode a vault JSON file, treating a missing or malformed file as absent
fn parse_json<T: serde::de::DeserializeOwned>(path: &str, content: io::Result<String>) -> Option<T> {
    let content = match content {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Failed to read {}: {}", path, e);
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring malformed {}: {}", path, e);
            None
        }
    }
}

#[async_trait]
impl PluginHost for LocalVault {
    async fn manifests(&self) -> HostResult<Vec<PluginManifest>> {
        let folder = self.resolve(self.layout.root());
        let mut entries = match tokio::fs::read_dir(&folder).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Plugin folder {} does not exist", folder.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut manifests = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_dir = tokio::fs::metadata(entry.path())
                .await
                .map(|metadata| metadata.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            let manifest_path = self.layout.plugin_file(&name, &self.layout.manifest_file);
            let content = match tokio::fs::read_to_string(self.resolve(&manifest_path)).await {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!("Failed to read {}: {}", manifest_path, e);
                    continue;
                }
            };
            match serde_json::from_str::<ManifestFile>(&content) {
                Ok(manifest) => {
                    manifests.push(PluginManifest::new(manifest.id, self.layout.plugin_dir(&name)))
                }
                Err(e) => warn!("Ignoring malformed manifest {}: {}", manifest_path, e),
            }
        }

        manifests.sort_by(|a, b| a.dir.cmp(&b.dir));
        Ok(manifests)
    }

    async fn is_enabled(&self, plugin_id: &str) -> bool {
        self.enabled_plugins().await.contains(plugin_id)
    }

    async fn disable(&self, plugin_id: &str) -> HostResult<()> {
        info!("Unloaded plugin {}", plugin_id);
        Ok(())
    }

    async fn enable(&self, plugin_id: &str) -> HostResult<()> {
        let manifest = self.find_manifest(plugin_id).await?;
        let Some(directory_name) = manifest.directory_name() else {
            return Err(HostError::PluginNotFound(plugin_id.to_string()));
        };

        let script_path = self.layout.plugin_file(directory_name, &self.layout.script_file);
        let script = match tokio::fs::read(self.resolve(&script_path)).await {
            Ok(script) => script,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(HostError::Rejected {
                    action: "enable",
                    plugin_id: plugin_id.to_string(),
                    reason: format!("{} is missing", script_path),
                });
            }
            Err(e) => return Err(e.into()),
        };

        info!("Loaded plugin {} ({} bytes)", plugin_id, script.len());
        Ok(())
    }
}

#[async_trait]
impl VaultFs for LocalVault {
    async fn stat(&self, path: &str) -> HostResult<Option<FileStat>> {
        match tokio::fs::metadata(self.resolve(path)).await {
            Ok(metadata) => Ok(Some(FileStat {
                modified_at: metadata.modified()?,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> HostResult<bool> {
        Ok(tokio::fs::try_exists(self.resolve(path)).await?)
    }

    async fn watch_needed(&self, path: &str) -> HostResult<bool> {
        let absolute = self.resolve(path);
        let link = match tokio::fs::symlink_metadata(&absolute).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let recursive_events = cfg!(any(target_os = "macos", target_os = "windows"));
        if recursive_events && !link.file_type().is_symlink() {
            return Ok(false);
        }

        match tokio::fs::metadata(&absolute).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn start_watch_path(&self, path: &str) -> HostResult<()> {
        let watcher = self.watcher.lock().clone();
        match watcher {
            Some(watcher) => watcher
                .watch_directory(&self.resolve(path))
                .map_err(|e| HostError::Other(e.to_string())),
            None => {
                debug!("No raw watcher attached, skipping {}", path);
                Ok(())
            }
        }
    }
}

impl ToggleStore for LocalVault {
    fn get(&self, key: &str) -> Option<String> {
        self.toggles.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut toggles = self.toggles.lock();
        toggles.insert(key.to_string(), value.to_string());
        self.persist_toggles(&toggles);
    }

    fn remove(&self, key: &str) {
        let mut toggles = self.toggles.lock();
        if toggles.remove(key).is_some() {
            self.persist_toggles(&toggles);
        }
    }
}

impl Notifier for LocalVault {
    fn notify(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }
}

#[async_trait]
impl SettingsStore for LocalVault {
    async fn load(&self) -> HostResult<Option<serde_json::Value>> {
        match tokio::fs::read_to_string(self.resolve(&self.settings_file())).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, data: serde_json::Value) -> HostResult<()> {
        let path = self.resolve(&self.settings_file());
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_string_pretty(&data)?).await?;
        Ok(())
    }
}
