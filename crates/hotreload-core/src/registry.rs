//! Plugin registry
//!
//! Maps install-directory names to plugin identifiers and tracks which plugins
//! opted into reload-on-change. Rebuilt from scratch on every reindex.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PluginLayout;
use crate::error::{ReloadError, ReloadResult};
use crate::host::{PluginHost, PluginManifest, VaultFs};

/// One installed plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDirEntry {
    pub directory_name: String,
    pub plugin_id: String,
}

/// Directory name <-> plugin id bijection plus the reload opt-in set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginRegistry {
    by_dir: BTreeMap<String, String>,
    by_id: BTreeMap<String, String>,
    opted_in: BTreeSet<String>,
}

/// Output of a reindex pass
#[derive(Debug, Default)]
pub struct RegistryBuild {
    pub registry: PluginRegistry,
    /// Vault-relative plugin directories to register for raw watching
    pub watch_dirs: Vec<String>,
    /// Plugin ids left out of this cycle
    pub skipped: Vec<String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Returns `false` without modifying the registry when
    /// either the directory name or the plugin id is already mapped.
    pub fn insert(&mut self, entry: PluginDirEntry, opted_in: bool) -> bool {
        if self.by_dir.contains_key(&entry.directory_name)
            || self.by_id.contains_key(&entry.plugin_id)
        {
            return false;
        }

        if opted_in {
            self.opted_in.insert(entry.plugin_id.clone());
        }
        self.by_id
            .insert(entry.plugin_id.clone(), entry.directory_name.clone());
        self.by_dir.insert(entry.directory_name, entry.plugin_id);
        true
    }

    pub fn plugin_for_dir(&self, directory_name: &str) -> Option<&str> {
        self.by_dir.get(directory_name).map(String::as_str)
    }

    pub fn dir_for_plugin(&self, plugin_id: &str) -> Option<&str> {
        self.by_id.get(plugin_id).map(String::as_str)
    }

    pub fn is_opted_in(&self, plugin_id: &str) -> bool {
        self.opted_in.contains(plugin_id)
    }

    /// Known directory names in sorted order
    pub fn directories(&self) -> impl Iterator<Item = &str> {
        self.by_dir.keys().map(String::as_str)
    }

    pub fn entries(&self) -> Vec<PluginDirEntry> {
        self.by_dir
            .iter()
            .map(|(dir, id)| PluginDirEntry {
                directory_name: dir.clone(),
                plugin_id: id.clone(),
            })
            .collect()
    }

    pub fn opted_in(&self) -> Vec<String> {
        self.opted_in.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_dir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_dir.is_empty()
    }

    /// Rebuild the registry from the host's manifest listing.
    ///
    /// A plugin whose directory cannot be inspected is logged and left out;
    /// only a failure to list manifests at all fails the reindex.
    pub async fn reindex(
        plugins: &dyn PluginHost,
        fs: &dyn VaultFs,
        layout: &PluginLayout,
    ) -> ReloadResult<RegistryBuild> {
        let manifests = plugins.manifests().await.map_err(ReloadError::Reindex)?;
        let mut build = RegistryBuild::default();

        for manifest in manifests {
            let Some(directory_name) = manifest.directory_name().map(str::to_string) else {
                warn!("Manifest {} has no install directory", manifest.id);
                build.skipped.push(manifest.id);
                continue;
            };

            build.watch_dirs.push(manifest.dir.clone());

            let opted_in = match Self::has_opt_in_marker(fs, &manifest, layout).await {
                Ok(opted_in) => opted_in,
                Err(e) => {
                    warn!("Failed to inspect plugin directory {}: {}", manifest.dir, e);
                    build.skipped.push(manifest.id);
                    continue;
                }
            };

            let entry = PluginDirEntry {
                directory_name,
                plugin_id: manifest.id.clone(),
            };
            if !build.registry.insert(entry, opted_in) {
                warn!(
                    "Skipping plugin {}: directory {} or id already registered",
                    manifest.id, manifest.dir
                );
                build.skipped.push(manifest.id);
                continue;
            }

            debug!("Indexed plugin {} (opted in: {})", manifest.id, opted_in);
        }

        info!(
            "Indexed {} plugins, {} opted into hot reload",
            build.registry.len(),
            build.registry.opted_in.len()
        );
        Ok(build)
    }

    async fn has_opt_in_marker(
        fs: &dyn VaultFs,
        manifest: &PluginManifest,
        layout: &PluginLayout,
    ) -> crate::error::HostResult<bool> {
        for marker in [&layout.vcs_marker, &layout.opt_in_marker] {
            if fs.exists(&format!("{}/{}", manifest.dir, marker)).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
