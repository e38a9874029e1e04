//! Reload configuration
//!
//! Debounce windows, the debug toggle, and the fixed file names watched in
//! every plugin directory.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where plugins live in the vault and which files matter inside each one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginLayout {
    /// Vault-relative plugin root
    pub plugin_folder: String,
    pub manifest_file: String,
    /// Compiled script
    pub script_file: String,
    pub stylesheet_file: String,
    /// Explicit reload opt-in marker
    pub opt_in_marker: String,
    /// Version-control marker, also treated as an opt-in
    pub vcs_marker: String,
}

impl Default for PluginLayout {
    fn default() -> Self {
        Self {
            plugin_folder: ".obsidian/plugins".to_string(),
            manifest_file: "manifest.json".to_string(),
            script_file: "main.js".to_string(),
            stylesheet_file: "styles.css".to_string(),
            opt_in_marker: ".hotreload".to_string(),
            vcs_marker: ".git".to_string(),
        }
    }
}

impl PluginLayout {
    /// Create a layout rooted at a different plugin folder
    pub fn with_plugin_folder(mut self, folder: &str) -> Self {
        self.plugin_folder = folder.trim_end_matches('/').to_string();
        self
    }

    /// Plugin folder without trailing separators, however it was configured
    pub fn root(&self) -> &str {
        self.plugin_folder.trim_end_matches('/')
    }

    /// Vault-relative directory of a plugin
    pub fn plugin_dir(&self, directory_name: &str) -> String {
        format!("{}/{}", self.root(), directory_name)
    }

    /// Vault-relative path of a file inside a plugin directory
    pub fn plugin_file(&self, directory_name: &str, file: &str) -> String {
        format!("{}/{}/{}", self.root(), directory_name, file)
    }

    /// Files stat'ed for every plugin on each scan, in scan order
    pub fn tracked_files(&self) -> [&str; 4] {
        [
            self.manifest_file.as_str(),
            self.script_file.as_str(),
            self.stylesheet_file.as_str(),
            self.opt_in_marker.as_str(),
        ]
    }

    /// Files whose change invalidates the registry
    pub fn is_index_file(&self, file: &str) -> bool {
        file == self.manifest_file || file == self.opt_in_marker || file == self.vcs_marker
    }

    /// Files whose change warrants a reload
    pub fn is_reloadable(&self, file: &str) -> bool {
        file == self.script_file || file == self.stylesheet_file
    }
}

/// Hot-reload configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotReloadConfig {
    /// Trailing-edge window collapsing scan requests
    #[serde(rename = "scan_debounce_ms", with = "duration_ms")]
    pub scan_debounce: Duration,
    /// Trailing-edge window collapsing reindex requests
    #[serde(rename = "reindex_debounce_ms", with = "duration_ms")]
    pub reindex_debounce: Duration,
    /// Per-plugin trailing-edge window collapsing reload requests
    #[serde(rename = "reload_debounce_ms", with = "duration_ms")]
    pub reload_debounce: Duration,
    /// Report files seen for the first time as changes
    pub reload_on_first_observation: bool,
    /// Toggle flipped on while a plugin is re-enabled
    pub debug_toggle_key: String,
    pub debug_toggle_value: String,
    /// How long deactivation waits for admitted operations to finish
    #[serde(rename = "shutdown_timeout_ms", with = "duration_ms")]
    pub shutdown_timeout: Duration,
    pub layout: PluginLayout,
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            scan_debounce: Duration::from_millis(250),
            reindex_debounce: Duration::from_millis(500),
            reload_debounce: Duration::from_millis(750),
            reload_on_first_observation: false,
            debug_toggle_key: "debug-plugin".to_string(),
            debug_toggle_value: "1".to_string(),
            shutdown_timeout: Duration::from_secs(5),
            layout: PluginLayout::default(),
        }
    }
}

impl HotReloadConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set scan debounce window
    pub fn with_scan_debounce(mut self, window: Duration) -> Self {
        self.scan_debounce = window;
        self
    }

    /// Set reindex debounce window
    pub fn with_reindex_debounce(mut self, window: Duration) -> Self {
        self.reindex_debounce = window;
        self
    }

    /// Set per-plugin reload debounce window
    pub fn with_reload_debounce(mut self, window: Duration) -> Self {
        self.reload_debounce = window;
        self
    }

    /// Enable/disable reporting first observations as changes
    pub fn with_reload_on_first_observation(mut self, enabled: bool) -> Self {
        self.reload_on_first_observation = enabled;
        self
    }

    /// Set the debug toggle key and the value written during re-enable
    pub fn with_debug_toggle(mut self, key: &str, value: &str) -> Self {
        self.debug_toggle_key = key.to_string();
        self.debug_toggle_value = value.to_string();
        self
    }

    /// Set shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set plugin layout
    pub fn with_layout(mut self, layout: PluginLayout) -> Self {
        self.layout = layout;
        self
    }
}

/// Small settings object persisted through the host settings store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotReloadSettings {
    pub profile: String,
}

impl Default for HotReloadSettings {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
        }
    }
}

impl HotReloadSettings {
    /// Overlay stored data on top of the defaults. Unknown or malformed
    /// fields fall back to their default values.
    pub fn merged(stored: Option<serde_json::Value>) -> Self {
        let mut merged = serde_json::to_value(Self::default()).unwrap_or_default();
        if let (Some(serde_json::Value::Object(stored)), serde_json::Value::Object(base)) =
            (stored, &mut merged)
        {
            for (key, value) in stored {
                base.insert(key, value);
            }
        }
        serde_json::from_value(merged).unwrap_or_default()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
