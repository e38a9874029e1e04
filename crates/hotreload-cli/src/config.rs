//! Configuration loading
//!
//! An optional file (format picked from its extension) overlaid by
//! `HOTRELOAD_*` environment variables. Nested keys use `__`, e.g.
//! `HOTRELOAD_LAYOUT__PLUGIN_FOLDER`.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use hotreload_core::HotReloadConfig;

use crate::error::CliError;

pub const ENV_PREFIX: &str = "HOTRELOAD";

/// Detect the file format from the extension
pub fn detect_format(path: &Path) -> Result<FileFormat, CliError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| CliError::UnsupportedFormat(format!("{} has no extension", path.display())))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        other => Err(CliError::UnsupportedFormat(other.to_string())),
    }
}

/// Load the reload configuration
pub fn load(path: Option<&Path>) -> Result<HotReloadConfig, CliError> {
    load_with_env(path, Environment::with_prefix(ENV_PREFIX))
}

fn load_with_env(path: Option<&Path>, env: Environment) -> Result<HotReloadConfig, CliError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            return Err(CliError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let format = detect_format(path)?;
        builder = builder.add_source(File::from(path).format(format));
    }

    let config = builder
        .add_source(
            env.prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config: HotReloadConfig = config
        .try_deserialize()
        .map_err(|e| CliError::ConfigError(format!("Failed to parse configuration: {}", e)))?;
    config.layout.plugin_folder = config.layout.root().to_string();
    Ok(config)
}
