#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Vault error: {0}")]
    VaultError(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reload error: {0}")]
    Reload(#[from] hotreload_core::ReloadError),

    #[error("{0}")]
    Other(String),
}

impl From<config::ConfigError> for CliError {
    fn from(e: config::ConfigError) -> Self {
        CliError::ConfigError(e.to_string())
    }
}

impl From<String> for CliError {
    fn from(s: String) -> Self {
        CliError::Other(s)
    }
}
