//! Errors for loading translator options. Translation itself never fails.

use thiserror::Error;

/// Result type for option loading.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the options file.
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse TOML options.
    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is unusable.
    #[error("Config validation error: {0}")]
    Validation(String),
}
