//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while reading or writing CLI configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a config file.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse or serialize JSON.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Named profile does not exist.
    #[error("Profile '{0}' does not exist")]
    ProfileNotFound(String),

    /// Profile name that is not a plain directory name inside the config root.
    #[error("Invalid profile name '{0}'")]
    InvalidProfileName(String),

    /// Named profile already exists.
    #[error("Profile '{0}' already exists")]
    ProfileExists(String),

    /// No home directory to place the config root in.
    #[error("could not determine config directory")]
    NoConfigDir,
}
