//! Error types for the ban pruner
//!
//! Recoverable conditions (invalid invites, refused unbans) never show up
//! here; they are reported as skip counts. Anything in [`BotError`] ends the run.

use crate::platform::PlatformError;
use thiserror::Error;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum BotError {
    /// Platform call failed in a way that cannot be skipped
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local file I/O failed (cache or summary files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for bot operations
pub type BotResult<T> = Result<T, BotError>;
