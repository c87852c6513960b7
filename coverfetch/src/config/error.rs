//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read or parsed.
    #[error("failed to read config file {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// The config file could not be written.
    #[error("failed to write config file {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    /// A value in the config file has the wrong type.
    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// A setting is outside its allowed range.
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
