//! Configuration errors.

use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable holds a value that does not parse.
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// A configuration file could not be loaded.
    #[error("failed to load {path}: {reason}")]
    LoadFailed { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
