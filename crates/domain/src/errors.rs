//! Error types used throughout configuration resolution

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error for presets, strategies and overrides
///
/// Always surfaced to the caller immediately; never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConfigError {
    #[error("Unknown preset '{name}'; valid presets: {}", .valid.join(", "))]
    UnknownPreset { name: String, valid: Vec<String> },

    #[error("Unknown strategy '{name}'; valid strategies: {}", .valid.join(", "))]
    UnknownStrategy { name: String, valid: Vec<String> },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("Invalid configuration override: {}", .errors.join("; "))]
    InvalidOverride { errors: Vec<String> },

    #[error("Invalid operation name '{name}': {reason}")]
    InvalidOperationName { name: String, reason: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`]
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue { field: field.into(), message: message.into() }
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
