//! Error types shared by certgate crates
//!
//! Errors carry the path of the offending field or variable so that log lines
//! and status messages can point at the exact piece of configuration that
//! was rejected.

use thiserror::Error;

/// Main error type for certgate configuration
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid issuer configuration
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.venafi.zone")
        field: Option<String>,
    },

    /// Malformed controller setting
    #[error("invalid value for {key}: {message}")]
    Config {
        /// Environment variable or setting name
        key: String,
        /// Description of what's invalid
        message: String,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error pointing at a field path
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a configuration error for the named setting
    pub fn config(key: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: msg.into(),
        }
    }

    /// Field path or setting name the error points at
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Validation { field, .. } => field.as_deref(),
            Error::Config { key, .. } => Some(key),
        }
    }
}
