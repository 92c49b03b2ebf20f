// src/error.rs

//! Unified error handling for the fanout application.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for fanout operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A change event could not be decoded
    #[error("Decode error for {context}: {message}")]
    Decode { context: String, message: String },

    /// The change feed transport failed
    #[error("Change feed error: {0}")]
    Feed(String),

    /// The push gateway could not be reached or answered garbage
    #[error("Transport error: {0}")]
    Transport(String),

    /// An audit entry could not be recorded
    #[error("Audit error: {0}")]
    Audit(String),

    /// No delivery slot became free within the grace deadline
    #[error("Admission timeout: no delivery slot freed within {waited:?} ({capacity} slots busy)")]
    AdmissionTimeout { waited: Duration, capacity: usize },

    /// The coordinator already failed fatally
    #[error("Coordinator halted after a fatal error")]
    Halted,
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a decode error with context.
    pub fn decode(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a change feed error.
    pub fn feed(message: impl fmt::Display) -> Self {
        Self::Feed(message.to_string())
    }

    /// Create a gateway transport error.
    pub fn transport(message: impl fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// Create an audit error.
    pub fn audit(message: impl fmt::Display) -> Self {
        Self::Audit(message.to_string())
    }

    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AdmissionTimeout { .. } | Self::Halted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admission_errors_are_fatal() {
        let timeout = AppError::AdmissionTimeout {
            waited: Duration::from_secs(300),
            capacity: 100,
        };
        assert!(timeout.is_fatal());
        assert!(AppError::Halted.is_fatal());
        assert!(!AppError::transport("connection reset").is_fatal());
        assert!(!AppError::decode("event", "eof").is_fatal());
    }

    #[test]
    fn test_admission_timeout_message() {
        let err = AppError::AdmissionTimeout {
            waited: Duration::from_secs(300),
            capacity: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("300s"));
        assert!(msg.contains("100 slots"));
    }
}
