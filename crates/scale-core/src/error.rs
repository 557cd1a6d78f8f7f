//! Error types for the scale telemetry system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for scale telemetry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the scale telemetry system
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-related errors (bind, receive, accept)
    #[error("transport error: {0}")]
    Transport(String),

    /// Audit sink errors (append, read-back)
    #[error("audit error: {0}")]
    Audit(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an audit sink error
    pub fn audit(msg: impl Into<String>) -> Self {
        Self::Audit(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
