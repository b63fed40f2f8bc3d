//! Error types for append-log operations.

use thiserror::Error;

/// Errors that can occur talking to the append log.
#[derive(Debug, Error)]
pub enum LogError {
    /// The underlying Redis command failed (connection loss, server error).
    #[error("Log backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// Failed to establish the initial connection.
    #[error("Log connection error: {0}")]
    Connection(String),
}

/// Result type alias for log operations.
pub type Result<T> = std::result::Result<T, LogError>;
