//! Error types for the persistence layer.

use thiserror::Error;

/// Errors that can occur while persisting results.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure (connection, query, or transaction).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed at startup.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
