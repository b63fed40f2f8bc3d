//! Worker-level error types.

use thiserror::Error;

/// Errors raised while assembling the worker.
///
/// Per-entry processing failures never surface here; they are absorbed by
/// the pipeline (unacknowledged entries are redelivered). These errors are
/// fatal at startup.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// An environment variable held a value that does not parse.
    #[error("Invalid configuration: {var}={value}")]
    InvalidConfig { var: String, value: String },

    /// The append log could not be reached or prepared.
    #[error(transparent)]
    Log(#[from] sentiflow_log::LogError),

    /// The result store could not be reached or migrated.
    #[error(transparent)]
    Store(#[from] sentiflow_store::StoreError),

    /// A classifier backend could not be constructed.
    #[error(transparent)]
    Classifier(#[from] sentiflow_classifier::ClassifierError),
}

/// Result type alias for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;
