//! Error types for classifier backends and the chain.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during classification.
///
/// Every variant is a per-request failure: a failing backend escalates to
/// the next one in the chain, and only [`ClassifierError::Exhausted`] is
/// seen by the pipeline.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// No response from the backend within the bounded timeout. Fails this
    /// request only; the subprocess is not restarted for a timeout alone.
    #[error("Classifier timed out after {0:?}")]
    Timeout(Duration),

    /// The subprocess exited while a request was in flight.
    #[error("Classifier process exited")]
    ProcessExited,

    /// The subprocess is dead and inside its restart-delay window.
    #[error("Classifier process unavailable: {0}")]
    Unavailable(String),

    /// I/O failure on the subprocess channel.
    #[error("Classifier I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A reply that does not parse into the expected JSON shape, or a
    /// backend-reported analysis error.
    #[error("Malformed classifier reply: {0}")]
    MalformedReply(String),

    /// The remote provider call failed (transport, status, or empty body).
    #[error("Provider error: {0}")]
    Provider(String),

    /// Every backend in the chain failed for this request.
    #[error("All classifier backends failed")]
    Exhausted,
}

/// Result type alias for classifier operations.
pub type Result<T> = std::result::Result<T, ClassifierError>;

impl From<serde_json::Error> for ClassifierError {
    fn from(e: serde_json::Error) -> Self {
        ClassifierError::MalformedReply(e.to_string())
    }
}
