//! Validation errors for incoming stream entries.

use thiserror::Error;

/// Why a stream entry could not be turned into a [`crate::ValidatedPost`].
///
/// A validation error means the entry is malformed input: the pipeline
/// acknowledges and discards it instead of retrying, since redelivery would
/// fail the same way forever.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is absent or empty.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
}
