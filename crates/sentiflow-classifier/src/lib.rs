//! Classifier chain for SentiFlow.
//!
//! Maps post content to `{sentiment, confidence, emotion, model_name}` by
//! trying an ordered list of analysis backends and returning the first
//! successful result:
//!
//! 1. [`LocalProcessBackend`] — a supervised subprocess speaking
//!    line-delimited JSON over stdin/stdout (fast local model).
//! 2. [`RemoteLlmBackend`] — an OpenAI-compatible chat-completions endpoint
//!    constrained to a strict JSON reply shape (remote fallback).
//!
//! The chain is stateless across calls except for the supervised subprocess.
//! Total chain failure surfaces as [`ClassifierError::Exhausted`]; the
//! caller leaves the entry unacknowledged so the log redelivers it — that
//! redelivery is the retry mechanism for transient classifier outages.

pub mod backend;
pub mod chain;
pub mod error;
pub mod local;
pub mod remote;

pub use backend::{Classification, ClassifierBackend};
pub use chain::{ChainVerdict, ClassifierChain};
pub use error::{ClassifierError, Result};
pub use local::{LocalProcessBackend, LocalProcessConfig};
pub use remote::{RemoteLlmBackend, RemoteLlmConfig};
