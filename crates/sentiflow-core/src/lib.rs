//! Core domain types for SentiFlow.
//!
//! This crate defines the records exchanged between the append log, the
//! classifier chain, the relational store, and the worker pipeline:
//!
//! - [`StreamEntry`]: a raw entry read from the append log.
//! - [`ValidatedPost`]: a stream entry that passed input validation and can
//!   be classified and persisted.
//! - [`AnalysisResult`]: the outcome of classifying one post.
//! - [`Sentiment`]: the three-valued sentiment label.
//!
//! Nothing here performs I/O; the other crates depend on this one and never
//! on each other's internals.

pub mod error;
pub mod record;

pub use error::ValidationError;
pub use record::{AnalysisResult, Sentiment, StreamEntry, ValidatedPost};
