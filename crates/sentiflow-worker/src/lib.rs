//! The SentiFlow worker: a stream consumer that classifies social posts
//! and persists the results.
//!
//! The worker reads batches of entries from the append log under a
//! consumer group, validates each into a post, classifies it through the
//! backend chain, writes post and analysis to Postgres in one transaction,
//! and acknowledges the entry only after the commit. Failed entries are
//! left unacknowledged so the log redelivers them.

pub mod config;
pub mod error;
pub mod exporter;
pub mod metrics;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{Result, WorkerError};
pub use pipeline::{EntryOutcome, Pipeline};
