//! The [`AppendLog`] trait.

use std::time::Duration;

use async_trait::async_trait;
use sentiflow_core::StreamEntry;

use crate::error::Result;

/// An ordered, durable, replayable sequence of immutable entries with
/// consumer-group delivery tracking.
///
/// Implementations are shared across concurrently processed entries, so all
/// methods take `&self`.
///
/// ## At-least-once semantics
///
/// [`read_group`](AppendLog::read_group) only returns entries never before
/// delivered to the group; an entry delivered to a consumer that crashes
/// before acknowledging stays in the group's pending set and is reclaimed
/// operationally (e.g. `XAUTOCLAIM`), not by this client. A crash between
/// the store commit and [`ack`](AppendLog::ack) therefore causes one benign
/// duplicate analysis on redelivery, never a lost entry.
#[async_trait]
pub trait AppendLog: Send + Sync {
    /// Create the consumer group, creating the stream too if absent.
    ///
    /// Idempotent: a group that already exists is success, not an error.
    async fn ensure_group(&self) -> Result<()>;

    /// Append an entry, returning the identifier the log assigned.
    ///
    /// This is the producer side of the contract; the worker itself never
    /// appends, but the log client is complete without a second crate.
    async fn append(&self, fields: &[(String, String)]) -> Result<String>;

    /// Read up to `count` unacknowledged entries for this consumer,
    /// blocking up to `block` when none are available.
    ///
    /// Returns an empty vec on timeout. The bounded block keeps the caller's
    /// loop responsive to shutdown between polls.
    async fn read_group(
        &self,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamEntry>>;

    /// Acknowledge one entry, removing it from the group's pending set.
    async fn ack(&self, entry_id: &str) -> Result<()>;
}
