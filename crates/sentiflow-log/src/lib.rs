//! Append-log client for SentiFlow.
//!
//! The pipeline reads posts from a durable, ordered, partition-free append
//! log under an at-least-once consumer-group protocol. This crate defines
//! the [`AppendLog`] trait the pipeline programs against and a Redis Streams
//! implementation, [`RedisStreamLog`].
//!
//! ## Delivery model
//!
//! The log tracks, per consumer group, which entries have been delivered but
//! not yet acknowledged. An entry stays in that pending set until some group
//! member acknowledges it; acknowledgment is the pipeline's commit signal
//! and happens strictly after the durable store transaction commits.

pub mod error;
pub mod log;
pub mod redis_log;

pub use error::{LogError, Result};
pub use log::AppendLog;
pub use redis_log::RedisStreamLog;
