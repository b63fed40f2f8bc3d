//! Redis Streams implementation of [`AppendLog`].
//!
//! One Redis stream is the whole log (single logical stream, no
//! partitioning). Delivery tracking uses Redis consumer groups:
//!
//! - `XGROUP CREATE ... MKSTREAM` creates the group idempotently;
//! - `XREADGROUP ... >` delivers only never-before-delivered entries;
//! - `XACK` removes an entry from the group's pending set.
//!
//! The multiplexed connection is cheap to clone and safe to share across
//! the concurrently processed entries of a batch.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use sentiflow_core::StreamEntry;

use crate::error::{LogError, Result};
use crate::log::AppendLog;

/// Append log backed by a single Redis stream.
pub struct RedisStreamLog {
    conn: MultiplexedConnection,
    stream: String,
    group: String,
}

impl RedisStreamLog {
    /// Connect to Redis and bind this client to one stream and group.
    ///
    /// A connection failure here is fatal to the worker: it exits non-zero
    /// during initialization rather than entering the poll loop.
    pub async fn connect(url: &str, stream: &str, group: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| LogError::Connection(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| LogError::Connection(e.to_string()))?;

        Ok(Self {
            conn,
            stream: stream.to_string(),
            group: group.to_string(),
        })
    }

    fn is_busy_group(err: &redis::RedisError) -> bool {
        err.code() == Some("BUSYGROUP") || err.to_string().contains("BUSYGROUP")
    }
}

#[async_trait]
impl AppendLog for RedisStreamLog {
    async fn ensure_group(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let created: std::result::Result<(), redis::RedisError> = conn
            .xgroup_create_mkstream(&self.stream, &self.group, "0")
            .await;

        match created {
            Ok(()) => {
                tracing::info!(
                    stream = %self.stream,
                    group = %self.group,
                    "consumer group created"
                );
                Ok(())
            }
            Err(e) if Self::is_busy_group(&e) => {
                tracing::info!(
                    stream = %self.stream,
                    group = %self.group,
                    "consumer group already exists"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn append(&self, fields: &[(String, String)]) -> Result<String> {
        let mut conn = self.conn.clone();
        let id: String = conn.xadd(&self.stream, "*", fields).await?;
        Ok(id)
    }

    async fn read_group(
        &self,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamEntry>> {
        let mut conn = self.conn.clone();
        let options = StreamReadOptions::default()
            .group(&self.group, consumer)
            .count(count)
            .block(block.as_millis() as usize);

        let reply: StreamReadReply = conn
            .xread_options(&[self.stream.as_str()], &[">"], &options)
            .await?;

        Ok(entries_from_reply(reply))
    }

    async fn ack(&self, entry_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _acked: i64 = conn.xack(&self.stream, &self.group, &[entry_id]).await?;
        Ok(())
    }
}

/// Flatten a read reply into entries.
///
/// Field values that are not UTF-8 strings are skipped with a warning; one
/// bad field must not fail the whole batch.
fn entries_from_reply(reply: StreamReadReply) -> Vec<StreamEntry> {
    let mut entries = Vec::new();

    for key in reply.keys {
        for stream_id in key.ids {
            let mut fields = std::collections::HashMap::with_capacity(stream_id.map.len());
            for (name, value) in stream_id.map {
                match redis::from_redis_value::<String>(&value) {
                    Ok(text) => {
                        fields.insert(name, text);
                    }
                    Err(_) => {
                        tracing::warn!(
                            entry_id = %stream_id.id,
                            field = %name,
                            "skipping non-string field value"
                        );
                    }
                }
            }
            entries.push(StreamEntry::new(stream_id.id, fields));
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::streams::{StreamId, StreamKey};
    use redis::Value;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    fn reply_with(ids: Vec<StreamId>) -> StreamReadReply {
        StreamReadReply {
            keys: vec![StreamKey {
                key: "posts".to_string(),
                ids,
            }],
        }
    }

    // ---------------------------------------------------------------
    // Reply conversion
    // ---------------------------------------------------------------

    #[test]
    fn test_entries_from_reply_basic() {
        let mut map = std::collections::HashMap::new();
        map.insert("post_id".to_string(), bulk("p1"));
        map.insert("content".to_string(), bulk("I love this!"));

        let entries = entries_from_reply(reply_with(vec![StreamId {
            id: "1700000000000-0".to_string(),
            map,
        }]));

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "1700000000000-0");
        assert_eq!(entries[0].fields.get("post_id").unwrap(), "p1");
        assert_eq!(entries[0].fields.get("content").unwrap(), "I love this!");
    }

    #[test]
    fn test_entries_from_reply_empty() {
        let entries = entries_from_reply(StreamReadReply { keys: vec![] });
        assert!(entries.is_empty());
    }

    #[test]
    fn test_entries_from_reply_preserves_order() {
        let ids = (0..3)
            .map(|i| {
                let mut map = std::collections::HashMap::new();
                map.insert("post_id".to_string(), bulk(&format!("p{}", i)));
                StreamId {
                    id: format!("170000000000{}-0", i),
                    map,
                }
            })
            .collect();

        let entries = entries_from_reply(reply_with(ids));
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "1700000000000-0");
        assert_eq!(entries[2].id, "1700000000002-0");
    }

    #[test]
    fn test_entries_from_reply_skips_non_string_values() {
        let mut map = std::collections::HashMap::new();
        map.insert("post_id".to_string(), bulk("p1"));
        map.insert("weird".to_string(), Value::Array(vec![]));

        let entries = entries_from_reply(reply_with(vec![StreamId {
            id: "1-0".to_string(),
            map,
        }]));

        assert_eq!(entries.len(), 1);
        assert!(entries[0].fields.contains_key("post_id"));
        assert!(!entries[0].fields.contains_key("weird"));
    }

    // ---------------------------------------------------------------
    // BUSYGROUP detection
    // ---------------------------------------------------------------

    #[test]
    fn test_busy_group_detected_in_detail() {
        let err = redis::RedisError::from((
            redis::ErrorKind::ExtensionError,
            "An error was signalled by the server",
            "BUSYGROUP Consumer Group name already exists".to_string(),
        ));
        assert!(RedisStreamLog::is_busy_group(&err));
    }

    #[test]
    fn test_other_errors_are_not_busy_group() {
        let err = redis::RedisError::from((redis::ErrorKind::IoError, "connection reset"));
        assert!(!RedisStreamLog::is_busy_group(&err));
    }
}
