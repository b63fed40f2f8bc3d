//! The consume → classify → persist → acknowledge loop.
//!
//! ## Delivery contract
//!
//! An entry is acknowledged in exactly two cases: it was persisted in a
//! committed transaction, or it failed validation and can never be
//! processed. Classification and persistence failures leave the entry
//! unacknowledged; redelivery by the log is the retry mechanism, and the
//! idempotent post upsert makes reprocessing safe.
//!
//! ## Concurrency
//!
//! Entries within one batch are processed concurrently and the batch is
//! fully resolved before the next poll, so the number of in-flight entries
//! is bounded by the batch size. The loop owns no shutdown state of its
//! own; it watches a channel whose sender belongs to the binary.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::Instant;

use sentiflow_classifier::ClassifierChain;
use sentiflow_core::{AnalysisResult, StreamEntry};
use sentiflow_log::AppendLog;
use sentiflow_store::ResultStore;

use crate::config::WorkerConfig;
use crate::metrics;

/// What became of one delivered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Persisted and acknowledged.
    Processed,
    /// Malformed; acknowledged without processing.
    Discarded,
    /// Classification or persistence failed; left pending for redelivery.
    Failed,
}

/// Coarse lifecycle phase, logged at transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Running => "running",
            WorkerState::Draining => "draining",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// The worker pipeline over its three collaborators.
pub struct Pipeline {
    log: Arc<dyn AppendLog>,
    store: Arc<dyn ResultStore>,
    chain: Arc<ClassifierChain>,
    config: WorkerConfig,
}

impl Pipeline {
    pub fn new(
        log: Arc<dyn AppendLog>,
        store: Arc<dyn ResultStore>,
        chain: Arc<ClassifierChain>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            log,
            store,
            chain,
            config,
        }
    }

    /// Consume until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// A shutdown request observed mid-batch lets the batch finish; entries
    /// already read but not yet resolved are never abandoned while the
    /// process is still alive.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            consumer = %self.config.consumer_name,
            group = %self.config.consumer_group,
            stream = %self.config.stream_name,
            state = %WorkerState::Running,
            "pipeline started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                read = self.log.read_group(
                    &self.config.consumer_name,
                    self.config.poll_batch_size,
                    self.config.poll_block,
                ) => {
                    match read {
                        Ok(entries) if entries.is_empty() => {}
                        Ok(entries) => {
                            tracing::debug!(count = entries.len(), "read batch");
                            join_all(entries.iter().map(|e| self.process_entry(e))).await;
                        }
                        Err(e) => {
                            metrics::POLL_ERRORS_TOTAL.inc();
                            tracing::error!(error = %e, "failed to read from the append log");
                            // Pause before retrying, but stay responsive to
                            // shutdown during the pause.
                            tokio::select! {
                                _ = shutdown.changed() => {}
                                _ = tokio::time::sleep(self.config.poll_retry) => {}
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(state = %WorkerState::Draining, "shutdown requested");
        tracing::info!(state = %WorkerState::Stopped, "pipeline stopped");
    }

    /// Process one delivered entry end to end.
    pub async fn process_entry(&self, entry: &StreamEntry) -> EntryOutcome {
        let started = Instant::now();

        let post = match entry.validate() {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!(entry_id = %entry.id, error = %e, "discarding malformed entry");
                metrics::ENTRIES_DISCARDED_TOTAL.inc();
                // Acknowledge so the group never redelivers garbage.
                if let Err(ack_err) = self.log.ack(&entry.id).await {
                    tracing::error!(entry_id = %entry.id, error = %ack_err, "failed to ack discarded entry");
                }
                return EntryOutcome::Discarded;
            }
        };

        let verdict = match self.chain.classify(&post.content).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(
                    entry_id = %entry.id,
                    post_id = %post.post_id,
                    error = %e,
                    "classification failed, leaving entry for redelivery"
                );
                metrics::ENTRIES_FAILED_TOTAL
                    .with_label_values(&["classify"])
                    .inc();
                return EntryOutcome::Failed;
            }
        };

        if verdict.used_fallback() {
            metrics::CLASSIFIER_FALLBACKS_TOTAL.inc();
        }

        let analysis = AnalysisResult::new(
            post.post_id.clone(),
            verdict.classification.model_name.clone(),
            verdict.classification.sentiment,
            verdict.classification.confidence,
            verdict.classification.emotion.clone(),
        );

        if let Err(e) = self.store.persist(&post, &analysis).await {
            tracing::warn!(
                entry_id = %entry.id,
                post_id = %post.post_id,
                error = %e,
                "persistence failed, leaving entry for redelivery"
            );
            metrics::ENTRIES_FAILED_TOTAL
                .with_label_values(&["persist"])
                .inc();
            return EntryOutcome::Failed;
        }

        // The transaction is committed; an ack failure here means the entry
        // will be redelivered and reprocessed into a harmless duplicate.
        if let Err(e) = self.log.ack(&entry.id).await {
            tracing::error!(
                entry_id = %entry.id,
                post_id = %post.post_id,
                error = %e,
                "persisted but failed to ack; expect one duplicate on redelivery"
            );
        }

        metrics::ENTRIES_PROCESSED_TOTAL.inc();
        metrics::PROCESSING_LATENCY.observe(started.elapsed().as_secs_f64());

        tracing::info!(
            entry_id = %entry.id,
            post_id = %post.post_id,
            backend = %verdict.backend,
            sentiment = %analysis.sentiment,
            "entry processed"
        );
        EntryOutcome::Processed
    }
}
