//! The [`ResultStore`] trait.

use async_trait::async_trait;

use sentiflow_core::{AnalysisResult, ValidatedPost};

use crate::error::Result;

/// Durable storage for posts and their analysis results.
///
/// `persist` must be atomic: either both the post row and the analysis row
/// are visible, or neither is. It must also be idempotent per post so the
/// at-least-once log can redeliver entries safely.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Write `post` and `analysis` in one transaction.
    async fn persist(&self, post: &ValidatedPost, analysis: &AnalysisResult) -> Result<()>;

    /// Release connections. Called once during shutdown.
    async fn close(&self);
}
