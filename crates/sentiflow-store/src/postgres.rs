//! Postgres-backed [`ResultStore`].

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use sentiflow_core::{AnalysisResult, ValidatedPost};

use crate::error::Result;
use crate::store::ResultStore;

/// Upsert keyed on the natural post id. A redelivered entry refreshes
/// `ingested_at` instead of duplicating the post.
const UPSERT_POST_SQL: &str = "\
    INSERT INTO social_media_posts (post_id, source, content, author, created_at) \
    VALUES ($1, $2, $3, $4, $5) \
    ON CONFLICT (post_id) DO UPDATE SET ingested_at = NOW()";

const INSERT_ANALYSIS_SQL: &str = "\
    INSERT INTO sentiment_analysis (post_id, model_name, sentiment_label, confidence_score, emotion) \
    VALUES ($1, $2, $3, $4, $5)";

/// Stores posts and analysis results in Postgres.
pub struct PostgresResultStore {
    pool: PgPool,
}

impl PostgresResultStore {
    /// Connect, then bring the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(max_connections, "connected to Postgres");
        Ok(Self { pool })
    }

    /// Wrap an existing pool. Used by tests that manage their own schema.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PostgresResultStore {
    async fn persist(&self, post: &ValidatedPost, analysis: &AnalysisResult) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(UPSERT_POST_SQL)
            .bind(&post.post_id)
            .bind(&post.source)
            .bind(&post.content)
            .bind(&post.author)
            .bind(post.created_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(INSERT_ANALYSIS_SQL)
            .bind(&analysis.post_id)
            .bind(&analysis.model_name)
            .bind(analysis.sentiment.as_str())
            .bind(analysis.confidence)
            .bind(&analysis.emotion)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            post_id = %post.post_id,
            model = %analysis.model_name,
            sentiment = %analysis.sentiment,
            "persisted analysis"
        );
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
