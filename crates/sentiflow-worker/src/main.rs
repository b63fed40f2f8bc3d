//! SentiFlow worker binary.
//!
//! Consumes social posts from a Redis Stream under a consumer group,
//! classifies each through a local-then-remote backend chain, persists the
//! results to Postgres, and acknowledges entries after commit.
//!
//! ## Configuration
//! All configuration is done via environment variables:
//!
//! ### Connections
//! - `DATABASE_URL`: Postgres connection string
//! - `DB_MAX_CONNECTIONS`: connection pool size (default: 5)
//! - `REDIS_URL`: Redis connection string (default: redis://127.0.0.1:6379)
//!
//! ### Consumption
//! - `STREAM_NAME`: stream key to consume (default: social_posts)
//! - `CONSUMER_GROUP`: consumer group name (default: sentiment_workers)
//! - `CONSUMER_NAME`: consumer identity (default: worker_<pid>)
//! - `POLL_BATCH_SIZE`: max entries per read (default: 10)
//! - `POLL_BLOCK_MS`: blocking read timeout (default: 5000)
//! - `POLL_RETRY_SECS`: pause after a failed poll (default: 5)
//!
//! ### Observability
//! - `METRICS_ADDR`: bind address for `GET /metrics` (default: 0.0.0.0:9464)
//!
//! ### Classification
//! - `LOCAL_ANALYZER_CMD`: analyzer command line (default: python3 sentiment_analyzer.py)
//! - `CLASSIFY_TIMEOUT_SECS`: per-request timeout (default: 30)
//! - `ANALYZER_RESTART_SECS`: respawn delay after analyzer exit (default: 5)
//! - `LLM_ENDPOINT`: OpenAI-compatible chat-completions URL
//! - `LLM_MODEL`: fallback model identifier (default: llama-3.1-8b-instant)
//! - `LLM_API_KEY`: provider token; unset disables the fallback backend
//!
//! ## Logging
//! Controlled via `RUST_LOG` (default: info).

use std::sync::Arc;

use tokio::sync::watch;

use sentiflow_classifier::{
    ClassifierBackend, ClassifierChain, LocalProcessBackend, LocalProcessConfig, RemoteLlmBackend,
    RemoteLlmConfig,
};
use sentiflow_log::{AppendLog, RedisStreamLog};
use sentiflow_store::{PostgresResultStore, ResultStore};
use sentiflow_worker::pipeline::Pipeline;
use sentiflow_worker::{exporter, metrics, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    metrics::init();

    let config = WorkerConfig::from_env()?;

    // Any failure up to the end of ensure_group is fatal: the worker
    // cannot run without its store and its log.
    tracing::info!("Connecting to Postgres");
    let store: Arc<dyn ResultStore> = Arc::new(
        PostgresResultStore::connect(&config.database_url, config.db_max_connections).await?,
    );

    tracing::info!(stream = %config.stream_name, group = %config.consumer_group, "Connecting to Redis");
    let log: Arc<dyn AppendLog> = Arc::new(
        RedisStreamLog::connect(&config.redis_url, &config.stream_name, &config.consumer_group)
            .await?,
    );
    log.ensure_group().await?;

    let metrics_listener = tokio::net::TcpListener::bind(&config.metrics_addr).await?;
    tracing::info!(addr = %config.metrics_addr, "serving metrics");
    tokio::spawn(exporter::serve(metrics_listener));

    let mut backends: Vec<Arc<dyn ClassifierBackend>> =
        vec![Arc::new(LocalProcessBackend::new(LocalProcessConfig {
            command: config.local_analyzer_cmd.clone(),
            args: config.local_analyzer_args.clone(),
            response_timeout: config.classify_timeout,
            restart_delay: config.analyzer_restart_delay,
        }))];

    match &config.llm_api_key {
        Some(api_key) => {
            backends.push(Arc::new(RemoteLlmBackend::new(RemoteLlmConfig {
                endpoint: config.llm_endpoint.clone(),
                api_key: api_key.clone(),
                model: config.llm_model.clone(),
                request_timeout: config.classify_timeout,
            })?));
        }
        None => {
            tracing::warn!("LLM_API_KEY not set; running without the remote fallback backend");
        }
    }
    let chain = Arc::new(ClassifierChain::new(backends));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("termination signal received");
        let _ = shutdown_tx.send(true);
    });

    let pipeline = Pipeline::new(log, store.clone(), chain, config);
    pipeline.run(shutdown_rx).await;

    store.close().await;
    tracing::info!("worker exited cleanly");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
