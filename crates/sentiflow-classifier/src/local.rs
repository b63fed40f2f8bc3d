//! Supervised subprocess backend.
//!
//! The fast path runs the analyzer as a long-lived child process speaking
//! line-delimited JSON: one `{"text": ...}` request line in, one JSON object
//! line back per request, paired strictly FIFO with no request identifiers.
//!
//! ## Enforced single-flight
//!
//! FIFO pairing is only sound if at most one request is in flight, so the
//! whole channel lives behind an async mutex: concurrent classification of
//! a batch serializes here. A request that times out leaves its response
//! owed on the channel; the owed count is tracked and that many lines are
//! drained before the next request's reply is read, so a late reply can
//! never be attributed to the wrong request.
//!
//! ## Supervision
//!
//! A timeout fails the request but keeps the process alive. A write/read
//! error or EOF marks the process dead; respawning is gated by a fixed
//! restart delay, and requests arriving inside that window fail straight
//! through to the next backend in the chain.

use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::Instant;

use async_trait::async_trait;

use crate::backend::{Classification, ClassifierBackend};
use crate::error::{ClassifierError, Result};
use sentiflow_core::Sentiment;

/// Configuration for the subprocess backend.
#[derive(Debug, Clone)]
pub struct LocalProcessConfig {
    /// Program to run.
    pub command: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// How long to wait for one response line.
    pub response_timeout: Duration,
    /// How long after an exit before a respawn is attempted.
    pub restart_delay: Duration,
}

#[derive(Serialize)]
struct LocalRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct LocalReply {
    #[serde(default)]
    error: Option<String>,
    sentiment: Option<SentimentPart>,
    emotion: Option<EmotionPart>,
}

#[derive(Deserialize)]
struct SentimentPart {
    sentiment_label: String,
    confidence_score: f64,
    model_name: String,
}

#[derive(Deserialize)]
struct EmotionPart {
    emotion: String,
}

/// A live child process with its channel halves.
struct Process {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    /// Responses owed by requests that timed out; drained before the next
    /// request's reply is read.
    stale_responses: usize,
    /// Whether the current request line was fully written and flushed. A
    /// timeout that fires before delivery left a partial line on the
    /// child's stdin, and the channel cannot be reused.
    request_delivered: bool,
}

/// Process slot guarded by the single-flight mutex.
struct Slot {
    process: Option<Process>,
    last_exit: Option<Instant>,
}

/// Classifier backend backed by a supervised local subprocess.
pub struct LocalProcessBackend {
    config: LocalProcessConfig,
    slot: Mutex<Slot>,
}

impl LocalProcessBackend {
    pub fn new(config: LocalProcessConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(Slot {
                process: None,
                last_exit: None,
            }),
        }
    }

    /// Make sure a live process sits in the slot, respecting the restart
    /// delay after an exit.
    fn ensure_running(&self, slot: &mut Slot) -> Result<()> {
        if let Some(proc) = slot.process.as_mut() {
            match proc.child.try_wait()? {
                None => return Ok(()),
                Some(status) => {
                    tracing::error!(%status, "classifier process exited");
                    slot.process = None;
                    slot.last_exit = Some(Instant::now());
                }
            }
        }

        if let Some(exited_at) = slot.last_exit {
            let since_exit = exited_at.elapsed();
            if since_exit < self.config.restart_delay {
                let remaining = self.config.restart_delay - since_exit;
                return Err(ClassifierError::Unavailable(format!(
                    "restarting in {:.1}s",
                    remaining.as_secs_f64()
                )));
            }
        }

        slot.process = Some(self.spawn()?);
        Ok(())
    }

    fn spawn(&self) -> Result<Process> {
        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClassifierError::Unavailable("no stdin handle".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClassifierError::Unavailable("no stdout handle".to_string()))?;

        // Forward analyzer stderr into our logs, like the rest of the worker.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(line = %line, "classifier process stderr");
                }
            });
        }

        tracing::info!(command = %self.config.command, "classifier process started");

        Ok(Process {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            stale_responses: 0,
            request_delivered: false,
        })
    }

    /// Mark the slot's process dead and schedule it for delayed respawn.
    fn mark_dead(slot: &mut Slot) {
        if let Some(mut proc) = slot.process.take() {
            let _ = proc.child.start_kill();
        }
        slot.last_exit = Some(Instant::now());
    }
}

/// One write-then-read round trip against a live process.
async fn round_trip(proc: &mut Process, text: &str) -> Result<Classification> {
    let request = serde_json::to_string(&LocalRequest { text })?;
    proc.stdin.write_all(request.as_bytes()).await?;
    proc.stdin.write_all(b"\n").await?;
    proc.stdin.flush().await?;
    proc.request_delivered = true;

    loop {
        let line = proc
            .stdout
            .next_line()
            .await?
            .ok_or(ClassifierError::ProcessExited)?;

        if proc.stale_responses > 0 {
            proc.stale_responses -= 1;
            continue;
        }

        return parse_reply(&line);
    }
}

fn parse_reply(line: &str) -> Result<Classification> {
    let reply: LocalReply = serde_json::from_str(line)?;

    if let Some(message) = reply.error {
        return Err(ClassifierError::MalformedReply(message));
    }

    let sentiment = reply
        .sentiment
        .ok_or_else(|| ClassifierError::MalformedReply("missing 'sentiment'".to_string()))?;
    let emotion = reply
        .emotion
        .ok_or_else(|| ClassifierError::MalformedReply("missing 'emotion'".to_string()))?;

    Ok(Classification {
        sentiment: Sentiment::from_label(&sentiment.sentiment_label),
        confidence: sentiment.confidence_score,
        emotion: emotion.emotion,
        model_name: sentiment.model_name,
    })
}

#[async_trait]
impl ClassifierBackend for LocalProcessBackend {
    async fn classify(&self, text: &str) -> Result<Classification> {
        let mut slot = self.slot.lock().await;
        self.ensure_running(&mut slot)?;

        // ensure_running just succeeded, so the slot holds a process.
        let proc = slot
            .process
            .as_mut()
            .ok_or(ClassifierError::ProcessExited)?;

        proc.request_delivered = false;
        match tokio::time::timeout(self.config.response_timeout, round_trip(proc, text)).await {
            Ok(Ok(classification)) => Ok(classification),
            Ok(Err(e)) => {
                // Channel is broken or the process is gone; a malformed but
                // delivered reply leaves the channel usable.
                if !matches!(e, ClassifierError::MalformedReply(_)) {
                    Self::mark_dead(&mut slot);
                }
                Err(e)
            }
            Err(_elapsed) => {
                if proc.request_delivered {
                    // The response is still owed; remember to drain it so
                    // the next request reads its own reply.
                    proc.stale_responses += 1;
                } else {
                    // The write itself stalled, leaving a partial request
                    // line on the child's stdin.
                    Self::mark_dead(&mut slot);
                }
                Err(ClassifierError::Timeout(self.config.response_timeout))
            }
        }
    }

    fn name(&self) -> &str {
        "local-process"
    }
}
