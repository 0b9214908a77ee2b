//! Scripted worker runner for testing
//!
//! Answers from a per-worker script instead of spawning processes, and
//! records every payload it was given.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::error::{SessionError, SessionFailure};
use crate::domain::models::{RequestId, SuccessEnvelope, JSONRPC_VERSION};
use crate::domain::ports::WorkerRunner;

/// How a scripted worker answers.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond with this exact line.
    Line(String),
    /// Respond with `{"jsonrpc":"2.0","id":<payload id>,"result":<value>}`.
    EchoId(serde_json::Value),
    /// Fail as if the request budget ran out.
    Timeout,
    /// Fail as if the worker exited before answering.
    Exit,
}

/// Mock runner implementation for testing
#[derive(Debug, Default)]
pub struct MockWorkerRunner {
    replies: HashMap<PathBuf, (MockReply, Duration)>,
    calls: Mutex<Vec<(PathBuf, String)>>,
}

impl MockWorkerRunner {
    /// Runner with no scripted workers; every call fails to spawn.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script how `worker` answers.
    #[must_use]
    pub fn with_reply(mut self, worker: impl Into<PathBuf>, reply: MockReply) -> Self {
        self.replies.insert(worker.into(), (reply, Duration::ZERO));
        self
    }

    /// Same as `with_reply`, answering only after `delay`.
    #[must_use]
    pub fn with_delayed_reply(
        mut self,
        worker: impl Into<PathBuf>,
        reply: MockReply,
        delay: Duration,
    ) -> Self {
        self.replies.insert(worker.into(), (reply, delay));
        self
    }

    /// Every `(worker, payload)` pair received so far.
    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl WorkerRunner for MockWorkerRunner {
    async fn run(&self, worker: &Path, payload: &str) -> Result<String, SessionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((worker.to_path_buf(), payload.to_string()));
        }

        let Some((reply, delay)) = self.replies.get(worker) else {
            return Err(SessionError::new(
                worker,
                None,
                SessionFailure::SpawnFailure(std::io::Error::from(std::io::ErrorKind::NotFound)),
            ));
        };

        if !delay.is_zero() {
            tokio::time::sleep(*delay).await;
        }

        match reply {
            MockReply::Line(line) => Ok(format!("{}\n", line.trim())),
            MockReply::EchoId(result) => {
                let id = payload_id(payload);
                let response = serde_json::to_string(&SuccessEnvelope {
                    jsonrpc: JSONRPC_VERSION,
                    id: &id,
                    result,
                })
                .map_err(|source| {
                    SessionError::new(
                        worker,
                        None,
                        SessionFailure::Io {
                            stage: "encoding scripted reply",
                            source: source.into(),
                        },
                    )
                })?;
                Ok(format!("{response}\n"))
            }
            MockReply::Timeout => Err(SessionError::new(
                worker,
                Some(1),
                SessionFailure::RequestTimeout(Duration::from_secs(60)),
            )),
            MockReply::Exit => Err(SessionError::new(worker, Some(1), SessionFailure::PrematureExit)
                .with_diagnostics("worker crashed".to_string(), None)),
        }
    }
}

/// Id carried by a recorded payload, kept as its exact JSON text.
pub(crate) fn payload_id(payload: &str) -> RequestId {
    serde_json::from_str::<crate::domain::models::IncomingMessage>(payload)
        .map(|m| m.id)
        .unwrap_or_default()
}
