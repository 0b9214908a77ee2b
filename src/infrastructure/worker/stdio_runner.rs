//! Process-backed `WorkerRunner`

use async_trait::async_trait;
use std::path::Path;

use crate::domain::error::SessionError;
use crate::domain::models::WorkerConfig;
use crate::domain::ports::WorkerRunner;
use crate::infrastructure::worker::session::WorkerSession;

/// Runs every call in a fresh worker process over stdio.
#[derive(Debug, Clone, Default)]
pub struct StdioWorkerRunner {
    config: WorkerConfig,
}

impl StdioWorkerRunner {
    /// Runner applying `config`'s budgets to every session.
    pub const fn new(config: WorkerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl WorkerRunner for StdioWorkerRunner {
    async fn run(&self, worker: &Path, payload: &str) -> Result<String, SessionError> {
        WorkerSession::execute(worker, &self.config, payload).await
    }
}
