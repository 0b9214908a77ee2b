//! Error taxonomy for routing, worker sessions and catalog aggregation

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building the route table
#[derive(Error, Debug)]
pub enum RouteError {
    /// A route key is blank.
    #[error("Route has an empty tool name")]
    EmptyToolName,

    /// A tool maps to an empty executable path.
    #[error("Tool '{0}' is routed to an empty worker path")]
    EmptyWorkerPath(String),
}

/// Condition that terminated a worker session
#[derive(Error, Debug)]
pub enum SessionFailure {
    /// The process or its pipes could not be created.
    #[error("failed to spawn worker: {0}")]
    SpawnFailure(#[source] std::io::Error),

    /// No `initialize` answer within the handshake budget.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// The `initialize` answer was unparseable, mismatched or an error.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// No payload answer within the request budget.
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// The worker went away before answering.
    #[error("worker exited before completing the exchange")]
    PrematureExit,

    /// Reading or writing a pipe failed.
    #[error("pipe I/O failed while {stage}: {source}")]
    Io {
        /// Step that was in progress
        stage: &'static str,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// A failed worker session.
///
/// Always names the worker and, once it was started, its pid. Error-stream
/// output and the exit status are attached when they could be collected.
#[derive(Debug)]
pub struct SessionError {
    /// Executable that was run
    pub worker: PathBuf,
    /// Process id, `None` if spawning failed
    pub pid: Option<u32>,
    /// What went wrong
    pub kind: SessionFailure,
    /// Error-stream output captured before the failure
    pub stderr: String,
    /// Exit status, when the process was reaped
    pub exit_status: Option<ExitStatus>,
}

impl SessionError {
    /// Error without diagnostics attached.
    pub fn new(worker: impl Into<PathBuf>, pid: Option<u32>, kind: SessionFailure) -> Self {
        Self {
            worker: worker.into(),
            pid,
            kind,
            stderr: String::new(),
            exit_status: None,
        }
    }

    /// Attach captured stderr and the exit status.
    #[must_use]
    pub fn with_diagnostics(mut self, stderr: String, exit_status: Option<ExitStatus>) -> Self {
        self.stderr = stderr;
        self.exit_status = exit_status;
        self
    }

    /// Whether the session ran out of its handshake or request budget.
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self.kind,
            SessionFailure::HandshakeTimeout(_) | SessionFailure::RequestTimeout(_)
        )
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {} ", self.worker.display())?;
        match self.pid {
            Some(pid) => write!(f, "(pid {pid})")?,
            None => f.write_str("(not started)")?,
        }
        write!(f, ": {}", self.kind)?;
        if let Some(status) = self.exit_status {
            write!(f, "; exit status: {status}")?;
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, "; stderr: {stderr}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Reason one worker was excluded from a merged catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The worker session itself failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The answer is not a JSON-RPC object.
    #[error("invalid JSON response: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The answer carries an error object.
    #[error("worker returned error {code}: {message}")]
    WorkerError {
        /// Code reported by the worker
        code: i64,
        /// Message reported by the worker
        message: String,
    },

    /// The answer is for another request.
    #[error("mismatched response id: expected {expected}, got {actual}")]
    IdMismatch {
        /// Id sent to the worker
        expected: String,
        /// Id the worker answered with
        actual: String,
    },

    /// `result.tools` is missing or not a list.
    #[error("result has no tools collection: {0}")]
    InvalidResult(String),

    /// The per-worker task panicked or was cancelled.
    #[error("catalog task aborted: {0}")]
    TaskAborted(String),
}
