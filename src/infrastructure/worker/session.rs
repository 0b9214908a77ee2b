//! Worker session engine
//!
//! Drives one worker process through its whole protocol lifecycle for exactly
//! one payload:
//!
//! 1. Spawn the executable with piped stdin/stdout/stderr (environment inherited)
//! 2. Handshake: synthetic `initialize`, answered within the handshake budget
//! 3. Send `notifications/initialized`
//! 4. Forward the payload and read one response within the request budget
//! 5. Close stdin and reap the process while its stderr is drained and logged
//!
//! Steps 2-4 race against process exit. Any failure kills the process before
//! the error is returned, and the error carries the worker path, pid, captured
//! stderr and exit status.

use serde_json::json;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::{SessionError, SessionFailure};
use crate::domain::models::{
    methods, OutgoingNotification, OutgoingRequest, WorkerConfig, WorkerReply, JSONRPC_VERSION,
};
use crate::infrastructure::framing::MessageFramer;

/// Name the gateway reports in its handshake `clientInfo`
pub const CLIENT_NAME: &str = "switchboard";

/// How long to keep collecting stderr once the process is gone
const STDERR_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Time between SIGTERM and SIGKILL during teardown
const SIGTERM_GRACE: Duration = Duration::from_secs(1);

/// One worker process, exclusively owned for the duration of one call.
pub struct WorkerSession<'a> {
    worker: &'a Path,
    config: &'a WorkerConfig,
    child: Child,
    pid: Option<u32>,
    stdin: ChildStdin,
    stdout: MessageFramer<ChildStdout>,
    stderr: JoinHandle<String>,
}

impl<'a> WorkerSession<'a> {
    /// Run `payload` on a fresh instance of `worker` and return its response.
    ///
    /// The response is trimmed and re-terminated with a single newline.
    #[instrument(skip_all, fields(worker = %worker.display()))]
    pub async fn execute(
        worker: &'a Path,
        config: &'a WorkerConfig,
        payload: &str,
    ) -> Result<String, SessionError> {
        Self::spawn(worker, config)?.drive(payload).await
    }

    fn spawn(worker: &'a Path, config: &'a WorkerConfig) -> Result<Self, SessionError> {
        let mut child = Command::new(worker)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SessionError::new(worker, None, SessionFailure::SpawnFailure(e)))?;

        let pid = child.id();
        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.start_kill();
            return Err(SessionError::new(
                worker,
                pid,
                SessionFailure::SpawnFailure(std::io::Error::other(
                    "worker pipes were not captured",
                )),
            ));
        };

        info!(pid, "Started worker");

        Ok(Self {
            worker,
            config,
            child,
            pid,
            stdin,
            stdout: MessageFramer::new(stdout),
            stderr: tokio::spawn(drain_stderr(stderr, pid)),
        })
    }

    async fn drive(self, payload: &str) -> Result<String, SessionError> {
        let Self {
            worker,
            config,
            mut child,
            pid,
            mut stdin,
            mut stdout,
            stderr,
        } = self;

        // Reading the response wins over an exit notification that arrives in
        // the same poll, so a worker that answers and exits is not reported
        // as having exited prematurely.
        let outcome = tokio::select! {
            biased;
            outcome = exchange(config, &mut stdin, &mut stdout, payload, pid) => {
                outcome.map_err(|kind| (kind, None))
            }
            status = child.wait() => Err((SessionFailure::PrematureExit, status.ok())),
        };

        // Closing stdin signals end of input to the worker.
        drop(stdin);

        match outcome {
            Ok(response) => {
                teardown(config, &mut child, pid, stderr).await;
                Ok(response)
            }
            Err((kind, status)) => {
                warn!(pid, error = %kind, "Worker session failed, killing worker");
                let reaped = kill_and_reap(&mut child, pid).await;
                let stderr_text = collect_stderr(stderr, pid).await;
                Err(SessionError::new(worker, pid, kind)
                    .with_diagnostics(stderr_text, status.or(reaped)))
            }
        }
    }
}

/// Handshake, notification and payload round trip.
async fn exchange(
    config: &WorkerConfig,
    stdin: &mut ChildStdin,
    stdout: &mut MessageFramer<ChildStdout>,
    payload: &str,
    pid: Option<u32>,
) -> Result<String, SessionFailure> {
    let init_id = format!("{CLIENT_NAME}-init-{}", Uuid::new_v4());
    let params = json!({
        "protocolVersion": config.protocol_version,
        "capabilities": {},
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    });
    let initialize = encode(
        &OutgoingRequest {
            jsonrpc: JSONRPC_VERSION,
            id: &init_id,
            method: methods::INITIALIZE,
            params: Some(&params),
        },
        "encoding initialize",
    )?;

    let budget = config.handshake_timeout();
    let reply = timeout(budget, round_trip(stdin, stdout, &initialize, "handshaking"))
        .await
        .map_err(|_| SessionFailure::HandshakeTimeout(budget))??;
    verify_handshake(&reply, &init_id)?;
    debug!(pid, "Handshake completed");

    let initialized = encode(
        &OutgoingNotification {
            jsonrpc: JSONRPC_VERSION,
            method: methods::INITIALIZED,
        },
        "encoding initialized notification",
    )?;

    let budget = config.request_timeout();
    let mut response = timeout(budget, async {
        write_line(stdin, &initialized, "sending initialized notification").await?;
        round_trip(stdin, stdout, payload, "exchanging payload").await
    })
    .await
    .map_err(|_| SessionFailure::RequestTimeout(budget))??;

    debug!(pid, bytes = response.len(), "Received worker response");
    response.push('\n');
    Ok(response)
}

fn encode<T: serde::Serialize>(message: &T, stage: &'static str) -> Result<String, SessionFailure> {
    serde_json::to_string(message).map_err(|e| SessionFailure::Io {
        stage,
        source: e.into(),
    })
}

async fn round_trip(
    stdin: &mut ChildStdin,
    stdout: &mut MessageFramer<ChildStdout>,
    message: &str,
    stage: &'static str,
) -> Result<String, SessionFailure> {
    write_line(stdin, message, stage).await?;
    stdout
        .next_message()
        .await
        .map_err(|source| SessionFailure::Io { stage, source })?
        .ok_or(SessionFailure::PrematureExit)
}

async fn write_line(
    stdin: &mut ChildStdin,
    message: &str,
    stage: &'static str,
) -> Result<(), SessionFailure> {
    let mut bytes = Vec::with_capacity(message.len() + 1);
    bytes.extend_from_slice(message.as_bytes());
    if !message.ends_with('\n') {
        bytes.push(b'\n');
    }

    stdin
        .write_all(&bytes)
        .await
        .map_err(|source| write_failure(stage, source))?;
    stdin
        .flush()
        .await
        .map_err(|source| write_failure(stage, source))
}

/// A closed pipe means the worker is gone.
fn write_failure(stage: &'static str, source: std::io::Error) -> SessionFailure {
    if source.kind() == std::io::ErrorKind::BrokenPipe {
        SessionFailure::PrematureExit
    } else {
        SessionFailure::Io { stage, source }
    }
}

fn verify_handshake(reply: &str, expected_id: &str) -> Result<(), SessionFailure> {
    let reply = WorkerReply::parse(reply).map_err(|e| {
        SessionFailure::HandshakeFailed(format!("unparseable initialize response: {e}"))
    })?;

    let id = serde_json::from_str::<String>(reply.id.as_json()).ok();
    if id.as_deref() != Some(expected_id) {
        return Err(SessionFailure::HandshakeFailed(format!(
            "mismatched initialize response id: expected \"{expected_id}\", got {}",
            reply.id
        )));
    }

    if let Some(error) = reply.error {
        return Err(SessionFailure::HandshakeFailed(format!(
            "worker rejected initialize ({}): {}",
            error.code, error.message
        )));
    }

    Ok(())
}

/// Wait for a worker that has already answered to exit on its own.
async fn teardown(
    config: &WorkerConfig,
    child: &mut Child,
    pid: Option<u32>,
    stderr: JoinHandle<String>,
) {
    let status = match timeout(config.teardown_timeout(), child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            warn!(pid, error = %e, "Failed to wait for worker exit");
            None
        }
        Err(_) => {
            warn!(pid, "Worker still running after input closed, terminating");
            terminate(child, pid).await
        }
    };

    let stderr_text = collect_stderr(stderr, pid).await;
    match status {
        Some(status) if status.success() => debug!(pid, "Worker exited cleanly"),
        Some(status) => warn!(
            pid,
            %status,
            stderr = %stderr_text.trim(),
            "Worker exited with failure after sending its response"
        ),
        None => {}
    }
}

/// SIGTERM first, then SIGKILL if the worker ignores it.
async fn terminate(child: &mut Child, pid: Option<u32>) -> Option<ExitStatus> {
    #[cfg(unix)]
    if let Some(raw) = pid.and_then(|p| i32::try_from(p).ok()) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if kill(Pid::from_raw(raw), Signal::SIGTERM).is_ok() {
            if let Ok(Ok(status)) = timeout(SIGTERM_GRACE, child.wait()).await {
                return Some(status);
            }
        }
    }

    kill_and_reap(child, pid).await
}

async fn kill_and_reap(child: &mut Child, pid: Option<u32>) -> Option<ExitStatus> {
    if let Err(e) = child.start_kill() {
        debug!(pid, error = %e, "Kill not delivered, worker already exited");
    }

    match child.wait().await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(pid, error = %e, "Failed to reap worker");
            None
        }
    }
}

async fn drain_stderr(stderr: ChildStderr, pid: Option<u32>) -> String {
    let mut lines = MessageFramer::new(stderr);
    let mut captured = String::new();
    loop {
        match lines.next_message().await {
            Ok(Some(line)) => {
                info!(target: "switchboard::worker::stderr", pid, "{line}");
                captured.push_str(&line);
                captured.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                warn!(pid, error = %e, "Failed reading worker stderr");
                break;
            }
        }
    }
    debug!(pid, "Worker stderr closed");
    captured
}

async fn collect_stderr(handle: JoinHandle<String>, pid: Option<u32>) -> String {
    match timeout(STDERR_DRAIN_GRACE, handle).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!(pid, error = %e, "Stderr drain task failed");
            String::new()
        }
        Err(_) => {
            debug!(pid, "Worker stderr still open, not waiting for it");
            String::new()
        }
    }
}
