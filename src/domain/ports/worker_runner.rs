//! Worker execution port

use async_trait::async_trait;
use std::path::Path;

use crate::domain::error::SessionError;

/// Port trait for executing one payload against one worker
///
/// Implementations own the whole worker lifecycle for the call: start a
/// fresh worker, perform its handshake, forward `payload`, and return the
/// worker's single response line. Nothing is reused between calls.
#[async_trait]
pub trait WorkerRunner: Send + Sync {
    /// Run `payload` (a newline-terminated JSON-RPC message) on `worker`
    ///
    /// # Returns
    /// * `Ok(String)` - The worker's response, trimmed and newline-terminated
    /// * `Err(SessionError)` - Spawn, handshake, timeout or exit failure
    async fn run(&self, worker: &Path, payload: &str) -> Result<String, SessionError>;
}
