//! Common test utilities for integration tests
//!
//! Provides shared fixtures, helpers, and test utilities used across
//! multiple integration test files. Workers are small POSIX shell scripts
//! that speak the stdio protocol just well enough for each scenario.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use switchboard::domain::models::WorkerConfig;

/// Answer the gateway's `initialize` with its own id, then consume the
/// `notifications/initialized` line.
pub const HANDSHAKE: &str = r##"read -r init
init_id=$(printf '%s' "$init" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
printf '{"jsonrpc":"2.0","id":"%s","result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"script","version":"0"}}}\n' "$init_id"
read -r initialized
"##;

/// Read the forwarded payload and capture its id as raw JSON text.
pub const READ_REQUEST: &str = r##"read -r request
req_id=$(printf '%s' "$request" | sed -n 's/.*"id":\([^,}]*\).*/\1/p')
"##;

/// Create a temporary directory for test isolation
///
/// Returns a TempDir that will be cleaned up when dropped.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write an executable `/bin/sh` script named `name` into `dir`.
pub fn script_worker(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("Failed to write worker script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to mark worker executable");
    path
}

/// Worker that answers any payload with a text result echoing its id.
pub fn echo_worker(dir: &Path) -> PathBuf {
    let body = format!(
        "{HANDSHAKE}{READ_REQUEST}{}",
        r##"printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"ok"}]}}\n' "$req_id"
"##
    );
    script_worker(dir, "echo_server", &body)
}

/// Worker whose catalog holds one descriptor per name.
pub fn tools_worker(dir: &Path, name: &str, tools: &[&str]) -> PathBuf {
    let descriptors: Vec<String> = tools
        .iter()
        .map(|tool| format!(r#"{{"name":"{tool}","inputSchema":{{"type":"object"}}}}"#))
        .collect();
    let reply = String::from(r#"printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":["#)
        + &descriptors.join(",")
        + "]}}\\n' \"$req_id\"\n";
    script_worker(dir, name, &format!("{HANDSHAKE}{READ_REQUEST}{reply}"))
}

/// Worker that completes the handshake and then never answers.
pub fn stalled_worker(dir: &Path, name: &str) -> PathBuf {
    script_worker(dir, name, &format!("{HANDSHAKE}exec sleep 30\n"))
}

/// Worker config with short budgets so failure paths finish quickly.
pub fn fast_config() -> WorkerConfig {
    WorkerConfig {
        handshake_timeout_ms: 2_000,
        request_timeout_ms: 2_000,
        teardown_timeout_ms: 500,
        ..WorkerConfig::default()
    }
}

/// Whether a process with this pid still exists.
pub fn process_exists(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    kill(Pid::from_raw(raw), None).is_ok()
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
