//! Worker process execution
//!
//! - `WorkerSession` - the per-call subprocess protocol engine
//! - `StdioWorkerRunner` - `WorkerRunner` backed by real processes
//! - `MockWorkerRunner` - scripted runner for tests

pub mod mock_runner;
pub mod session;
pub mod stdio_runner;

pub use mock_runner::{MockReply, MockWorkerRunner};
pub use session::WorkerSession;
pub use stdio_runner::StdioWorkerRunner;
