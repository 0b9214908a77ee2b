//! Port trait definitions (Hexagonal Architecture)
//!
//! - WorkerRunner: one-shot execution of a payload on a worker process
//!
//! The dispatcher and catalog aggregator depend only on these traits, which
//! keeps routing logic testable without spawning processes.

pub mod worker_runner;

pub use worker_runner::WorkerRunner;
