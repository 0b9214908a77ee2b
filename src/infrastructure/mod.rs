//! Infrastructure layer module
//!
//! Adapters to the outside world that satisfy the domain ports:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Newline message framing for sockets and pipes
//! - Worker process sessions over stdio

pub mod config;
pub mod framing;
pub mod logging;
pub mod worker;
