//! Switchboard - JSON-RPC tool gateway
//!
//! Switchboard accepts line-delimited JSON-RPC over TCP and routes tool calls
//! to single-purpose worker processes that speak the same protocol over
//! stdio. Every call gets a fresh worker, driven through the handshake, one
//! payload exchange and teardown. Catalog queries are fanned out to all
//! workers and merged.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): JSON-RPC model, route table, errors and ports
//! - **Application Layer** (`application`): request dispatch and catalog aggregation
//! - **Infrastructure Layer** (`infrastructure`): config, logging, framing, worker sessions
//! - **Adapters** (`adapters`): the TCP listener and connection handling
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use switchboard::{ConfigLoader, GatewayServer, RequestDispatcher, StdioWorkerRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load(None)?;
//!     let routes = Arc::new(ConfigLoader::route_table(&config)?);
//!     let runner = Arc::new(StdioWorkerRunner::new(config.worker.clone()));
//!     let dispatcher = RequestDispatcher::new(routes, runner, "2024-11-05");
//!     GatewayServer::bind("127.0.0.1:8999", dispatcher).await?.serve().await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use adapters::tcp::{GatewayServer, ServerError};
pub use application::{CatalogAggregator, Reply, RequestDispatcher};
pub use domain::error::{CatalogError, RouteError, SessionError, SessionFailure};
pub use domain::models::{Config, LoggingConfig, RequestId, RouteTable, WorkerConfig};
pub use domain::ports::WorkerRunner;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::LoggerImpl;
pub use infrastructure::worker::{StdioWorkerRunner, WorkerSession};
