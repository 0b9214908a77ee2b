//! Catalog aggregation across every distinct worker
//!
//! A `tools/list` query is re-issued to each worker in its own task, reusing
//! the client's request id. Each task validates its own worker's answer; the
//! joining task merges the results once every task has finished. A failing
//! worker is logged and left out, it never fails the whole query.

use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::error::CatalogError;
use crate::domain::models::{
    is_object, methods, RequestId, RouteTable, WorkerReply, JSONRPC_VERSION,
};
use crate::domain::ports::WorkerRunner;

/// Merged result of one aggregation.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Tool descriptors from every worker that answered correctly
    pub tools: Vec<Value>,
    /// Workers that were excluded, and why
    pub failures: Vec<(PathBuf, CatalogError)>,
}

#[derive(Deserialize)]
struct ToolListing {
    tools: Vec<Value>,
}

/// Fans a catalog query out to all workers in the route table.
#[derive(Clone)]
pub struct CatalogAggregator {
    routes: Arc<RouteTable>,
    runner: Arc<dyn WorkerRunner>,
}

impl CatalogAggregator {
    /// Aggregator over the distinct workers of `routes`.
    pub fn new(routes: Arc<RouteTable>, runner: Arc<dyn WorkerRunner>) -> Self {
        Self { routes, runner }
    }

    /// Query every distinct worker in parallel and wait for all of them.
    pub async fn aggregate(&self, id: &RequestId) -> Catalog {
        let payload: Arc<str> = Arc::from(format!(
            r#"{{"jsonrpc":"{JSONRPC_VERSION}","id":{},"method":"{}"}}"#,
            id.as_json(),
            methods::TOOLS_LIST
        ) + "\n");

        let pending: Vec<_> = self
            .routes
            .workers()
            .iter()
            .map(|worker| {
                let runner = Arc::clone(&self.runner);
                let payload = Arc::clone(&payload);
                let expected = id.clone();
                let target = worker.clone();
                let handle = tokio::spawn(async move {
                    debug!(worker = %target.display(), "Querying tools/list");
                    let response = runner.run(&target, &payload).await?;
                    extract_tools(&response, &expected)
                });
                (worker.clone(), handle)
            })
            .collect();

        let mut catalog = Catalog::default();
        for (worker, handle) in pending {
            let outcome = handle
                .await
                .unwrap_or_else(|e| Err(CatalogError::TaskAborted(e.to_string())));
            match outcome {
                Ok(tools) => {
                    debug!(worker = %worker.display(), count = tools.len(), "Collected tools");
                    catalog.tools.extend(tools);
                }
                Err(e) => {
                    warn!(worker = %worker.display(), error = %e, "Excluding worker from catalog");
                    catalog.failures.push((worker, e));
                }
            }
        }

        info!(
            id = %id,
            tools = catalog.tools.len(),
            failed_workers = catalog.failures.len(),
            "Aggregated tool catalog"
        );
        catalog
    }
}

/// Validate one worker's `tools/list` answer and pull out its tools.
fn extract_tools(response: &str, expected: &RequestId) -> Result<Vec<Value>, CatalogError> {
    let reply = WorkerReply::parse(response).map_err(CatalogError::InvalidJson)?;

    if let Some(error) = reply.error {
        return Err(CatalogError::WorkerError {
            code: error.code,
            message: error.message,
        });
    }

    if reply.id != *expected {
        return Err(CatalogError::IdMismatch {
            expected: expected.to_string(),
            actual: reply.id.to_string(),
        });
    }

    let result = reply
        .result
        .ok_or_else(|| CatalogError::InvalidResult("missing result".to_string()))?;
    if !is_object(result.get()) {
        return Err(CatalogError::InvalidResult(
            "result is not an object".to_string(),
        ));
    }
    let listing: ToolListing = serde_json::from_str(result.get())
        .map_err(|e| CatalogError::InvalidResult(e.to_string()))?;

    Ok(listing.tools)
}
