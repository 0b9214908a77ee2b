//! Request routing
//!
//! Turns one raw client message into at most one reply. Protocol-level
//! methods are answered locally, `tools/call` goes to the single worker
//! that owns the tool, and `tools/list` is fanned out by the catalog
//! aggregator.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::catalog::CatalogAggregator;
use crate::domain::models::{
    is_object, methods, ErrorCode, ErrorObject, IncomingMessage, RequestId, RouteTable,
    WorkerReply, JSONRPC_VERSION,
};
use crate::domain::ports::WorkerRunner;

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "switchboard";

/// Version reported in `serverInfo`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outcome of dispatching one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Success envelope built by the gateway.
    Success {
        /// Id of the request being answered
        id: RequestId,
        /// Method result
        result: Value,
    },
    /// Error envelope built by the gateway.
    Error {
        /// Id of the request being answered, `null` when unknown
        id: RequestId,
        /// Failure details
        error: ErrorObject,
    },
    /// A worker's response line, already checked against the request id.
    Forward(String),
}

impl Reply {
    /// Success reply carrying `result`.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Success { id, result }
    }

    /// Error reply without `data`.
    pub fn error(id: RequestId, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            id,
            error: ErrorObject::new(code, message),
        }
    }

    #[must_use]
    fn with_data(self, data: impl Into<Value>) -> Self {
        match self {
            Self::Error { id, error } => Self::Error {
                id,
                error: error.with_data(data),
            },
            other => other,
        }
    }
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
}

/// Routes client messages to local responders, workers or the aggregator.
#[derive(Clone)]
pub struct RequestDispatcher {
    routes: Arc<RouteTable>,
    runner: Arc<dyn WorkerRunner>,
    catalog: CatalogAggregator,
    protocol_version: String,
}

impl RequestDispatcher {
    /// Build a dispatcher; the catalog aggregator shares `routes` and `runner`.
    pub fn new(
        routes: Arc<RouteTable>,
        runner: Arc<dyn WorkerRunner>,
        protocol_version: impl Into<String>,
    ) -> Self {
        let catalog = CatalogAggregator::new(Arc::clone(&routes), Arc::clone(&runner));
        Self {
            routes,
            runner,
            catalog,
            protocol_version: protocol_version.into(),
        }
    }

    /// Handle one framed message. `None` means nothing is sent back.
    pub async fn dispatch(&self, raw: &str) -> Option<Reply> {
        let message: IncomingMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            // A type mismatch can surface before trailing garbage is seen
            Err(e) if e.is_data() && is_well_formed(raw) => {
                warn!(error = %e, "Rejecting message that is not a JSON-RPC object");
                return Some(
                    Reply::error(RequestId::Absent, ErrorCode::InvalidRequest, "Invalid Request")
                        .with_data(e.to_string()),
                );
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse message");
                return Some(Reply::error(
                    RequestId::Absent,
                    ErrorCode::ParseError,
                    "Parse error",
                ));
            }
        };

        if !is_object(raw) {
            warn!("Rejecting message that is not a JSON-RPC object");
            return Some(Reply::error(
                RequestId::Absent,
                ErrorCode::InvalidRequest,
                "Invalid Request",
            ));
        }

        if message.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            debug!(jsonrpc = ?message.jsonrpc, "Message carries an unexpected jsonrpc tag");
        }

        let id = message.id.clone();
        let Some(method) = message.method.clone() else {
            warn!(id = %id, "Message has no method");
            return Some(Reply::error(id, ErrorCode::MethodNotFound, "Method not found"));
        };

        match method.as_str() {
            methods::INITIALIZE => Some(Reply::success(
                id,
                json!({
                    "protocolVersion": self.protocol_version,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
                }),
            )),
            methods::PING => Some(Reply::success(id, json!({}))),
            methods::INITIALIZED => {
                debug!("Client finished initialization");
                None
            }
            methods::TOOLS_CALL => Some(self.call_tool(raw, message).await),
            methods::TOOLS_LIST => Some(self.list_tools(id).await),
            other => {
                warn!(id = %id, method = other, "Unknown method");
                Some(Reply::error(
                    id,
                    ErrorCode::MethodNotFound,
                    format!("Method not found: {other}"),
                ))
            }
        }
    }

    #[instrument(skip_all, fields(id = %message.id))]
    async fn call_tool(&self, raw: &str, message: IncomingMessage) -> Reply {
        let id = message.id;

        let params = message
            .params
            .as_deref()
            .filter(|params| is_object(params.get()))
            .and_then(|params| serde_json::from_str::<ToolCallParams>(params.get()).ok());
        let Some(ToolCallParams { name: tool }) = params else {
            warn!("tools/call without a tool name");
            return Reply::error(
                id,
                ErrorCode::InvalidRequest,
                "Invalid parameters for tools/call",
            );
        };

        let Some(worker) = self.routes.resolve(&tool) else {
            warn!(tool = %tool, "No route for tool");
            return Reply::error(
                id,
                ErrorCode::MethodNotFound,
                format!("Tool '{tool}' not found"),
            );
        };

        info!(tool = %tool, worker = %worker.display(), "Routing tool call");

        let mut payload = raw.trim().to_owned();
        payload.push('\n');

        let response = match self.runner.run(worker, &payload).await {
            Ok(response) => response,
            Err(e) => {
                warn!(tool = %tool, error = %e, "Tool execution failed");
                let code = if e.is_timeout() {
                    ErrorCode::ServerTimeout
                } else {
                    ErrorCode::InternalError
                };
                return Reply::error(id, code, format!("Error executing tool '{tool}'"))
                    .with_data(e.to_string());
            }
        };

        let reply = match WorkerReply::parse(&response) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(tool = %tool, error = %e, "Worker response is not valid JSON");
                return Reply::error(
                    id,
                    ErrorCode::InternalError,
                    format!("Invalid response from tool '{tool}'"),
                )
                .with_data(e.to_string());
            }
        };

        if reply.id != id {
            warn!(tool = %tool, expected = %id, actual = %reply.id, "Worker answered with another id");
            return Reply::error(
                id,
                ErrorCode::InternalError,
                format!("Mismatched response ID from tool '{tool}'"),
            );
        }

        debug!(tool = %tool, "Forwarding worker response");
        Reply::Forward(response)
    }

    async fn list_tools(&self, id: RequestId) -> Reply {
        let catalog = self.catalog.aggregate(&id).await;
        Reply::success(id, json!({ "tools": catalog.tools }))
    }
}

fn is_well_formed(raw: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(raw).is_ok()
}
