//! Domain models: configuration, JSON-RPC envelopes and the route table

pub mod config;
pub mod jsonrpc;
pub mod route_table;

pub use config::{Config, LogFormat, LoggingConfig, RotationPolicy, ServerConfig, WorkerConfig};
pub use jsonrpc::{
    is_object, methods, ErrorCode, ErrorEnvelope, ErrorObject, IncomingMessage, OutgoingNotification,
    OutgoingRequest, RequestId, SuccessEnvelope, WorkerReply, JSONRPC_VERSION,
};
pub use route_table::RouteTable;
