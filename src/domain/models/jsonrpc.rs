//! JSON-RPC 2.0 envelope types
//!
//! Shared by the client-facing side (TCP) and the worker-facing side (stdio).
//! Request ids are never reinterpreted: they are carried as the exact JSON text
//! the peer sent, so `1`, `1.0` and `"1"` stay distinct and are echoed verbatim.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::Value;
use std::fmt;

/// Protocol version tag carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method names understood by the gateway.
pub mod methods {
    /// Session initialization request.
    pub const INITIALIZE: &str = "initialize";
    /// Client acknowledgement that initialization finished.
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Liveness probe.
    pub const PING: &str = "ping";
    /// Invoke a single tool.
    pub const TOOLS_CALL: &str = "tools/call";
    /// Catalog query.
    pub const TOOLS_LIST: &str = "tools/list";
}

/// Identifier of a JSON-RPC request.
///
/// `Absent` means the member was missing; an explicit `null` is kept as raw
/// text like any other id. Both encode as `null` when written back out.
#[derive(Debug, Clone, Default)]
pub enum RequestId {
    /// No `id` member was present.
    #[default]
    Absent,
    /// The id exactly as it appeared on the wire.
    Raw(Box<RawValue>),
}

impl RequestId {
    /// Build an id from its JSON text, e.g. `7` or `"abc"`.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        RawValue::from_string(text.to_owned()).map(Self::Raw)
    }

    /// JSON text of this id; `null` when absent.
    pub fn as_json(&self) -> &str {
        match self {
            Self::Absent => "null",
            Self::Raw(raw) => raw.get(),
        }
    }

    /// Whether the `id` member was missing altogether.
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl PartialEq for RequestId {
    fn eq(&self, other: &Self) -> bool {
        self.as_json() == other.as_json()
    }
}

impl Eq for RequestId {}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_json())
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_unit(),
            Self::Raw(raw) => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Box::<RawValue>::deserialize(deserializer).map(Self::Raw)
    }
}

/// JSON-RPC error codes emitted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Message is not valid JSON.
    ParseError,
    /// Valid JSON that is not a usable request.
    InvalidRequest,
    /// Unknown method or unrouted tool.
    MethodNotFound,
    /// Worker failure on the single-worker path.
    InternalError,
    /// Worker did not answer within its time budget.
    ServerTimeout,
}

impl ErrorCode {
    /// Numeric code written on the wire.
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InternalError => -32603,
            Self::ServerTimeout => -32001,
        }
    }
}

/// `error` member of a failure response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Numeric error code
    #[serde(default)]
    pub code: i64,
    /// Short human-readable description
    #[serde(default)]
    pub message: String,
    /// Optional detail, e.g. the underlying worker error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    /// Error object without `data`.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Attach a `data` member.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// Whether `text` holds a JSON object rather than an array or scalar.
///
/// Derived struct deserialization also accepts arrays positionally, so every
/// envelope is checked with this before its members are trusted.
pub fn is_object(text: &str) -> bool {
    text.trim_start().starts_with('{')
}

/// A message received from a client, parsed only as far as routing needs.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    /// Protocol tag, expected to be `"2.0"`
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Request id, `Absent` for notifications
    #[serde(default)]
    pub id: RequestId,
    /// Method name
    #[serde(default)]
    pub method: Option<String>,
    /// Raw params, decoded per method
    #[serde(default)]
    pub params: Option<Box<RawValue>>,
}

/// A response received from a worker.
#[derive(Debug, Deserialize)]
pub struct WorkerReply {
    /// Id the worker answered with
    #[serde(default)]
    pub id: RequestId,
    /// Raw success result
    #[serde(default)]
    pub result: Option<Box<RawValue>>,
    /// Failure member, if the worker reported one
    #[serde(default)]
    pub error: Option<ErrorObject>,
}

impl WorkerReply {
    /// Parse one worker response line. Arrays and scalars are rejected.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        if !is_object(line) {
            return Err(serde::de::Error::custom(
                "response is not a JSON-RPC object",
            ));
        }
        serde_json::from_str(line.trim())
    }
}

/// Outgoing request, used for the gateway's own requests to workers.
#[derive(Debug, Serialize)]
pub struct OutgoingRequest<'a, I: Serialize, P: Serialize> {
    /// Always [`JSONRPC_VERSION`]
    pub jsonrpc: &'static str,
    /// Correlation id the worker must echo
    pub id: &'a I,
    /// Method name
    pub method: &'a str,
    /// Params, omitted when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a P>,
}

/// Outgoing notification (no id, no response expected).
#[derive(Debug, Serialize)]
pub struct OutgoingNotification<'a> {
    /// Always [`JSONRPC_VERSION`]
    pub jsonrpc: &'static str,
    /// Notification name
    pub method: &'a str,
}

/// Success envelope written back to a client.
#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<'a, T: Serialize> {
    /// Always [`JSONRPC_VERSION`]
    pub jsonrpc: &'static str,
    /// Id of the request being answered
    pub id: &'a RequestId,
    /// Method result
    pub result: &'a T,
}

/// Failure envelope written back to a client.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope<'a> {
    /// Always [`JSONRPC_VERSION`]
    pub jsonrpc: &'static str,
    /// Id of the request being answered, `null` when unknown
    pub id: &'a RequestId,
    /// Failure details
    pub error: &'a ErrorObject,
}
