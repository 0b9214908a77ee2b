//! Reply serialization
//!
//! Every reply becomes exactly one newline-terminated line. Ids are written
//! from their original JSON text. If an envelope cannot be serialized the
//! client still gets a minimal, hand-built error line.

use tracing::error;

use crate::application::Reply;
use crate::domain::models::{
    ErrorCode, ErrorEnvelope, ErrorObject, RequestId, SuccessEnvelope, JSONRPC_VERSION,
};

/// Encode a reply as one line, including the trailing `\n`.
pub fn encode_reply(reply: &Reply) -> String {
    let mut line = match reply {
        Reply::Success { id, result } => serde_json::to_string(&SuccessEnvelope {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        })
        .unwrap_or_else(|e| {
            error!(id = %id, error = %e, "Failed to encode success response");
            encode_error(
                id,
                &ErrorObject::new(ErrorCode::InternalError, "Failed to encode response"),
            )
        }),
        Reply::Error { id, error } => encode_error(id, error),
        Reply::Forward(raw) => raw.trim().to_owned(),
    };
    line.push('\n');
    line
}

fn encode_error(id: &RequestId, error: &ErrorObject) -> String {
    serde_json::to_string(&ErrorEnvelope {
        jsonrpc: JSONRPC_VERSION,
        id,
        error,
    })
    .unwrap_or_else(|e| {
        error!(id = %id, error = %e, "Failed to encode error response");
        fallback_error(id)
    })
}

/// Minimal error envelope that needs no serializer.
fn fallback_error(id: &RequestId) -> String {
    format!(
        r#"{{"jsonrpc":"{JSONRPC_VERSION}","id":{},"error":{{"code":{},"message":"Internal error"}}}}"#,
        id.as_json(),
        ErrorCode::InternalError.code()
    )
}
