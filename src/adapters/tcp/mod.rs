//! Line-delimited JSON-RPC over TCP
//!
//! One task per accepted connection, one task per received message, and a
//! single writer task per connection that owns the socket's write half.

pub mod connection;
pub mod encoder;
pub mod server;

pub use connection::handle_connection;
pub use encoder::encode_reply;
pub use server::{GatewayServer, ServerError};
