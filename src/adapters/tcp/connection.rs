//! Per-connection message loop

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Instrument};

use super::encoder::encode_reply;
use crate::application::RequestDispatcher;
use crate::infrastructure::framing::MessageFramer;

/// Encoded replies waiting for the writer task
const OUTBOUND_CAPACITY: usize = 64;

/// Serve one client until it disconnects or the socket fails.
///
/// Each message is dispatched on its own task, so a slow tool call never
/// holds up later messages. Replies go out in completion order; clients
/// correlate them by id. Dispatches still running when the read side ends
/// are left to finish and their replies are written best-effort.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<RequestDispatcher>,
) {
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
    tokio::spawn(write_replies(write_half, rx, peer).in_current_span());

    let mut framer = MessageFramer::new(read_half);
    loop {
        match framer.next_message().await {
            Ok(Some(message)) => {
                let dispatcher = Arc::clone(&dispatcher);
                let tx = tx.clone();
                tokio::spawn(
                    async move {
                        let Some(reply) = dispatcher.dispatch(&message).await else {
                            return;
                        };
                        if tx.send(encode_reply(&reply)).await.is_err() {
                            debug!("Connection closed before the reply could be written");
                        }
                    }
                    .in_current_span(),
                );
            }
            Ok(None) => {
                info!("Client disconnected");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read from client");
                break;
            }
        }
    }
}

async fn write_replies(
    mut writer: OwnedWriteHalf,
    mut replies: mpsc::Receiver<String>,
    peer: SocketAddr,
) {
    while let Some(line) = replies.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!(peer = %peer, error = %e, "Failed to write reply");
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!(peer = %peer, error = %e, "Failed to shut down write half");
    }
}
