//! TCP listener and accept loop

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, info_span, warn, Instrument};

use super::connection::handle_connection;
use crate::application::RequestDispatcher;

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Listener errors. Only binding is fatal to the gateway.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening socket could not be created.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// The bound address could not be queried.
    #[error("Failed to read listener address: {0}")]
    LocalAddr(#[source] io::Error),
}

/// Gateway bound to a TCP address.
pub struct GatewayServer {
    listener: TcpListener,
    dispatcher: Arc<RequestDispatcher>,
}

impl GatewayServer {
    /// Bind the listener. Port `0` picks an ephemeral port.
    pub async fn bind(addr: &str, dispatcher: RequestDispatcher) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            listener,
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Address actually bound, useful after binding port `0`.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::LocalAddr)
    }

    /// Accept connections forever.
    pub async fn serve(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Open connections and in-flight calls are not awaited; they finish on
    /// their own tasks.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.local_addr()?;
        info!(addr = %addr, "Gateway listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!(peer = %peer, "Accepted connection");
                        let span = info_span!("connection", peer = %peer);
                        tokio::spawn(
                            handle_connection(stream, peer, Arc::clone(&self.dispatcher))
                                .instrument(span),
                        );
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
    }
}
