//! `serve` command: run the gateway until interrupted.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::tcp::GatewayServer;
use crate::application::RequestDispatcher;
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::LoggerImpl;
use crate::infrastructure::worker::StdioWorkerRunner;

/// Arguments for `switchboard serve`
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Configuration file (defaults to ./switchboard.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Interface to bind, overrides server.host
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, overrides server.port
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

/// Run the gateway until Ctrl+C or SIGTERM.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = ConfigLoader::load(args.config.as_deref())?;
    args.apply(&mut config);
    ConfigLoader::validate(&config)?;

    let _logger = LoggerImpl::init(&config.logging)?;

    let routes = Arc::new(ConfigLoader::route_table(&config)?);
    info!(
        tools = routes.len(),
        workers = routes.workers().len(),
        "Loaded route table"
    );

    let runner = Arc::new(StdioWorkerRunner::new(config.worker.clone()));
    let dispatcher =
        RequestDispatcher::new(routes, runner, config.worker.protocol_version.clone());

    let addr = config.server.bind_address();
    let server = GatewayServer::bind(&addr, dispatcher)
        .await
        .with_context(|| format!("Failed to start gateway on {addr}"))?;

    server.serve_with_shutdown(shutdown_signal()).await?;
    info!("Gateway stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
