//! MCP server command
//!
//! Selects a podman backend and serves the MCP tools over stdio, or over
//! Streamable HTTP when a port is given.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Args;
use podman_mcp_backend::ImplementationRegistry;
use podman_mcp_server::{http, PodmanServer};
use rmcp::{transport::stdio, ServiceExt};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::GlobalOptions;

/// Transport selection
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Serve Streamable HTTP on this port (endpoint /mcp) instead of stdio
    #[arg(long, env = "PODMAN_MCP_PORT")]
    pub port: Option<u16>,
}

impl ServeArgs {
    /// Fill unset values from `outer`
    pub fn or(self, outer: ServeArgs) -> Self {
        Self {
            port: self.port.or(outer.port),
        }
    }
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, global: GlobalOptions) -> Result<()> {
    let config = super::load_config(&global)?;
    super::init_logging(&config, &global)?;

    info!("Starting Podman MCP Server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "  Implementation: {}",
        if config.auto_detect() {
            "auto"
        } else {
            config.podman_impl.as_str()
        }
    );
    info!("  Output format: {}", config.output_format);

    let registry = ImplementationRegistry::with_defaults();
    let server = PodmanServer::connect(&registry, &config)
        .await
        .context("Failed to create MCP server")?;

    match args.port {
        Some(port) => serve_http(server, port).await,
        None => serve_stdio(server).await,
    }
}

async fn serve_http(server: PodmanServer, port: u16) -> Result<()> {
    info!(
        "Server initialized with '{}' backend, starting MCP protocol over HTTP",
        server.implementation()
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to listen on {}", addr))?;
    http::serve(listener, server, async {
        shutdown_signal().await;
        info!("Shutdown signal received");
    })
    .await
    .context("HTTP server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn serve_stdio(server: PodmanServer) -> Result<()> {
    info!(
        "Server initialized with '{}' backend, starting MCP protocol over stdio",
        server.implementation()
    );

    let service = server
        .serve(stdio())
        .await
        .context("Failed to start MCP service")?;

    // Wait for shutdown or service termination
    tokio::select! {
        result = service.waiting() => {
            if let Err(e) = result {
                info!("Service ended with error: {}", e);
            } else {
                info!("Service ended normally");
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
