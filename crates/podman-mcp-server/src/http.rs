//! Streamable HTTP transport
//!
//! Mounts the MCP service at [`MCP_PATH`]. Each HTTP session gets its own
//! clone of the [`PodmanServer`], all sharing one backend.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::PodmanServer;

/// Path of the Streamable HTTP endpoint
pub const MCP_PATH: &str = "/mcp";

/// Router answering MCP requests at [`MCP_PATH`]
pub fn router(server: PodmanServer) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        Default::default(),
    );
    Router::new().nest_service(MCP_PATH, service)
}

/// Serve `server` on `listener` until `shutdown` completes.
pub async fn serve<F>(
    listener: TcpListener,
    server: PodmanServer,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(
        "Streamable HTTP endpoint at http://{}{}",
        listener.local_addr()?,
        MCP_PATH
    );
    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown)
        .await
}
