//! Podman MCP Server implementation
//!
//! This module implements the MCP server using the rmcp SDK, exposing:
//! - Container tools (inspect, list, logs, remove, run, stop)
//! - Image tools (build, list, pull, push, remove)
//! - Network and volume listing
//!
//! Every tool forwards to the selected podman backend. A backend error is
//! returned to the client as an error result carrying the error text.

use std::path::Path;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use tracing::{debug, info};

use podman_mcp_backend::{BackendError, ImplementationRegistry, PodmanClient};
use podman_mcp_config::PodmanConfig;

use crate::tools::*;

/// Name reported to clients during initialization
pub const SERVER_NAME: &str = "podman-mcp-server";

/// Podman MCP Server exposing container management tools
#[derive(Clone)]
pub struct PodmanServer {
    podman: PodmanClient,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl PodmanServer {
    /// Create a server over an already selected backend
    pub fn new(podman: PodmanClient) -> Self {
        Self {
            podman,
            tool_router: Self::tool_router(),
        }
    }

    /// Select a backend from `registry` according to `config` and wrap it
    pub async fn connect(
        registry: &ImplementationRegistry,
        config: &PodmanConfig,
    ) -> Result<Self, crate::ServerError> {
        let podman = PodmanClient::new(registry, config).await?;
        info!(
            "Podman MCP server using '{}' implementation",
            podman.implementation()
        );
        Ok(Self::new(podman))
    }

    /// Name of the backend implementation in use
    pub fn implementation(&self) -> &str {
        self.podman.implementation()
    }

    /// Definitions of every registered tool
    pub fn tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    // =========================================================================
    // Container Tools
    // =========================================================================

    #[tool(
        name = "container_inspect",
        description = "Displays the low-level information and configuration of a Docker or Podman container with the specified container ID or name"
    )]
    pub async fn container_inspect(
        &self,
        Parameters(params): Parameters<ContainerParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("container_inspect: name='{}'", params.name);
        Ok(text_result(self.podman.container_inspect(&params.name).await))
    }

    #[tool(
        name = "container_list",
        description = "Prints out information about the running Docker or Podman containers"
    )]
    pub async fn container_list(
        &self,
        Parameters(_params): Parameters<ListParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("container_list");
        Ok(text_result(self.podman.container_list().await))
    }

    #[tool(
        name = "container_logs",
        description = "Displays the logs of a Docker or Podman container with the specified container ID or name"
    )]
    pub async fn container_logs(
        &self,
        Parameters(params): Parameters<ContainerParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("container_logs: name='{}'", params.name);
        Ok(text_result(self.podman.container_logs(&params.name).await))
    }

    #[tool(
        name = "container_remove",
        description = "Removes a Docker or Podman container with the specified container ID or name (rm)"
    )]
    pub async fn container_remove(
        &self,
        Parameters(params): Parameters<ContainerParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("container_remove: name='{}'", params.name);
        Ok(text_result(self.podman.container_remove(&params.name).await))
    }

    #[tool(
        name = "container_run",
        description = "Runs a Docker or Podman container with the specified image name. The container is removed when it exits"
    )]
    pub async fn container_run(
        &self,
        Parameters(params): Parameters<ContainerRunParams>,
    ) -> Result<CallToolResult, McpError> {
        let ports = parse_ports(params.ports.as_deref().unwrap_or_default());
        let environment = params.environment.unwrap_or_default();
        debug!(
            "container_run: image='{}', ports={:?}, env_count={}",
            params.image_name,
            ports,
            environment.len()
        );

        Ok(text_result(
            self.podman
                .container_run(&params.image_name, &ports, &environment)
                .await,
        ))
    }

    #[tool(
        name = "container_stop",
        description = "Stops a Docker or Podman running container with the specified container ID or name"
    )]
    pub async fn container_stop(
        &self,
        Parameters(params): Parameters<ContainerParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("container_stop: name='{}'", params.name);
        Ok(text_result(self.podman.container_stop(&params.name).await))
    }

    // =========================================================================
    // Image Tools
    // =========================================================================

    #[tool(
        name = "image_build",
        description = "Build a Docker or Podman image from a Dockerfile, Podmanfile, or Containerfile"
    )]
    pub async fn image_build(
        &self,
        Parameters(params): Parameters<ImageBuildParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!(
            "image_build: file='{}', image={:?}",
            params.container_file, params.image_name
        );
        Ok(text_result(
            self.podman
                .image_build(
                    Path::new(&params.container_file),
                    params.image_name.as_deref(),
                )
                .await,
        ))
    }

    #[tool(
        name = "image_list",
        description = "List the Docker or Podman images on the local machine"
    )]
    pub async fn image_list(
        &self,
        Parameters(_params): Parameters<ListParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("image_list");
        Ok(text_result(self.podman.image_list().await))
    }

    #[tool(
        name = "image_pull",
        description = "Copies (pulls) a Docker or Podman container image from a registry onto the local machine storage"
    )]
    pub async fn image_pull(
        &self,
        Parameters(params): Parameters<ImageParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("image_pull: image='{}'", params.image_name);
        Ok(text_result(self.podman.image_pull(&params.image_name).await))
    }

    #[tool(
        name = "image_push",
        description = "Pushes a Docker or Podman container image, manifest list or image index from local machine storage to a registry"
    )]
    pub async fn image_push(
        &self,
        Parameters(params): Parameters<ImageParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("image_push: image='{}'", params.image_name);
        Ok(text_result(self.podman.image_push(&params.image_name).await))
    }

    #[tool(
        name = "image_remove",
        description = "Removes a Docker or Podman image from the local machine storage"
    )]
    pub async fn image_remove(
        &self,
        Parameters(params): Parameters<ImageParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("image_remove: image='{}'", params.image_name);
        Ok(text_result(self.podman.image_remove(&params.image_name).await))
    }

    // =========================================================================
    // Network and Volume Tools
    // =========================================================================

    #[tool(
        name = "network_list",
        description = "List all the available Docker or Podman networks"
    )]
    pub async fn network_list(
        &self,
        Parameters(_params): Parameters<ListParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("network_list");
        Ok(text_result(self.podman.network_list().await))
    }

    #[tool(
        name = "volume_list",
        description = "List all the available Docker or Podman volumes"
    )]
    pub async fn volume_list(
        &self,
        Parameters(_params): Parameters<ListParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("volume_list");
        Ok(text_result(self.podman.volume_list().await))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for PodmanServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Podman MCP Server: manage containers, images, networks and volumes.\n\n\
                CONTAINERS:\n\
                - container_list / container_inspect / container_logs: Look at containers\n\
                - container_run: Start a container from an image (ports as \"host:container\", env as \"KEY=VALUE\")\n\
                - container_stop / container_remove: Stop or delete a container\n\n\
                IMAGES:\n\
                - image_list / image_pull / image_push / image_remove: Manage local images\n\
                - image_build: Build from a Containerfile path (its directory is the context)\n\n\
                OTHER: network_list, volume_list\n\n\
                Unqualified image names that the engine cannot resolve are retried once under docker.io/."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// One text item on success, an error result carrying the message otherwise
fn text_result(result: Result<String, BackendError>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => {
            debug!("Tool call failed: {}", e);
            CallToolResult::error(vec![Content::text(e.to_string())])
        }
    }
}
