//! MCP Tool parameter definitions
//!
//! These structs define the JSON Schema for tool parameters using schemars.
//! Field names on the wire are camelCase (`imageName`, `containerFile`).

use podman_mcp_backend::PortMappings;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Parameters for tools addressing one container
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContainerParams {
    /// Container ID or name
    #[schemars(description = "Docker or Podman container ID or name")]
    pub name: String,
}

/// Parameters for tools addressing one image
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageParams {
    /// Image reference
    #[schemars(description = "Docker or Podman container image name")]
    pub image_name: String,
}

/// Parameters for container_run tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRunParams {
    #[schemars(description = "Docker or Podman container image name to run")]
    pub image_name: String,

    #[schemars(
        description = "Port mappings to expose on the host, each formatted as \"hostPort:containerPort\" (e.g. [\"8080:80\"]). When omitted, all exposed ports are published to random host ports"
    )]
    #[serde(default)]
    pub ports: Option<Vec<String>>,

    #[schemars(
        description = "Environment variables to set in the container, each formatted as \"KEY=VALUE\" (e.g. [\"MODE=production\"])"
    )]
    #[serde(default)]
    pub environment: Option<Vec<String>>,
}

/// Parameters for image_build tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageBuildParams {
    /// Path to the build file; its directory is the build context
    #[schemars(
        description = "Absolute path to the Dockerfile, Podmanfile, or Containerfile to build. Its parent directory is used as the build context"
    )]
    pub container_file: String,

    #[schemars(
        description = "Name assigned to the resulting image if the build completes successfully (--tag, -t)"
    )]
    #[serde(default)]
    pub image_name: Option<String>,
}

/// Parameters for the list tools (no params needed)
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListParams {}

/// Parse `"host:container"` port strings.
///
/// Entries that do not start with two positive integers separated by a colon
/// are skipped; a later mapping for the same host port replaces an earlier
/// one. Anything after the container port (such as `/tcp`) is ignored.
pub fn parse_ports(entries: &[String]) -> PortMappings {
    entries
        .iter()
        .filter_map(|entry| parse_port_mapping(entry))
        .collect()
}

fn parse_port_mapping(entry: &str) -> Option<(u16, u16)> {
    let (host, rest) = entry.trim().split_once(':')?;
    let host: u16 = host.trim().parse().ok()?;

    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let container: u16 = rest[..end].parse().ok()?;

    (host > 0 && container > 0).then_some((host, container))
}
