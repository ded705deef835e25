//! Error types for the MCP server

use podman_mcp_backend::BackendError;
use thiserror::Error;

/// Result type for MCP server setup
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while setting up the MCP server
///
/// Errors from individual tool calls are not represented here; they are
/// reported to the client as error tool results.
#[derive(Error, Debug)]
pub enum ServerError {
    /// No usable podman backend could be selected or initialized
    #[error("Failed to initialize podman backend: {0}")]
    Backend(#[from] BackendError),
}
