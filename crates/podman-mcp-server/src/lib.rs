//! Podman MCP - MCP server exposing container management tools to AI assistants
//!
//! This crate provides an MCP (Model Context Protocol) server whose tools
//! run against a Podman engine through `podman-mcp-backend`.
//!
//! # Features
//!
//! - **Containers**: inspect, list, logs, run, stop, remove
//! - **Images**: build, list, pull, push, remove
//! - **Networks and volumes**: list
//! - **Backend choice**: REST API or CLI, selected by priority and availability
//! - **Transports**: stdio, or Streamable HTTP through [`http`]

pub mod error;
pub mod http;
pub mod server;
pub mod tools;

// Re-exports
pub use error::{Result, ServerError};
pub use server::{PodmanServer, SERVER_NAME};
