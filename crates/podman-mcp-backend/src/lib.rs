//! Podman MCP Backend - Multi-backend execution layer
//!
//! This crate runs container operations against a Podman engine through one
//! of two interchangeable backends:
//!
//! - [`PodmanApi`] (`api`): the libpod REST API over a Unix socket (or TCP)
//! - [`PodmanCli`] (`cli`): the `podman` binary
//!
//! Both implement [`Podman`]. Backends describe themselves through
//! [`Implementation`] and are collected in an [`ImplementationRegistry`];
//! [`PodmanClient`] selects one, either by name or by auto-detection
//! (highest priority among the available ones).
//!
//! ## Example
//!
//! ```ignore
//! use podman_mcp_backend::{ImplementationRegistry, PodmanClient};
//! use podman_mcp_config::PodmanConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ImplementationRegistry::with_defaults();
//!     let client = PodmanClient::new(&registry, &PodmanConfig::default()).await?;
//!     println!("{}", client.container_list().await?);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
mod error;
mod facade;
mod registry;
mod retry;
pub mod selector;
pub mod socket;
mod traits;

pub use api::{ApiImplementation, Locator, PodmanApi};
pub use cli::{CliImplementation, PodmanCli};
pub use error::BackendError;
pub use facade::PodmanClient;
pub use registry::ImplementationRegistry;
pub use retry::{qualify, DEFAULT_REGISTRY};
pub use selector::{Availability, Selection};
pub use socket::{Endpoint, SocketDiscovery};
pub use traits::{build_context, Implementation, Podman, PortMappings};

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
