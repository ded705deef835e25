//! Backend trait definitions.
//!
//! [`Podman`] is the single operation interface the protocol layer talks to;
//! [`Implementation`] describes a backend that can produce one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use podman_mcp_config::PodmanConfig;

use crate::error::BackendError;

/// Host port → container port.
pub type PortMappings = BTreeMap<u16, u16>;

/// Build context for a Containerfile: its parent directory.
pub fn build_context(container_file: &Path) -> PathBuf {
    match container_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Container engine operations.
///
/// Every backend exposes the same method set with the same result
/// conventions: the returned text is what a user would see, and engine
/// failures are passed through as errors carrying the engine's message.
///
/// Mutating operations default to [`BackendError::NotImplemented`] so a
/// partial backend fails loudly instead of reporting an empty success.
#[async_trait]
pub trait Podman: Send + Sync {
    /// Low-level information about a container, as JSON.
    async fn container_inspect(&self, name: &str) -> Result<String, BackendError>;

    /// All containers, running or not.
    async fn container_list(&self) -> Result<String, BackendError>;

    /// Container logs: stdout, then stderr.
    async fn container_logs(&self, name: &str) -> Result<String, BackendError>;

    /// Remove a container.
    async fn container_remove(&self, name: &str) -> Result<String, BackendError> {
        let _ = name;
        Err(BackendError::not_implemented("container_remove"))
    }

    /// Run a detached, auto-removed container.
    ///
    /// With no `ports`, every exposed port is published to a random host
    /// port. `environment` entries are `KEY=VALUE` strings.
    async fn container_run(
        &self,
        image: &str,
        ports: &PortMappings,
        environment: &[String],
    ) -> Result<String, BackendError> {
        let _ = (image, ports, environment);
        Err(BackendError::not_implemented("container_run"))
    }

    /// Stop a running container.
    async fn container_stop(&self, name: &str) -> Result<String, BackendError> {
        let _ = name;
        Err(BackendError::not_implemented("container_stop"))
    }

    /// Build an image from a Containerfile; the context is its directory.
    async fn image_build(
        &self,
        container_file: &Path,
        image_name: Option<&str>,
    ) -> Result<String, BackendError> {
        let _ = (container_file, image_name);
        Err(BackendError::not_implemented("image_build"))
    }

    /// Local images.
    async fn image_list(&self) -> Result<String, BackendError>;

    /// Pull an image, qualifying short names with `docker.io/` on demand.
    async fn image_pull(&self, image: &str) -> Result<String, BackendError> {
        let _ = image;
        Err(BackendError::not_implemented("image_pull"))
    }

    /// Push an image to its registry.
    async fn image_push(&self, image: &str) -> Result<String, BackendError> {
        let _ = image;
        Err(BackendError::not_implemented("image_push"))
    }

    /// Remove a local image.
    async fn image_remove(&self, image: &str) -> Result<String, BackendError> {
        let _ = image;
        Err(BackendError::not_implemented("image_remove"))
    }

    async fn network_list(&self) -> Result<String, BackendError>;

    async fn volume_list(&self) -> Result<String, BackendError>;
}

/// A self-describing backend that can be registered and selected.
#[async_trait]
pub trait Implementation: Send + Sync {
    /// Unique identifier used for explicit selection (e.g. `"cli"`).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Auto-detection priority. Higher wins.
    fn priority(&self) -> i32;

    /// Check whether the backend can be used on this machine.
    ///
    /// The error explains why it cannot.
    async fn check(&self) -> Result<(), BackendError>;

    /// Availability probe.
    async fn available(&self) -> bool {
        self.check().await.is_ok()
    }

    /// Construct a live backend instance.
    async fn initialize(&self, config: &PodmanConfig) -> Result<Arc<dyn Podman>, BackendError>;
}
