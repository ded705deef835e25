//! The handle the protocol layer holds.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use podman_mcp_config::PodmanConfig;

use crate::error::BackendError;
use crate::registry::ImplementationRegistry;
use crate::selector;
use crate::traits::Podman;

/// A selected backend plus the name it was selected under.
///
/// Dereferences to [`Podman`], so operations are called directly on the
/// handle. Cloning shares the same backend instance.
#[derive(Clone)]
pub struct PodmanClient {
    implementation: String,
    backend: Arc<dyn Podman>,
}

impl PodmanClient {
    /// Select and initialize a backend according to `config`.
    pub async fn new(
        registry: &ImplementationRegistry,
        config: &PodmanConfig,
    ) -> Result<Self, BackendError> {
        let selection = selector::resolve(registry, config).await?;
        Ok(Self {
            implementation: selection.implementation.name().to_string(),
            backend: selection.podman,
        })
    }

    /// Wrap an already constructed backend.
    pub fn from_backend(implementation: impl Into<String>, backend: Arc<dyn Podman>) -> Self {
        Self {
            implementation: implementation.into(),
            backend,
        }
    }

    /// Name of the implementation in use.
    pub fn implementation(&self) -> &str {
        &self.implementation
    }
}

impl Deref for PodmanClient {
    type Target = dyn Podman;

    fn deref(&self) -> &Self::Target {
        self.backend.as_ref()
    }
}

impl fmt::Debug for PodmanClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodmanClient")
            .field("implementation", &self.implementation)
            .finish_non_exhaustive()
    }
}
