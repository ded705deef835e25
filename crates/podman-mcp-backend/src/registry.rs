//! Registry of backend implementations.
//!
//! Backends are registered once during start-up and looked up by name or
//! by priority afterwards. Reads hand out copies so callers never hold the
//! lock while probing or initializing a backend.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::traits::Implementation;

/// Ordered collection of registered backends.
///
/// Names are not checked for uniqueness: lookups return the first match.
#[derive(Default)]
pub struct ImplementationRegistry {
    implementations: RwLock<Vec<Arc<dyn Implementation>>>,
}

impl ImplementationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in `api` and `cli` backends.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(crate::api::ApiImplementation::new()));
        registry.register(Arc::new(crate::cli::CliImplementation::new()));
        registry
    }

    /// Append an implementation.
    pub fn register(&self, implementation: Arc<dyn Implementation>) {
        debug!(
            "Registering podman implementation '{}' (priority {})",
            implementation.name(),
            implementation.priority()
        );
        self.implementations.write().push(implementation);
    }

    /// Snapshot of every registered implementation in registration order.
    pub fn all(&self) -> Vec<Arc<dyn Implementation>> {
        self.implementations.read().clone()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .implementations
            .read()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// First implementation registered under `name` (case-sensitive).
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Implementation>> {
        self.implementations
            .read()
            .iter()
            .find(|i| i.name() == name)
            .cloned()
    }

    /// Every registered implementation, highest priority first.
    ///
    /// Ties keep registration order.
    pub fn prioritized(&self) -> Vec<Arc<dyn Implementation>> {
        by_priority(self.all())
    }

    /// Highest-priority implementation regardless of availability.
    pub fn default_implementation(&self) -> Option<Arc<dyn Implementation>> {
        self.prioritized().into_iter().next()
    }

    /// Remove every implementation.
    ///
    /// Intended for tests that need to install their own set.
    pub fn clear(&self) {
        self.implementations.write().clear();
    }

    pub fn len(&self) -> usize {
        self.implementations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.implementations.read().is_empty()
    }
}

/// Sort by descending priority, keeping registration order among equals.
fn by_priority(
    mut implementations: Vec<Arc<dyn Implementation>>,
) -> Vec<Arc<dyn Implementation>> {
    // `sort_by` is stable
    implementations.sort_by(|a, b| b.priority().cmp(&a.priority()));
    implementations
}
