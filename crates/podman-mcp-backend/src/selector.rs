//! Backend selection.
//!
//! An explicit name is looked up and checked; an empty name auto-detects
//! the available implementation with the highest priority.

use std::sync::Arc;

use podman_mcp_config::PodmanConfig;
use tracing::{debug, info};

use crate::error::BackendError;
use crate::registry::ImplementationRegistry;
use crate::traits::{Implementation, Podman};

/// A resolved and initialized backend.
pub struct Selection {
    pub implementation: Arc<dyn Implementation>,
    pub podman: Arc<dyn Podman>,
}

/// Resolve the backend named in `config` (or auto-detect) and initialize it.
pub async fn resolve(
    registry: &ImplementationRegistry,
    config: &PodmanConfig,
) -> Result<Selection, BackendError> {
    let implementation = choose(registry, &config.podman_impl).await?;
    info!(
        "Using podman implementation '{}' ({})",
        implementation.name(),
        implementation.description()
    );
    let podman = implementation.initialize(config).await?;
    Ok(Selection {
        implementation,
        podman,
    })
}

/// Pick an implementation without initializing it.
pub async fn choose(
    registry: &ImplementationRegistry,
    explicit: &str,
) -> Result<Arc<dyn Implementation>, BackendError> {
    if explicit.is_empty() {
        auto_detect(registry).await
    } else {
        by_name(registry, explicit).await
    }
}

async fn by_name(
    registry: &ImplementationRegistry,
    name: &str,
) -> Result<Arc<dyn Implementation>, BackendError> {
    let implementation = registry
        .lookup(name)
        .ok_or_else(|| BackendError::unknown_implementation(name, registry.names()))?;

    if let Err(e) = implementation.check().await {
        return Err(BackendError::not_available(name, e.to_string()));
    }

    Ok(implementation)
}

/// Outcome of one implementation's availability check.
pub struct Availability {
    pub implementation: Arc<dyn Implementation>,
    /// Why the check failed; `None` when available.
    pub error: Option<BackendError>,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }
}

/// Check every registered implementation, highest priority first.
///
/// The first available entry is the one auto-detection would choose.
pub async fn survey(registry: &ImplementationRegistry) -> Vec<Availability> {
    let mut results = Vec::new();
    for implementation in registry.prioritized() {
        let error = implementation.check().await.err();
        results.push(Availability {
            implementation,
            error,
        });
    }
    results
}

async fn auto_detect(
    registry: &ImplementationRegistry,
) -> Result<Arc<dyn Implementation>, BackendError> {
    let mut tried = Vec::new();

    for implementation in registry.prioritized() {
        match implementation.check().await {
            Ok(()) => return Ok(implementation),
            Err(e) => {
                debug!(
                    "Podman implementation '{}' not available: {}",
                    implementation.name(),
                    e
                );
                tried.push(format!("{} (not available)", implementation.name()));
            }
        }
    }

    Err(BackendError::NoImplementationAvailable { tried })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::StubImplementation;

    fn config_for(name: &str) -> PodmanConfig {
        PodmanConfig {
            podman_impl: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_explicit_available_implementation() {
        let registry = ImplementationRegistry::new();
        let stub = StubImplementation::new("stub", 10, true);
        registry.register(stub.clone());

        let selection = resolve(&registry, &config_for("stub")).await.unwrap();

        assert_eq!(selection.implementation.name(), "stub");
        assert_eq!(selection.podman.container_list().await.unwrap(), "stub");
        assert_eq!(stub.init_count(), 1);
    }

    #[tokio::test]
    async fn test_explicit_unknown_lists_valid_names() {
        let registry = ImplementationRegistry::new();
        registry.register(StubImplementation::new("zeta", 1, true));
        registry.register(StubImplementation::new("alpha", 1, true));

        let err = resolve(&registry, &config_for("docker")).await.err().unwrap();

        match &err {
            BackendError::UnknownImplementation { name, valid } => {
                assert_eq!(name, "docker");
                assert_eq!(valid, &vec!["alpha".to_string(), "zeta".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("alpha"));
        assert!(err.to_string().contains("zeta"));
    }

    #[tokio::test]
    async fn test_explicit_unavailable_names_reason() {
        let registry = ImplementationRegistry::new();
        let stub = StubImplementation::new("unavailable-mock", 10, false);
        registry.register(stub.clone());

        let err = resolve(&registry, &config_for("unavailable-mock"))
            .await
            .err()
            .unwrap();

        match err {
            BackendError::ImplementationNotAvailable { name, reason } => {
                assert_eq!(name, "unavailable-mock");
                assert!(reason.contains("stub disabled"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stub.init_count(), 0);
    }

    #[tokio::test]
    async fn test_auto_detect_selects_highest_priority() {
        let registry = ImplementationRegistry::new();
        let low = StubImplementation::new("low-priority", 10, true);
        let high = StubImplementation::new("high-priority", 100, true);
        registry.register(low.clone());
        registry.register(high.clone());

        let selection = resolve(&registry, &PodmanConfig::default()).await.unwrap();

        assert_eq!(selection.implementation.name(), "high-priority");
        assert_eq!(high.init_count(), 1);
        assert_eq!(low.init_count(), 0);
    }

    #[tokio::test]
    async fn test_auto_detect_equal_priority_first_registered_wins() {
        let registry = ImplementationRegistry::new();
        registry.register(StubImplementation::new("first", 50, true));
        registry.register(StubImplementation::new("second", 50, true));

        let chosen = choose(&registry, "").await.unwrap();
        assert_eq!(chosen.name(), "first");
    }

    #[tokio::test]
    async fn test_auto_detect_skips_unavailable() {
        let registry = ImplementationRegistry::new();
        registry.register(StubImplementation::new("unavailable-high", 100, false));
        let fallback = StubImplementation::new("available-low", 10, true);
        registry.register(fallback.clone());

        let selection = resolve(&registry, &PodmanConfig::default()).await.unwrap();

        assert_eq!(selection.implementation.name(), "available-low");
        assert_eq!(fallback.init_count(), 1);
    }

    #[tokio::test]
    async fn test_auto_detect_none_available_enumerates_candidates() {
        let registry = ImplementationRegistry::new();
        registry.register(StubImplementation::new("mock1", 100, false));
        registry.register(StubImplementation::new("mock2", 50, false));

        let err = resolve(&registry, &PodmanConfig::default())
            .await
            .err()
            .unwrap();

        assert_eq!(
            err.to_string(),
            "no podman implementation available: mock1 (not available), mock2 (not available)"
        );
    }

    #[tokio::test]
    async fn test_auto_detect_empty_registry() {
        let registry = ImplementationRegistry::new();

        let err = choose(&registry, "").await.err().unwrap();

        assert!(matches!(
            err,
            BackendError::NoImplementationAvailable { ref tried } if tried.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_survey_reports_each_in_priority_order() {
        let registry = ImplementationRegistry::new();
        registry.register(StubImplementation::new("cli-like", 50, true));
        registry.register(StubImplementation::new("api-like", 100, false));

        let survey = survey(&registry).await;

        let names: Vec<&str> = survey.iter().map(|a| a.implementation.name()).collect();
        assert_eq!(names, vec!["api-like", "cli-like"]);
        assert!(!survey[0].is_available());
        assert!(survey[0]
            .error
            .as_ref()
            .unwrap()
            .to_string()
            .contains("stub disabled"));
        assert!(survey[1].is_available());
    }
}
