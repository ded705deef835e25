//! Short-name retry for image references.
//!
//! When the engine refuses an unqualified image name, the operation is
//! repeated exactly once with [`DEFAULT_REGISTRY`] prepended. Detection
//! relies on engine output text (see [`BackendError::is_short_name`]).

use std::future::Future;

use tracing::debug;

use crate::error::BackendError;

/// Registry prefix used when qualifying a short image name.
pub const DEFAULT_REGISTRY: &str = "docker.io/";

/// Outcome of the first attempt.
pub(crate) enum Attempt<T> {
    Done(T),
    Retryable(BackendError),
    Fatal(BackendError),
}

impl<T> Attempt<T> {
    pub(crate) fn classify(result: Result<T, BackendError>) -> Self {
        match result {
            Ok(value) => Self::Done(value),
            Err(e) if e.is_short_name() => Self::Retryable(e),
            Err(e) => Self::Fatal(e),
        }
    }
}

/// Prefix `image` with the default registry.
pub fn qualify(image: &str) -> String {
    format!("{DEFAULT_REGISTRY}{image}")
}

/// Run `operation` with `image`, retrying once with the qualified name on a
/// short-name failure.
///
/// Returns the result together with the image reference that produced it.
/// When the retry fails its error is returned; the first error is dropped.
pub(crate) async fn with_short_name_retry<T, F, Fut>(
    image: &str,
    operation: F,
) -> Result<(T, String), BackendError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    match Attempt::classify(operation(image.to_string()).await) {
        Attempt::Done(value) => Ok((value, image.to_string())),
        Attempt::Fatal(e) => Err(e),
        Attempt::Retryable(e) => {
            let qualified = qualify(image);
            debug!("Short-name failure for '{}' ({}); retrying as '{}'", image, e, qualified);
            let value = operation(qualified.clone()).await?;
            Ok((value, qualified))
        }
    }
}
