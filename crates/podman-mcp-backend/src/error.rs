//! Backend error types.

use thiserror::Error;

/// Substring emitted by the engine when an unqualified image reference
/// cannot be resolved against the configured registries.
const SHORT_NAME_MARKER: &str = "short-name";

/// Errors that can occur while selecting or driving a Podman backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Explicitly requested implementation is not registered
    #[error("unknown podman implementation \"{name}\", valid options: {}", .valid.join(", "))]
    UnknownImplementation { name: String, valid: Vec<String> },

    /// Explicitly requested implementation failed its availability check
    #[error("podman implementation \"{name}\" not available: {reason}")]
    ImplementationNotAvailable { name: String, reason: String },

    /// Auto-detection found nothing usable
    #[error("no podman implementation available: {}", .tried.join(", "))]
    NoImplementationAvailable { tried: Vec<String> },

    /// Neither `podman` nor `podman.exe` could be executed
    #[error("podman CLI not found")]
    BinaryNotFound,

    /// None of the well-known socket locations exist
    #[error("no podman socket found")]
    SocketNotFound,

    /// `CONTAINER_HOST` is set but is not a usable URI
    #[error("invalid CONTAINER_HOST \"{value}\": {message}")]
    InvalidContainerHost { value: String, message: String },

    /// Socket URI with a scheme other than `unix` or `tcp`
    #[error("unsupported socket scheme: {0}")]
    UnsupportedScheme(String),

    /// Raw liveness probe failed
    #[error("{context}: {message}")]
    Ping { context: String, message: String },

    /// The CLI exited unsuccessfully; carries its combined output
    #[error("{0}")]
    Command(String),

    /// The REST API answered with an error status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Log streams did not close before the deadline
    #[error("timeout waiting for container logs")]
    LogsTimeout,

    /// Operation is not supported by the active backend
    #[error("operation \"{operation}\" not implemented for this podman backend")]
    NotImplemented { operation: String },

    /// Connection-level failure talking to the engine
    #[error("connection failed: {0}")]
    Connection(String),

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl BackendError {
    /// Create an UnknownImplementation error.
    pub fn unknown_implementation(name: impl Into<String>, valid: Vec<String>) -> Self {
        Self::UnknownImplementation {
            name: name.into(),
            valid,
        }
    }

    /// Create an ImplementationNotAvailable error.
    pub fn not_available(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImplementationNotAvailable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_container_host(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidContainerHost {
            value: value.into(),
            message: message.into(),
        }
    }

    pub fn ping(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ping {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a NotImplemented error.
    pub fn not_implemented(operation: impl Into<String>) -> Self {
        Self::NotImplemented {
            operation: operation.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn http(message: impl Into<String>) -> Self {
        Self::Http(message.into())
    }

    /// Add context to any error.
    pub fn with_context(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Whether the engine rejected an unqualified image reference.
    ///
    /// This matches engine output text; there is no structured error code
    /// for this condition.
    pub fn is_short_name(&self) -> bool {
        match self {
            Self::Command(output) => output.contains(SHORT_NAME_MARKER),
            Self::Api { message, .. } => message.contains(SHORT_NAME_MARKER),
            Self::WithContext { message, .. } => message.contains(SHORT_NAME_MARKER),
            _ => false,
        }
    }
}

impl From<hyper::Error> for BackendError {
    fn from(err: hyper::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<http::Error> for BackendError {
    fn from(err: http::Error) -> Self {
        Self::Http(err.to_string())
    }
}
