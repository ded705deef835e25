//! Settings for the Podman MCP server.
//!
//! There are two knobs that matter to the backend layer, the implementation
//! name and the list output format, plus logging. Values come from TOML
//! files and command-line overrides; see [`ConfigLoader`] for the order.
//!
//! ```toml
//! podman_impl = "api"     # or "cli"; empty selects automatically
//! output_format = "json"  # or "text"
//!
//! [logging]
//! level = "debug"
//! ```

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::{ConfigLayer, ConfigLoader, LoggingLayer};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Root configuration for the server.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PodmanConfig {
    /// Backend implementation name. Empty means auto-detect by priority.
    pub podman_impl: String,

    /// Rendering of list-style results
    pub output_format: OutputFormat,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Output format for list operations.
///
/// Deserialization never fails: any value other than `json` or `text`
/// falls back to [`OutputFormat::Text`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Text,
    /// Indented JSON documents
    Json,
}

impl OutputFormat {
    /// Parse a format name, falling back to text for unknown values.
    pub fn parse_lenient(s: &str) -> Self {
        match s.parse() {
            Ok(format) => format,
            Err(_) => {
                warn!("Unknown output format '{}', falling back to text", s);
                Self::Text
            }
        }
    }

    /// Whether list results should be rendered as JSON.
    pub fn is_json(self) -> bool {
        self == Self::Json
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::invalid_value(
                "output_format",
                format!("unknown output format '{}'. Valid values: text, json", s),
            )),
        }
    }
}

impl From<String> for OutputFormat {
    fn from(s: String) -> Self {
        Self::parse_lenient(&s)
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.to_string()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, stderr otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override backend implementation (ignored when empty)
    pub podman_impl: Option<String>,

    /// Override output format (unknown values fall back to text)
    pub output_format: Option<String>,

    /// Override log level
    pub log_level: Option<String>,
}

impl PodmanConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref name) = overrides.podman_impl {
            if !name.is_empty() {
                self.podman_impl = name.clone();
            }
        }

        if let Some(ref format) = overrides.output_format {
            self.output_format = OutputFormat::parse_lenient(format);
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Builder-style variant of [`apply_overrides`](Self::apply_overrides).
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        self.apply_overrides(overrides);
        self
    }

    /// Whether the backend should be chosen automatically.
    pub fn auto_detect(&self) -> bool {
        self.podman_impl.is_empty()
    }
}
