//! Layered configuration loading.
//!
//! Every file is read as a [`ConfigLayer`] in which each key is optional, so
//! a file only changes the keys it actually sets. Layers are applied over the
//! defaults in this order:
//! 1. the user file, `<config dir>/podman-mcp-server/config.toml` (optional)
//! 2. the file passed with `--config` (must exist)
//! 3. [`ConfigOverrides`] from the command line

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::{ConfigOverrides, OutputFormat, PodmanConfig};

const APP_DIR: &str = "podman-mcp-server";
const FILE_NAME: &str = "config.toml";

/// One configuration file as written, before defaults are filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub podman_impl: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub logging: LoggingLayer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingLayer {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl ConfigLayer {
    /// Read and parse `path`.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        toml::from_str(&raw).map_err(|e| ConfigError::parse_toml(path, e))
    }

    /// Write the keys this layer sets onto `config`.
    ///
    /// An empty `podman_impl` counts as set: a file can switch back to
    /// auto-detection.
    pub fn apply_to(&self, config: &mut PodmanConfig) {
        if let Some(name) = &self.podman_impl {
            config.podman_impl = name.clone();
        }
        if let Some(format) = self.output_format {
            config.output_format = format;
        }
        if let Some(level) = &self.logging.level {
            config.logging.level = level.clone();
        }
        if let Some(file) = &self.logging.file {
            config.logging.file = Some(file.clone());
        }
    }
}

/// Resolves the effective [`PodmanConfig`] for one process.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_file: Option<PathBuf>,
    /// `Some` once the user file has been looked at; the inner `None` means
    /// there was no file.
    user_layer: Option<Option<ConfigLayer>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader for the current user's config directory.
    pub fn new() -> Self {
        Self {
            user_file: dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME)),
            user_layer: None,
        }
    }

    /// Loader whose user file lives in `dir` instead.
    pub fn with_global_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            user_file: Some(dir.into().join(FILE_NAME)),
            user_layer: None,
        }
    }

    /// Location of the user file, whether or not it exists.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.user_file.clone()
    }

    /// Effective configuration from every layer.
    pub fn load(
        &mut self,
        explicit: Option<&Path>,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<PodmanConfig, ConfigError> {
        let mut config = PodmanConfig::default();

        if let Some(layer) = self.user_layer()? {
            layer.apply_to(&mut config);
        }
        if let Some(path) = explicit {
            debug!("Applying config file {}", path.display());
            ConfigLayer::read(path)?.apply_to(&mut config);
        }
        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
        }

        trace!("Effective configuration: {:?}", config);
        Ok(config)
    }

    /// Defaults plus the user file, or `None` when there is no user file.
    pub fn load_global(&mut self) -> Result<Option<PodmanConfig>, ConfigError> {
        Ok(self.user_layer()?.map(|layer| {
            let mut config = PodmanConfig::default();
            layer.apply_to(&mut config);
            config
        }))
    }

    fn user_layer(&mut self) -> Result<Option<ConfigLayer>, ConfigError> {
        if let Some(cached) = &self.user_layer {
            return Ok(cached.clone());
        }

        let layer = match &self.user_file {
            Some(path) if path.is_file() => {
                debug!("Applying user config {}", path.display());
                Some(ConfigLayer::read(path)?)
            }
            Some(path) => {
                trace!("No user config at {}", path.display());
                None
            }
            None => {
                debug!("No user config directory on this platform");
                None
            }
        };

        self.user_layer = Some(layer.clone());
        Ok(layer)
    }

    /// Write `config` as the user file, creating its directory.
    pub fn save_global(&self, config: &PodmanConfig) -> Result<(), ConfigError> {
        let path = self.user_file.as_deref().ok_or(ConfigError::NoConfigDir)?;
        write_toml(path, config)
    }

    /// Create the user file with defaults unless one exists; returns its path.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let path = self.user_file.clone().ok_or(ConfigError::NoConfigDir)?;
        if !path.exists() {
            write_toml(&path, &PodmanConfig::default())?;
        }
        Ok(path)
    }
}

fn write_toml(path: &Path, config: &PodmanConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.exists()) {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }
    let body = toml::to_string_pretty(config)?;
    std::fs::write(path, body).map_err(|e| ConfigError::write_file(path, e))
}
