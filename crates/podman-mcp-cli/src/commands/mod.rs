//! CLI command implementations
//!
//! This module contains the command implementations plus the start-up steps
//! they share: configuration loading and logging.

pub mod config;
pub mod implementations;
pub mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use podman_mcp_config::{ConfigLoader, PodmanConfig};
use tracing::warn;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::GlobalOptions;

/// Load configuration: global file, then `--config`, then CLI overrides.
pub fn load_config(global: &GlobalOptions) -> Result<PodmanConfig> {
    let mut loader = ConfigLoader::new();
    let overrides = global.to_config_overrides();
    loader
        .load(global.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")
}

/// Effective log filter: `-v`/`-q` first, then the configured level.
fn log_filter(config: &PodmanConfig, global: &GlobalOptions) -> EnvFilter {
    let level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        config.logging.level.as_str()
    };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber.
///
/// Logs never go to stdout, which carries the MCP JSON-RPC stream. A
/// subscriber that is already installed is kept.
pub fn init_logging(config: &PodmanConfig, global: &GlobalOptions) -> Result<()> {
    let filter = log_filter(config, global);
    let log_file: Option<PathBuf> = global
        .log_file
        .clone()
        .or_else(|| config.logging.file.clone());

    if let Some(ref log_file) = log_file {
        let file = std::fs::File::create(log_file)
            .with_context(|| format!("Failed to create log file: {}", log_file.display()))?;
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        if subscriber.try_init().is_err() {
            warn!(
                "Using existing tracing subscriber (--log-file {} ignored)",
                log_file.display()
            );
        }
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .finish();
        let _ = subscriber.try_init();
    }

    Ok(())
}
