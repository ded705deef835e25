//! Config command - inspect and edit the user configuration file
//!
//! The user file is `<config dir>/podman-mcp-server/config.toml`. `show`
//! prints the effective configuration after every layer and flag is applied.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use podman_mcp_backend::ImplementationRegistry;
use podman_mcp_config::{ConfigLoader, OutputFormat, PodmanConfig};
use serde::Serialize;

use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show(ShowArgs),

    /// Show the user configuration file path
    Path(PathArgs),

    /// Create the user configuration file with defaults
    Init,

    /// Set a value in the user configuration file
    Set(SetArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON instead of TOML
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Key: podman_impl, output_format, logging.level or logging.file
    key: String,

    /// New value; an empty podman_impl restores auto-detection
    value: String,
}

#[derive(Debug, Serialize)]
struct UserFile {
    path: Option<PathBuf>,
    exists: bool,
}

/// Execute the config command
pub async fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => show(args, &global),
        ConfigCommand::Path(args) => path(args),
        ConfigCommand::Init => init(),
        ConfigCommand::Set(args) => set(args),
    }
}

fn show(args: ShowArgs, global: &GlobalOptions) -> Result<()> {
    let config = super::load_config(global)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

fn path(args: PathArgs) -> Result<()> {
    let path = ConfigLoader::new().global_config_path();
    let file = UserFile {
        exists: path.as_ref().is_some_and(|p| p.exists()),
        path,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&file)?);
        return Ok(());
    }
    match &file.path {
        Some(path) if file.exists => println!("{}", path.display()),
        Some(path) => println!("{} (not created)", path.display()),
        None => println!("No user configuration directory on this platform"),
    }
    Ok(())
}

fn init() -> Result<()> {
    let path = ConfigLoader::new()
        .init_global()
        .context("Failed to create configuration file")?;
    println!("{}", path.display());
    Ok(())
}

fn set(args: SetArgs) -> Result<()> {
    let mut loader = ConfigLoader::new();
    let mut config = loader
        .load_global()
        .context("Failed to read configuration file")?
        .unwrap_or_default();

    set_value(&mut config, &args.key, &args.value)?;
    loader
        .save_global(&config)
        .context("Failed to write configuration file")?;

    println!("Set {} = {:?}", args.key, args.value);
    Ok(())
}

fn set_value(config: &mut PodmanConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "podman_impl" => {
            let valid = ImplementationRegistry::with_defaults().names();
            if !value.is_empty() && !valid.iter().any(|name| name == value) {
                bail!(
                    "Unknown podman implementation '{}'. Valid values: {}",
                    value,
                    valid.join(", ")
                );
            }
            config.podman_impl = value.to_string();
        }
        "output_format" => config.output_format = value.parse::<OutputFormat>()?,
        "logging.level" => config.logging.level = value.to_string(),
        "logging.file" => {
            config.logging.file = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        other => bail!(
            "Unknown configuration key: {}. Valid keys: podman_impl, output_format, logging.level, logging.file",
            other
        ),
    }
    Ok(())
}
