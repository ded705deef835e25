//! Podman MCP Server - container management tools for AI assistants
//!
//! Serves the Podman MCP tools over stdio or Streamable HTTP, running each operation through the
//! podman REST API or the podman CLI, whichever is selected.
//!
//! # Usage
//!
//! ```bash
//! # Serve over stdio, auto-detecting the backend
//! podman-mcp-server
//!
//! # Serve Streamable HTTP at http://localhost:8080/mcp
//! podman-mcp-server --port 8080
//!
//! # Force the CLI backend with JSON list output
//! podman-mcp-server --podman-impl cli --output-format json
//!
//! # Show which backends are available
//! podman-mcp-server implementations
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use podman_mcp_config::ConfigOverrides;

mod commands;

/// Podman MCP Server - manage containers from MCP clients
#[derive(Parser, Debug)]
#[command(name = "podman-mcp-server")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: commands::serve::ServeArgs,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Podman implementation to use (api, cli). Auto-detected when omitted
    #[arg(long, global = true, env = "PODMAN_MCP_IMPL")]
    podman_impl: Option<String>,

    /// Output format for list operations (text, json)
    #[arg(long, global = true, env = "PODMAN_MCP_OUTPUT_FORMAT")]
    output_format: Option<String>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "PODMAN_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directive (e.g. debug, podman_mcp_backend=trace)
    #[arg(long, global = true, env = "PODMAN_MCP_LOG")]
    log_level: Option<String>,

    /// Log file path (default: stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            podman_impl: self.podman_impl.clone(),
            output_format: self.output_format.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the MCP tools (default)
    Serve(commands::serve::ServeArgs),

    /// List the podman implementations and their availability
    Implementations(commands::implementations::ImplementationsArgs),

    /// View and edit the user configuration file
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => commands::serve::execute(cli.serve, cli.global).await,
        Some(Commands::Serve(args)) => {
            commands::serve::execute(args.or(cli.serve), cli.global).await
        }
        Some(Commands::Implementations(args)) => {
            commands::implementations::execute(args, cli.global).await
        }
        Some(Commands::Config(cmd)) => commands::config::execute(cmd, cli.global).await,
    }
}
