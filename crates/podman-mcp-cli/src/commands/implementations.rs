//! Implementations command
//!
//! Lists the registered podman backends, checks each one, and shows which
//! would be used.

use anyhow::Result;
use clap::Args;
use podman_mcp_backend::selector::{self, Availability};
use podman_mcp_backend::ImplementationRegistry;
use serde::Serialize;

use crate::GlobalOptions;

/// List the podman implementations and their availability
#[derive(Args, Debug)]
pub struct ImplementationsArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ImplementationReport {
    name: String,
    priority: i32,
    description: String,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    selected: bool,
}

/// Execute the implementations command
pub async fn execute(args: ImplementationsArgs, global: GlobalOptions) -> Result<()> {
    let config = super::load_config(&global)?;
    super::init_logging(&config, &global)?;

    let registry = ImplementationRegistry::with_defaults();
    let survey = selector::survey(&registry).await;
    let reports = build_reports(&survey, &config.podman_impl);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("Podman implementations");
    println!("======================\n");
    for report in &reports {
        let status = if report.available { "✓" } else { "✗" };
        let marker = if report.selected { "  (selected)" } else { "" };
        println!(
            "{} {} [priority {}]: {}{}",
            status, report.name, report.priority, report.description, marker
        );
        if let Some(ref reason) = report.reason {
            println!("  → {}", reason);
        }
    }

    println!();
    match reports.iter().find(|r| r.selected) {
        Some(report) if config.auto_detect() => {
            println!("Auto-detection selects '{}'", report.name)
        }
        Some(report) => println!("Configured implementation '{}' is available", report.name),
        None if config.auto_detect() => println!("No podman implementation is available"),
        None => println!(
            "Configured implementation '{}' is not available",
            config.podman_impl
        ),
    }

    Ok(())
}

/// One report per surveyed implementation.
///
/// With no configured name the first available entry is selected; otherwise
/// the configured entry is, when available.
fn build_reports(survey: &[Availability], configured: &str) -> Vec<ImplementationReport> {
    let selected = if configured.is_empty() {
        survey
            .iter()
            .find(|a| a.is_available())
            .map(|a| a.implementation.name().to_string())
    } else {
        survey
            .iter()
            .find(|a| a.implementation.name() == configured && a.is_available())
            .map(|a| a.implementation.name().to_string())
    };

    survey
        .iter()
        .map(|a| {
            let name = a.implementation.name().to_string();
            ImplementationReport {
                selected: selected.as_deref() == Some(name.as_str()),
                priority: a.implementation.priority(),
                description: a.implementation.description().to_string(),
                available: a.is_available(),
                reason: a.error.as_ref().map(|e| e.to_string()),
                name,
            }
        })
        .collect()
}
