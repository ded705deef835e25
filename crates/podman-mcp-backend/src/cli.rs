//! Backend that shells out to the `podman` binary.
//!
//! Output is the process's own text; list formatting is left to the
//! binary (`--format json` when JSON output is configured).

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use podman_mcp_config::{OutputFormat, PodmanConfig};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::BackendError;
use crate::retry::with_short_name_retry;
use crate::traits::{build_context, Implementation, Podman, PortMappings};

/// Executable names tried in order.
pub const BINARY_CANDIDATES: [&str; 2] = ["podman", "podman.exe"];

/// Registry entry for the CLI backend.
#[derive(Debug, Clone, Default)]
pub struct CliImplementation {
    search_path: Option<OsString>,
}

impl CliImplementation {
    /// Look the binary up on `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look the binary up on an explicit search path instead of `PATH`.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    async fn locate(&self) -> Result<PathBuf, BackendError> {
        match &self.search_path {
            Some(path) => find_binary_in(path).await,
            None => find_binary().await,
        }
    }
}

#[async_trait]
impl Implementation for CliImplementation {
    fn name(&self) -> &str {
        "cli"
    }

    fn description(&self) -> &str {
        "Podman CLI wrapper"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn check(&self) -> Result<(), BackendError> {
        self.locate().await.map(|_| ())
    }

    async fn initialize(&self, config: &PodmanConfig) -> Result<Arc<dyn Podman>, BackendError> {
        let binary = self.locate().await?;
        Ok(Arc::new(PodmanCli::new(binary, config.output_format)))
    }
}

/// Find a working podman binary on `PATH`.
pub async fn find_binary() -> Result<PathBuf, BackendError> {
    let path = std::env::var_os("PATH").unwrap_or_default();
    find_binary_in(&path).await
}

/// Find a working podman binary on `search_path`.
///
/// A candidate must exist and exit successfully when run with `version`.
pub async fn find_binary_in(search_path: &OsStr) -> Result<PathBuf, BackendError> {
    for name in BINARY_CANDIDATES {
        let Some(candidate) = lookup(name, search_path) else {
            continue;
        };
        trace!("Checking podman candidate {}", candidate.display());
        let status = Command::new(&candidate)
            .arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) if status.success() => {
                debug!("Using podman binary {}", candidate.display());
                return Ok(candidate);
            }
            Ok(status) => debug!("{} version exited with {}", candidate.display(), status),
            Err(e) => debug!("{} could not be run: {}", candidate.display(), e),
        }
    }
    Err(BackendError::BinaryNotFound)
}

fn lookup(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// A bound podman binary.
#[derive(Debug, Clone)]
pub struct PodmanCli {
    binary: PathBuf,
    output_format: OutputFormat,
}

impl PodmanCli {
    pub fn new(binary: impl Into<PathBuf>, output_format: OutputFormat) -> Self {
        Self {
            binary: binary.into(),
            output_format,
        }
    }

    /// Run the binary and return its combined output (stdout, then stderr).
    ///
    /// A non-zero exit becomes [`BackendError::Command`] carrying that output.
    async fn exec(&self, args: &[String]) -> Result<String, BackendError> {
        debug!("podman {}", args.join(" "));
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                BackendError::with_context(
                    format!("failed to run {}", self.binary.display()),
                    e.to_string(),
                )
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(text)
        } else {
            let message = text.trim_end();
            if message.is_empty() {
                Err(BackendError::Command(format!(
                    "podman {} failed: {}",
                    args.first().map(String::as_str).unwrap_or_default(),
                    output.status
                )))
            } else {
                Err(BackendError::Command(message.to_string()))
            }
        }
    }

    fn list_args(&self, base: &[&str]) -> Vec<String> {
        let mut args = strings(base);
        if self.output_format.is_json() {
            args.extend(strings(&["--format", "json"]));
        }
        args
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Arguments for `podman run`, without the image.
pub(crate) fn run_args(ports: &PortMappings, environment: &[String]) -> Vec<String> {
    let mut args = strings(&["run", "--rm", "-d"]);
    if ports.is_empty() {
        args.push("--publish-all".to_string());
    } else {
        args.extend(
            ports
                .iter()
                .map(|(host, container)| format!("--publish={host}:{container}")),
        );
    }
    for entry in environment {
        args.push("--env".to_string());
        args.push(entry.clone());
    }
    args
}

/// Arguments for `podman build`.
pub(crate) fn build_args(container_file: &Path, image_name: Option<&str>) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    if let Some(name) = image_name.filter(|n| !n.is_empty()) {
        args.push("-t".to_string());
        args.push(name.to_string());
    }
    args.push("-f".to_string());
    args.push(container_file.display().to_string());
    args.push(build_context(container_file).display().to_string());
    args
}

#[async_trait]
impl Podman for PodmanCli {
    async fn container_inspect(&self, name: &str) -> Result<String, BackendError> {
        self.exec(&strings(&["inspect", name])).await
    }

    async fn container_list(&self) -> Result<String, BackendError> {
        self.exec(&self.list_args(&["container", "list", "-a"])).await
    }

    async fn container_logs(&self, name: &str) -> Result<String, BackendError> {
        self.exec(&strings(&["logs", name])).await
    }

    async fn container_remove(&self, name: &str) -> Result<String, BackendError> {
        self.exec(&strings(&["container", "rm", name])).await
    }

    async fn container_run(
        &self,
        image: &str,
        ports: &PortMappings,
        environment: &[String],
    ) -> Result<String, BackendError> {
        let base = run_args(ports, environment);
        let (output, _) = with_short_name_retry(image, |image| {
            let mut args = base.clone();
            args.push(image);
            async move { self.exec(&args).await }
        })
        .await?;
        Ok(output)
    }

    async fn container_stop(&self, name: &str) -> Result<String, BackendError> {
        self.exec(&strings(&["container", "stop", name])).await
    }

    async fn image_build(
        &self,
        container_file: &Path,
        image_name: Option<&str>,
    ) -> Result<String, BackendError> {
        self.exec(&build_args(container_file, image_name)).await
    }

    async fn image_list(&self) -> Result<String, BackendError> {
        self.exec(&self.list_args(&["images", "--digests"])).await
    }

    async fn image_pull(&self, image: &str) -> Result<String, BackendError> {
        let (output, pulled) = with_short_name_retry(image, |image| async move {
            self.exec(&strings(&["image", "pull", &image])).await
        })
        .await?;
        Ok(format!("{output}\n{pulled} pulled successfully"))
    }

    async fn image_push(&self, image: &str) -> Result<String, BackendError> {
        let output = self.exec(&strings(&["image", "push", image])).await?;
        Ok(format!("{output}\n{image} pushed successfully"))
    }

    async fn image_remove(&self, image: &str) -> Result<String, BackendError> {
        self.exec(&strings(&["image", "rm", image])).await
    }

    async fn network_list(&self) -> Result<String, BackendError> {
        self.exec(&self.list_args(&["network", "ls"])).await
    }

    async fn volume_list(&self) -> Result<String, BackendError> {
        self.exec(&self.list_args(&["volume", "ls"])).await
    }
}
