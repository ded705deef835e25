//! Backend that talks to the Podman REST API (libpod) over a local socket.
//!
//! The socket is located with [`crate::socket`], checked with a raw ping
//! during selection, and connected to lazily on first use.

mod client;
pub mod format;
pub mod logs;
pub mod types;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use http_body_util::BodyExt;
use podman_mcp_config::{OutputFormat, PodmanConfig};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info};

pub use client::{ApiClient, REQUEST_TIMEOUT};

use crate::error::BackendError;
use crate::retry::with_short_name_retry;
use crate::socket::{self, SocketDiscovery};
use crate::traits::{build_context, Implementation, Podman, PortMappings};
use client::{encode, parse_stream, Payload};
use types::{
    records, report, volume_entries, ContainerSummary, CreateResponse, ImageRemoveReport,
    ImageSummary, NetworkSummary, RemoveReport, VolumeSummary,
};

/// Where the backend finds its socket.
#[derive(Debug, Clone, Default)]
pub enum Locator {
    /// Discover from the process environment at call time.
    #[default]
    Environment,
    /// Discover with explicit inputs.
    Discovery(SocketDiscovery),
    /// Use this URI as is.
    Uri(String),
}

impl Locator {
    pub fn resolve(&self) -> Result<String, BackendError> {
        match self {
            Self::Environment => socket::detect(),
            Self::Discovery(discovery) => discovery.detect(),
            Self::Uri(uri) => Ok(uri.clone()),
        }
    }
}

/// Registry entry for the REST API backend.
#[derive(Debug, Clone, Default)]
pub struct ApiImplementation {
    locator: Locator,
}

impl ApiImplementation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locator(locator: Locator) -> Self {
        Self { locator }
    }
}

#[async_trait]
impl Implementation for ApiImplementation {
    fn name(&self) -> &str {
        "api"
    }

    fn description(&self) -> &str {
        "Podman REST API via Unix socket"
    }

    fn priority(&self) -> i32 {
        100
    }

    async fn check(&self) -> Result<(), BackendError> {
        let uri = self.locator.resolve()?;
        socket::probe(&uri).await
    }

    async fn initialize(&self, config: &PodmanConfig) -> Result<Arc<dyn Podman>, BackendError> {
        let api = PodmanApi::new(self.locator.clone(), config.output_format);
        api.client().await?;
        Ok(Arc::new(api))
    }
}

/// Podman REST API backend.
///
/// The connection is established on first use and then reused for the
/// lifetime of the instance.
pub struct PodmanApi {
    locator: Locator,
    output_format: OutputFormat,
    logs_timeout: Duration,
    client: OnceCell<ApiClient>,
}

impl PodmanApi {
    pub fn new(locator: Locator, output_format: OutputFormat) -> Self {
        Self {
            locator,
            output_format,
            logs_timeout: logs::LOGS_TIMEOUT,
            client: OnceCell::new(),
        }
    }

    /// Backend bound to a fixed socket URI.
    pub fn with_uri(uri: impl Into<String>, output_format: OutputFormat) -> Self {
        Self::new(Locator::Uri(uri.into()), output_format)
    }

    pub fn with_logs_timeout(mut self, timeout: Duration) -> Self {
        self.logs_timeout = timeout;
        self
    }

    /// The shared client, connecting on first call.
    async fn client(&self) -> Result<&ApiClient, BackendError> {
        self.client
            .get_or_try_init(|| async {
                let uri = self
                    .locator
                    .resolve()
                    .map_err(|e| BackendError::with_context("failed to detect socket", e.to_string()))?;
                let client = ApiClient::connect(&uri).await.map_err(|e| {
                    BackendError::with_context("failed to connect to socket", e.to_string())
                })?;
                info!("Connected to podman API at {}", client.endpoint());
                Ok::<_, BackendError>(client)
            })
            .await
    }

    async fn list(&self, path: &str) -> Result<Value, BackendError> {
        self.client().await?.get_json(path).await
    }

    /// Fetch and drain the log stream under one overall deadline.
    async fn fetch_logs(&self, path: &str) -> Result<logs::Demuxed, BackendError> {
        let deadline = Instant::now() + self.logs_timeout;
        let client = self.client().await?;
        let response = timeout_at(deadline, client.open(Method::GET, path, Payload::Empty))
            .await
            .map_err(|_| BackendError::LogsTimeout)??;
        let body = Box::pin(response.into_body().into_data_stream());
        logs::collect(body, deadline.saturating_duration_since(Instant::now())).await
    }

    async fn pull(&self, image: &str) -> Result<Vec<String>, BackendError> {
        let client = self.client().await?;
        let path = format!(
            "/libpod/images/pull?reference={}&quiet=true",
            encode(image)
        );
        let body = client.request(Method::POST, &path, Payload::Empty).await?;
        let mut images = Vec::new();
        for value in parse_stream(200, &body)? {
            if let Some(ids) = value.get("images").and_then(Value::as_array) {
                images.extend(ids.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }
        Ok(images)
    }

    async fn create(
        &self,
        image: &str,
        ports: &PortMappings,
        environment: &[String],
    ) -> Result<String, BackendError> {
        let spec = container_spec(image, ports, environment);
        let body = self
            .client()
            .await?
            .request(
                Method::POST,
                "/libpod/containers/create",
                Payload::Json(serde_json::to_vec(&spec)?),
            )
            .await?;
        let created: CreateResponse = serde_json::from_slice(&body)?;
        Ok(created.id)
    }
}

/// Container creation spec with `--rm` semantics.
///
/// Without port mappings every exposed port is published. Environment
/// entries lacking `=` are dropped.
fn container_spec(image: &str, ports: &PortMappings, environment: &[String]) -> Value {
    let mut spec = json!({
        "image": image,
        "remove": true,
    });
    if ports.is_empty() {
        spec["publish_image_ports"] = json!(true);
    } else {
        spec["portmappings"] = ports
            .iter()
            .map(|(host, container)| {
                json!({"host_port": host, "container_port": container, "protocol": "tcp"})
            })
            .collect();
    }
    let env: HashMap<&str, &str> = environment
        .iter()
        .filter_map(|entry| entry.split_once('='))
        .collect();
    if !env.is_empty() {
        spec["env"] = json!(env);
    }
    spec
}

/// Tar the build context in memory.
async fn archive(context: &Path) -> Result<Vec<u8>, BackendError> {
    let context = context.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut builder = tar::Builder::new(Vec::new());
        builder.append_dir_all(".", &context)?;
        builder.into_inner()
    })
    .await
    .map_err(|e| BackendError::with_context("build context", e.to_string()))?
    .map_err(|e| BackendError::with_context("failed to archive build context", e.to_string()))
}

fn pretty(value: &Value) -> Result<String, BackendError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[async_trait]
impl Podman for PodmanApi {
    async fn container_inspect(&self, name: &str) -> Result<String, BackendError> {
        let path = format!("/libpod/containers/{}/json", encode(name));
        pretty(&self.list(&path).await?)
    }

    async fn container_list(&self) -> Result<String, BackendError> {
        let value = self.list("/libpod/containers/json?all=true").await?;
        if self.output_format.is_json() {
            return pretty(&value);
        }
        let containers: Vec<ContainerSummary> = records(value)?;
        Ok(format::container_table(&containers, Utc::now()))
    }

    async fn container_logs(&self, name: &str) -> Result<String, BackendError> {
        let path = format!(
            "/libpod/containers/{}/logs?stdout=true&stderr=true",
            encode(name)
        );
        match self.fetch_logs(&path).await {
            Ok(out) => Ok(out.combined()),
            Err(BackendError::LogsTimeout) => Err(BackendError::LogsTimeout),
            Err(e) => Err(BackendError::with_context(
                "failed to get container logs",
                e.to_string(),
            )),
        }
    }

    async fn container_remove(&self, name: &str) -> Result<String, BackendError> {
        let path = format!("/libpod/containers/{}", encode(name));
        let body = self
            .client()
            .await?
            .request(Method::DELETE, &path, Payload::Empty)
            .await?;
        let reports: Vec<RemoveReport> = report(&body)?;
        if let Some(report) = reports.into_iter().find(|r| !r.err.is_empty()) {
            return Err(BackendError::api(500, report.err));
        }
        Ok(name.to_string())
    }

    async fn container_run(
        &self,
        image: &str,
        ports: &PortMappings,
        environment: &[String],
    ) -> Result<String, BackendError> {
        if let Err(e) = with_short_name_retry(image, |image| async move { self.pull(&image).await }).await
        {
            debug!("Pre-run pull of '{}' failed: {}", image, e);
        }

        let (id, _) = with_short_name_retry(image, |image| async move {
            self.create(&image, ports, environment).await
        })
        .await?;

        let path = format!("/libpod/containers/{}/start", encode(&id));
        self.client()
            .await?
            .request(Method::POST, &path, Payload::Empty)
            .await?;
        Ok(id)
    }

    async fn container_stop(&self, name: &str) -> Result<String, BackendError> {
        let path = format!("/libpod/containers/{}/stop", encode(name));
        self.client()
            .await?
            .request(Method::POST, &path, Payload::Empty)
            .await?;
        Ok(name.to_string())
    }

    async fn image_build(
        &self,
        container_file: &Path,
        image_name: Option<&str>,
    ) -> Result<String, BackendError> {
        let context = build_context(container_file);
        let dockerfile = container_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Containerfile".to_string());

        let mut path = format!("/libpod/build?dockerfile={}", encode(&dockerfile));
        if let Some(name) = image_name.filter(|n| !n.is_empty()) {
            path.push_str(&format!("&t={}", encode(name)));
        }

        let tarball = archive(&context).await?;
        let body = self
            .client()
            .await?
            .request(Method::POST, &path, Payload::Tar(tarball))
            .await?;

        let id = parse_stream(200, &body)?
            .iter()
            .filter_map(|v| v.get("stream").and_then(Value::as_str))
            .flat_map(str::lines)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(str::to_string)
            .unwrap_or_default();
        Ok(id)
    }

    async fn image_list(&self) -> Result<String, BackendError> {
        let value = self.list("/libpod/images/json?all=true").await?;
        if self.output_format.is_json() {
            return pretty(&value);
        }
        let images: Vec<ImageSummary> = records(value)?;
        Ok(format::image_table(&images, Utc::now()))
    }

    async fn image_pull(&self, image: &str) -> Result<String, BackendError> {
        let (images, pulled) =
            with_short_name_retry(image, |image| async move { self.pull(&image).await }).await?;
        let mut out = images.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("{pulled} pulled successfully"));
        Ok(out)
    }

    async fn image_push(&self, image: &str) -> Result<String, BackendError> {
        let path = format!(
            "/libpod/images/{}/push?destination={}&quiet=true",
            encode(image),
            encode(image)
        );
        let body = self
            .client()
            .await?
            .request(Method::POST, &path, Payload::Empty)
            .await?;
        parse_stream(200, &body)?;
        Ok(format!("{image} pushed successfully"))
    }

    async fn image_remove(&self, image: &str) -> Result<String, BackendError> {
        let path = format!("/libpod/images/remove?images={}", encode(image));
        let body = self
            .client()
            .await?
            .request(Method::DELETE, &path, Payload::Empty)
            .await?;
        let removed: ImageRemoveReport = report(&body)?;
        if let Some(error) = removed.errors.into_iter().next() {
            return Err(BackendError::api(500, error));
        }
        Ok(removed.deleted.join("\n"))
    }

    async fn network_list(&self) -> Result<String, BackendError> {
        let value = self.list("/libpod/networks/json").await?;
        if self.output_format.is_json() {
            return pretty(&value);
        }
        let networks: Vec<NetworkSummary> = records(value)?;
        Ok(format::network_table(&networks))
    }

    async fn volume_list(&self) -> Result<String, BackendError> {
        let value = volume_entries(self.list("/libpod/volumes/json").await?);
        if self.output_format.is_json() {
            return pretty(&value);
        }
        let volumes: Vec<VolumeSummary> = records(value)?;
        Ok(format::volume_table(&volumes))
    }
}
