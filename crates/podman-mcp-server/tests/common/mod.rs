//! Common test utilities for podman-mcp-server integration tests.
//!
//! Provides a recording backend so tool behaviour can be checked without a
//! podman engine.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use podman_mcp_backend::{BackendError, Podman, PodmanClient, PortMappings};
use podman_mcp_server::PodmanServer;
use rmcp::model::CallToolResult;

/// Backend that records each call and answers with a description of it.
#[derive(Default)]
pub struct RecordingPodman {
    calls: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl RecordingPodman {
    /// Backend whose every operation fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, call: String) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(call.clone());
        match &self.failure {
            Some(message) => Err(BackendError::Command(message.clone())),
            None => Ok(call),
        }
    }
}

#[async_trait]
impl Podman for RecordingPodman {
    async fn container_inspect(&self, name: &str) -> Result<String, BackendError> {
        self.answer(format!("inspect {name}"))
    }

    async fn container_list(&self) -> Result<String, BackendError> {
        self.answer("container list".to_string())
    }

    async fn container_logs(&self, name: &str) -> Result<String, BackendError> {
        self.answer(format!("logs {name}"))
    }

    async fn container_remove(&self, name: &str) -> Result<String, BackendError> {
        self.answer(format!("rm {name}"))
    }

    async fn container_run(
        &self,
        image: &str,
        ports: &PortMappings,
        environment: &[String],
    ) -> Result<String, BackendError> {
        self.answer(format!("run {image} ports={ports:?} env={environment:?}"))
    }

    async fn container_stop(&self, name: &str) -> Result<String, BackendError> {
        self.answer(format!("stop {name}"))
    }

    async fn image_build(
        &self,
        container_file: &Path,
        image_name: Option<&str>,
    ) -> Result<String, BackendError> {
        self.answer(format!(
            "build {} tag={:?}",
            container_file.display(),
            image_name
        ))
    }

    async fn image_list(&self) -> Result<String, BackendError> {
        self.answer("image list".to_string())
    }

    async fn image_pull(&self, image: &str) -> Result<String, BackendError> {
        self.answer(format!("pull {image}"))
    }

    async fn image_push(&self, image: &str) -> Result<String, BackendError> {
        self.answer(format!("push {image}"))
    }

    async fn image_remove(&self, image: &str) -> Result<String, BackendError> {
        self.answer(format!("image rm {image}"))
    }

    async fn network_list(&self) -> Result<String, BackendError> {
        self.answer("network list".to_string())
    }

    async fn volume_list(&self) -> Result<String, BackendError> {
        self.answer("volume list".to_string())
    }
}

/// Server over a recording backend, with the backend for inspection.
pub fn recording_server() -> (PodmanServer, Arc<RecordingPodman>) {
    let backend = Arc::new(RecordingPodman::default());
    let server = PodmanServer::new(PodmanClient::from_backend("recording", backend.clone()));
    (server, backend)
}

/// Server whose backend fails every call with `message`.
pub fn failing_server(message: &str) -> PodmanServer {
    let backend = Arc::new(RecordingPodman::failing(message));
    PodmanServer::new(PodmanClient::from_backend("recording", backend))
}

/// Text of the single content item of a tool result.
pub fn result_text(result: &CallToolResult) -> String {
    assert_eq!(result.content.len(), 1, "expected exactly one content item");
    result.content[0]
        .raw
        .as_text()
        .expect("expected text content")
        .text
        .clone()
}

pub fn is_error(result: &CallToolResult) -> bool {
    result.is_error.unwrap_or(false)
}
