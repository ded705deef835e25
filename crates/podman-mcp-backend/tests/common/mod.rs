//! Common test utilities for podman-mcp-backend integration tests.
//!
//! The REST backend is exercised against a `wiremock` server reached over
//! `tcp://`; the CLI backend against shell scripts standing in for the
//! `podman` binary.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Start a mock engine that answers both ping forms.
pub async fn mock_engine() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/_ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/_ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;
    server
}

/// `tcp://` URI for a mock server.
pub fn tcp_uri(server: &MockServer) -> String {
    format!("tcp://{}", server.address())
}

/// Engine error body as libpod sends it.
pub fn error_body(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "cause": message,
        "message": message,
        "response": status,
    }))
}

/// One multiplexed log frame.
pub fn log_frame(stream: u8, payload: &str) -> Vec<u8> {
    let mut out = vec![stream, 0, 0, 0];
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload.as_bytes());
    out
}

/// Write an executable `name` into `dir` that records its arguments and
/// then runs `body`.
///
/// Each invocation appends one line (`$*`) to `dir/calls.log`.
#[cfg(unix)]
pub fn fake_binary(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let log = dir.join("calls.log");
    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{}'\n{}\n",
        log.display(),
        body
    );
    let binary = dir.join(name);
    std::fs::write(&binary, script).unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
    binary
}

/// A `podman` that succeeds for every command.
#[cfg(unix)]
pub fn fake_podman(dir: &Path) -> PathBuf {
    fake_binary(dir, "podman", "exit 0")
}

/// Argument lines recorded by [`fake_binary`] scripts, excluding the
/// `version` probe.
pub fn recorded_calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .filter(|line| *line != "version")
        .map(str::to_string)
        .collect()
}
