//! MCP over Streamable HTTP on a loopback socket.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use common::recording_server;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use podman_mcp_server::http::{self, MCP_PATH};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;

const STEP_TIMEOUT: Duration = Duration::from_secs(10);

struct Endpoint {
    addr: SocketAddr,
    session: Option<String>,
    _stop: oneshot::Sender<()>,
}

impl Endpoint {
    async fn start() -> (Self, std::sync::Arc<common::RecordingPodman>) {
        let (server, backend) = recording_server();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        tokio::spawn(http::serve(listener, server, async {
            let _ = stopped.await;
        }));

        let endpoint = Self {
            addr,
            session: None,
            _stop: stop,
        };
        (endpoint, backend)
    }

    async fn send(&self, method: &str, path: &str, body: Option<Value>) -> Response<Incoming> {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .unwrap();
        tokio::spawn(conn);

        let mut request = Request::builder()
            .method(method)
            .uri(path)
            .header("host", self.addr.to_string())
            .header("content-type", "application/json")
            .header("accept", "application/json, text/event-stream");
        if let Some(session) = &self.session {
            request = request.header("mcp-session-id", session);
        }
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let request = request.body(Full::new(Bytes::from(body))).unwrap();

        timeout(STEP_TIMEOUT, sender.send_request(request))
            .await
            .expect("timed out waiting for server")
            .unwrap()
    }

    /// Post a JSON-RPC request and read the event stream until `needle` shows up.
    async fn call(&self, id: u64, method: &str, params: Value, needle: &str) -> (Response<()>, String) {
        let response = self
            .send(
                "POST",
                MCP_PATH,
                Some(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})),
            )
            .await;
        let (parts, mut body) = response.into_parts();
        assert_eq!(parts.status, StatusCode::OK);

        let mut text = String::new();
        while !text.contains(needle) {
            let frame = timeout(STEP_TIMEOUT, body.frame())
                .await
                .expect("timed out reading event stream")
                .expect("event stream ended early")
                .unwrap();
            if let Some(data) = frame.data_ref() {
                text.push_str(&String::from_utf8_lossy(data));
            }
        }
        (Response::from_parts(parts, ()), text)
    }

    async fn initialize(&mut self) -> String {
        let (response, text) = self
            .call(
                1,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "0.0.0"}
                }),
                "serverInfo",
            )
            .await;
        self.session = response
            .headers()
            .get("mcp-session-id")
            .map(|v| v.to_str().unwrap().to_string());
        assert!(self.session.is_some(), "missing session id");

        let ack = self
            .send(
                "POST",
                MCP_PATH,
                Some(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})),
            )
            .await;
        assert_eq!(ack.status(), StatusCode::ACCEPTED);
        text
    }
}

#[tokio::test]
async fn test_initialize_over_http() {
    let (mut endpoint, _) = Endpoint::start().await;

    let text = endpoint.initialize().await;

    assert!(text.contains("podman-mcp-server"));
}

#[tokio::test]
async fn test_tools_over_http() {
    let (mut endpoint, backend) = Endpoint::start().await;
    endpoint.initialize().await;

    let (_, tools) = endpoint
        .call(2, "tools/list", json!({}), "volume_list")
        .await;
    assert!(tools.contains("container_run"));

    let (_, result) = endpoint
        .call(
            3,
            "tools/call",
            json!({"name": "container_list", "arguments": {}}),
            "\"id\":3",
        )
        .await;
    assert!(result.contains("container list"));
    assert_eq!(backend.calls(), vec!["container list"]);
}

#[tokio::test]
async fn test_request_without_session_is_rejected() {
    let (endpoint, backend) = Endpoint::start().await;

    let response = endpoint
        .send(
            "POST",
            MCP_PATH,
            Some(json!({"jsonrpc": "2.0", "id": 7, "method": "tools/list", "params": {}})),
        )
        .await;

    assert!(response.status().is_client_error());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_other_paths_are_not_found() {
    let (endpoint, _) = Endpoint::start().await;

    let response = endpoint.send("GET", "/health", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
