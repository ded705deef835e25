//! Minimal libpod HTTP client.
//!
//! Clones share one keep-alive HTTP/1.1 connection. A request takes it when
//! it is idle and hands it back once the response head arrives. A request
//! that finds it busy, closed or missing opens a new one, which then becomes
//! the shared connection.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1::SendRequest;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::BackendError;
use crate::socket::Endpoint;

/// Deadline for a single request/response exchange.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything but RFC 3986 unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a path segment or query value.
pub(crate) fn encode(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Request body.
pub(crate) enum Payload {
    Empty,
    Json(Vec<u8>),
    Tar(Vec<u8>),
}

impl Payload {
    fn into_parts(self) -> (Option<&'static str>, Bytes) {
        match self {
            Self::Empty => (None, Bytes::new()),
            Self::Json(body) => (Some("application/json"), Bytes::from(body)),
            Self::Tar(body) => (Some("application/x-tar"), Bytes::from(body)),
        }
    }
}

/// Engine error body: `{"cause": .., "message": .., "response": ..}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    cause: String,
    #[serde(default, alias = "Message")]
    message: String,
}

type Sender = SendRequest<Full<Bytes>>;

/// HTTP client bound to one engine endpoint.
#[derive(Clone)]
pub struct ApiClient {
    endpoint: Endpoint,
    timeout: Duration,
    idle: Arc<Mutex<Option<Sender>>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            timeout: REQUEST_TIMEOUT,
            idle: Arc::new(Mutex::new(None)),
        }
    }

    /// Parse `uri` and verify the service answers `GET /_ping`.
    pub async fn connect(uri: &str) -> Result<Self, BackendError> {
        let client = Self::new(Endpoint::parse(uri)?);
        client.request(Method::GET, "/_ping", Payload::Empty).await?;
        debug!("Connected to podman service at {}", client.endpoint);
        Ok(client)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send a request and return the response head with a streaming body.
    ///
    /// Error statuses are decoded into [`BackendError::Api`].
    pub(crate) async fn open(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<Response<Incoming>, BackendError> {
        let response = timeout(self.timeout, self.send(method, path, payload))
            .await
            .map_err(|_| {
                BackendError::connection(format!("request to {} timed out", self.endpoint))
            })??;

        if is_success(response.status()) {
            return Ok(response);
        }

        let status = response.status();
        let body = timeout(self.timeout, response.into_body().collect())
            .await
            .map_err(|_| BackendError::connection("timed out reading error response"))??
            .to_bytes();
        Err(decode_error(status, &body))
    }

    /// Send a request and collect the whole response body.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<Bytes, BackendError> {
        let response = self.open(method, path, payload).await?;
        let body = timeout(self.timeout, response.into_body().collect())
            .await
            .map_err(|_| BackendError::connection("timed out reading response"))??
            .to_bytes();
        trace!("{} bytes from {}", body.len(), path);
        Ok(body)
    }

    /// `GET` a JSON document.
    pub(crate) async fn get_json(&self, path: &str) -> Result<Value, BackendError> {
        let body = self.request(Method::GET, path, Payload::Empty).await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<Response<Incoming>, BackendError> {
        debug!("{} {}", method, path);
        let (content_type, body) = payload.into_parts();
        let build = || {
            let mut builder = Request::builder()
                .method(method.clone())
                .uri(path)
                .header(HOST, "d");
            if let Some(content_type) = content_type {
                builder = builder.header(CONTENT_TYPE, content_type);
            }
            builder.body(Full::new(body.clone()))
        };

        let pooled = self.idle.lock().take().filter(|sender| sender.is_ready());
        let (sender, response) = match pooled {
            Some(mut sender) => match sender.send_request(build()?).await {
                Ok(response) => (sender, response),
                Err(e) if e.is_canceled() || e.is_closed() || sender.is_closed() => {
                    trace!("Shared connection to {} failed ({}), reconnecting", self.endpoint, e);
                    let mut sender = self.handshake().await?;
                    let response = sender.send_request(build()?).await?;
                    (sender, response)
                }
                Err(e) => return Err(e.into()),
            },
            None => {
                let mut sender = self.handshake().await?;
                let response = sender.send_request(build()?).await?;
                (sender, response)
            }
        };

        if !sender.is_closed() {
            *self.idle.lock() = Some(sender);
        }
        Ok(response)
    }

    async fn handshake(&self) -> Result<Sender, BackendError> {
        let io = self.endpoint.connect().await.map_err(|e| {
            BackendError::connection(format!("failed to connect to {}: {}", self.endpoint, e))
        })?;

        let (sender, connection) =
            hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(io)).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                trace!("Podman API connection closed: {}", e);
            }
        });
        trace!("Opened connection to {}", self.endpoint);
        Ok(sender)
    }
}

/// 2xx, plus 304 which libpod uses for "already started/stopped".
fn is_success(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::NOT_MODIFIED
}

fn decode_error(status: StatusCode, body: &[u8]) -> BackendError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = if !parsed.message.is_empty() {
        parsed.message
    } else if !parsed.cause.is_empty() {
        parsed.cause
    } else {
        let text = String::from_utf8_lossy(body).trim().to_string();
        if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        } else {
            text
        }
    };
    BackendError::api(status.as_u16(), message)
}

/// Parse a stream of JSON objects (newline-delimited or concatenated).
///
/// Any object with a non-empty `error` field fails the whole stream.
pub(crate) fn parse_stream(status: u16, body: &[u8]) -> Result<Vec<Value>, BackendError> {
    let mut values = Vec::new();
    for value in serde_json::Deserializer::from_slice(body).into_iter::<Value>() {
        let value = value?;
        if let Some(error) = value
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
        {
            return Err(BackendError::api(status, error));
        }
        values.push(value);
    }
    Ok(values)
}
