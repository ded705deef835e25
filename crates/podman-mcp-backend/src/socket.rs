//! Podman socket discovery and liveness probing.
//!
//! Discovery only checks that a socket file exists. [`probe`] then speaks
//! just enough HTTP over a raw connection to confirm the endpoint is a live
//! Podman service, without paying for a full client handshake.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};
use url::Url;

use crate::error::BackendError;

/// Environment variable overriding socket discovery.
pub const CONTAINER_HOST_ENV: &str = "CONTAINER_HOST";

/// Environment variable holding the per-user runtime directory.
pub const RUNTIME_DIR_ENV: &str = "XDG_RUNTIME_DIR";

/// Rootful default socket.
pub const ROOTFUL_SOCKET: &str = "/run/podman/podman.sock";

const USER_RUNTIME_ROOT: &str = "/run/user";
const SOCKET_SUFFIX: &str = "podman/podman.sock";

const PING_TIMEOUT: Duration = Duration::from_secs(5);
const PING_REQUEST: &[u8] = b"HEAD /_ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
const PING_BUFFER: usize = 1024;

/// A byte stream to the engine, over TCP or a Unix socket.
pub(crate) trait EngineIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> EngineIo for T {}

/// Parsed engine address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

impl Endpoint {
    /// Parse a `unix://` or `tcp://` URI.
    ///
    /// A `unix` path is percent-decoded, so spaces survive; a `tcp` address
    /// needs an explicit port.
    pub fn parse(uri: &str) -> Result<Self, BackendError> {
        let url = Url::parse(uri)
            .map_err(|e| BackendError::connection(format!("invalid socket URI {uri}: {e}")))?;
        match url.scheme() {
            "unix" => {
                let path = percent_decode_str(url.path()).decode_utf8_lossy();
                if path.is_empty() {
                    return Err(BackendError::connection(format!(
                        "missing socket path in {uri}"
                    )));
                }
                Ok(Self::Unix(PathBuf::from(path.as_ref())))
            }
            "tcp" => match (url.host_str().filter(|h| !h.is_empty()), url.port()) {
                (Some(host), Some(port)) => Ok(Self::Tcp(format!("{host}:{port}"))),
                (None, _) => Err(BackendError::connection(format!("missing host in {uri}"))),
                (Some(_), None) => {
                    Err(BackendError::connection(format!("missing port in {uri}")))
                }
            },
            other => Err(BackendError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Open a fresh stream to the endpoint.
    pub(crate) async fn connect(&self) -> std::io::Result<Box<dyn EngineIo>> {
        match self {
            Self::Tcp(address) => Ok(Box::new(TcpStream::connect(address.as_str()).await?)),
            #[cfg(unix)]
            Self::Unix(path) => Ok(Box::new(tokio::net::UnixStream::connect(path).await?)),
            #[cfg(not(unix))]
            Self::Unix(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "unix sockets are not supported on this platform",
            )),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
            Self::Tcp(address) => write!(f, "tcp://{}", address),
        }
    }
}

/// Inputs to socket discovery.
///
/// [`SocketDiscovery::from_env`] snapshots the process environment; tests
/// build one by hand to point at temporary directories.
#[derive(Debug, Clone)]
pub struct SocketDiscovery {
    pub container_host: Option<String>,
    pub runtime_dir: Option<PathBuf>,
    pub uid: Option<u32>,
    pub rootful_socket: PathBuf,
    pub user_runtime_root: PathBuf,
}

impl SocketDiscovery {
    /// Read the discovery inputs from the current environment.
    pub fn from_env() -> Self {
        Self {
            container_host: non_empty_var(CONTAINER_HOST_ENV),
            runtime_dir: non_empty_var(RUNTIME_DIR_ENV).map(PathBuf::from),
            uid: current_uid(),
            rootful_socket: PathBuf::from(ROOTFUL_SOCKET),
            user_runtime_root: PathBuf::from(USER_RUNTIME_ROOT),
        }
    }

    /// Well-known socket paths in the order they are checked.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.rootful_socket.clone()];
        if let Some(dir) = &self.runtime_dir {
            paths.push(dir.join(SOCKET_SUFFIX));
        }
        if let Some(uid) = self.uid {
            paths.push(
                self.user_runtime_root
                    .join(uid.to_string())
                    .join(SOCKET_SUFFIX),
            );
        }
        paths
    }

    /// Return the URI of the first socket found.
    ///
    /// A `CONTAINER_HOST` override is returned verbatim once it passes a
    /// syntax check, whether or not anything listens there.
    pub fn detect(&self) -> Result<String, BackendError> {
        if let Some(host) = &self.container_host {
            Url::parse(host)
                .map_err(|e| BackendError::invalid_container_host(host, e.to_string()))?;
            debug!("Using {} override: {}", CONTAINER_HOST_ENV, host);
            return Ok(host.clone());
        }

        for path in self.candidates() {
            trace!("Checking for podman socket at {}", path.display());
            if path.exists() {
                debug!("Found podman socket at {}", path.display());
                return Ok(format!("unix://{}", path.display()));
            }
        }

        Err(BackendError::SocketNotFound)
    }
}

/// Locate a Podman socket using the current environment.
pub fn detect() -> Result<String, BackendError> {
    SocketDiscovery::from_env().detect()
}

/// Check that the endpoint at `uri` answers `HEAD /_ping` with `200 OK`.
pub async fn probe(uri: &str) -> Result<(), BackendError> {
    let endpoint = Endpoint::parse(uri)?;
    probe_endpoint(&endpoint).await
}

pub(crate) async fn probe_endpoint(endpoint: &Endpoint) -> Result<(), BackendError> {
    const CONNECT: &str = "failed to connect to socket";
    const SEND: &str = "failed to send ping request";
    const READ: &str = "failed to read ping response";

    let mut stream = timeout(PING_TIMEOUT, endpoint.connect())
        .await
        .map_err(|_| BackendError::ping(CONNECT, "timed out"))?
        .map_err(|e| BackendError::ping(CONNECT, e.to_string()))?;

    timeout(PING_TIMEOUT, stream.write_all(PING_REQUEST))
        .await
        .map_err(|_| BackendError::ping(SEND, "timed out"))?
        .map_err(|e| BackendError::ping(SEND, e.to_string()))?;

    let response = timeout(PING_TIMEOUT, read_head(&mut stream))
        .await
        .map_err(|_| BackendError::ping(READ, "timed out"))?
        .map_err(|e| BackendError::ping(READ, e.to_string()))?;

    if response.contains("200 OK") {
        debug!("Podman socket {} is live", endpoint);
        Ok(())
    } else {
        Err(BackendError::ping("unexpected ping response", response))
    }
}

async fn read_head(stream: &mut Box<dyn EngineIo>) -> std::io::Result<String> {
    let mut buf = vec![0u8; PING_BUFFER];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed before response",
        ));
    }
    Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(unix)]
fn current_uid() -> Option<u32> {
    Some(nix::unistd::getuid().as_raw())
}

#[cfg(not(unix))]
fn current_uid() -> Option<u32> {
    None
}
