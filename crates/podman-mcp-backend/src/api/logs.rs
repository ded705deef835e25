//! Container log collection.
//!
//! The engine multiplexes stdout and stderr into one body of frames, each
//! with an 8-byte header `[stream, 0, 0, 0, len (u32 BE)]`. Containers with
//! a TTY send raw bytes instead; those are treated as stdout.

use std::fmt::Display;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::time::timeout;

use crate::error::BackendError;

/// Deadline for draining a log stream.
pub const LOGS_TIMEOUT: Duration = Duration::from_secs(30);

const HEADER_LEN: usize = 8;
const STDERR: u8 = 2;

/// Log output split by stream.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Demuxed {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Demuxed {
    /// stdout, then a newline and stderr when there is any.
    pub fn combined(&self) -> String {
        let mut out = String::from_utf8_lossy(&self.stdout).into_owned();
        if !self.stderr.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&String::from_utf8_lossy(&self.stderr));
        }
        out
    }
}

fn is_header(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_LEN && bytes[0] <= STDERR && bytes[1..4] == [0, 0, 0]
}

/// Split a multiplexed log body into its streams.
pub fn demux(data: &[u8]) -> Demuxed {
    let mut out = Demuxed::default();
    if !is_header(data) {
        out.stdout.extend_from_slice(data);
        return out;
    }

    let mut pos = 0;
    while pos < data.len() {
        let rest = &data[pos..];
        if !is_header(rest) {
            // trailing bytes that are not a frame
            out.stdout.extend_from_slice(rest);
            break;
        }
        let len = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let end = (HEADER_LEN + len).min(rest.len());
        let payload = &rest[HEADER_LEN..end];
        if rest[0] == STDERR {
            out.stderr.extend_from_slice(payload);
        } else {
            out.stdout.extend_from_slice(payload);
        }
        pos += end;
    }
    out
}

/// Drain `body` to completion within `deadline` and demultiplex it.
///
/// A stream still open at the deadline is an error; partial output is
/// discarded.
pub async fn collect<S, E>(body: S, deadline: Duration) -> Result<Demuxed, BackendError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let drained = timeout(deadline, async move {
        let mut body = body;
        let mut data = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| BackendError::connection(e.to_string()))?;
            data.extend_from_slice(&chunk);
        }
        Ok::<_, BackendError>(data)
    })
    .await
    .map_err(|_| BackendError::LogsTimeout)??;

    Ok(demux(&drained))
}
