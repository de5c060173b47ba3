//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::detection::{Snapshot, MAX_INTERVAL, MIN_INTERVAL};
use crate::events::LoopEvent;

/// Largest accepted message body
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Turn the camera on or off
    SetCamera { on: bool },

    /// Turn detection on or off
    SetDetecting { on: bool },

    /// Flip detection
    ToggleDetection,

    /// Change the time between detection ticks
    SetInterval { interval_ms: u64 },

    /// Ping to check connectivity
    Ping,

    /// Subscribe to loop event notifications
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Loop event occurred
    Event { event: LoopEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Uptime in seconds
    pub uptime_secs: u64,

    /// Detection loop state
    #[serde(flatten)]
    pub detection: Snapshot,
}

impl DaemonStatus {
    pub fn new(detection: Snapshot, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs,
            detection,
        }
    }
}

/// Check a client-supplied interval against the allowed range
pub fn validate_interval(interval_ms: u64) -> Result<Duration, Response> {
    let interval = Duration::from_millis(interval_ms);
    if interval < MIN_INTERVAL || interval > MAX_INTERVAL {
        return Err(Response::error(
            "invalid_interval",
            format!(
                "interval must be between {} and {} ms",
                MIN_INTERVAL.as_millis(),
                MAX_INTERVAL.as_millis()
            ),
        ));
    }
    Ok(interval)
}

/// Read one length-prefixed frame; `None` on clean end of stream
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {} bytes", len),
        ));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Write one message as a length-prefixed JSON frame
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(msg)?;
    let len = (body.len() as u32).to_le_bytes();

    writer.write_all(&len).await?;
    writer.write_all(&body).await?;
    writer.flush().await
}
