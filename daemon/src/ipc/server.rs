//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of loop
//! events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::detection::{DetectionHandle, LoopClosed, Snapshot};
use crate::events::LoopEvent;

use super::protocol::{
    read_frame, validate_interval, write_frame, DaemonStatus, Notification, Request, Response,
};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    context: Arc<ClientContext>,
    shutdown_tx: broadcast::Sender<()>,
}

/// What every client handler needs
struct ClientContext {
    detection: DetectionHandle,
    events: broadcast::Sender<LoopEvent>,
    start_time: Instant,
}

/// A parsed request, or why a frame could not be parsed
type Incoming = std::result::Result<Request, String>;

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(
        socket_path: &Path,
        detection: DetectionHandle,
        events: broadcast::Sender<LoopEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            context: Arc::new(ClientContext {
                detection,
                events,
                start_time: Instant::now(),
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = Arc::clone(&self.context);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, context) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    ///
    /// Requests are read on a separate task so pushed notifications never
    /// interrupt a half-read frame.
    async fn handle_client(stream: UnixStream, context: Arc<ClientContext>) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let read_task = tokio::spawn(Self::read_requests(reader, request_tx));
        let mut events: Option<broadcast::Receiver<LoopEvent>> = None;

        let result = loop {
            tokio::select! {
                incoming = request_rx.recv() => {
                    let Some(incoming) = incoming else {
                        debug!("client disconnected");
                        break Ok(());
                    };

                    let response = match incoming {
                        Ok(request) => {
                            debug!(?request, "received request");
                            if request == Request::Subscribe && events.is_none() {
                                events = Some(context.events.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            Self::process_request(request, &context).await
                        }
                        Err(reason) => Response::error("bad_request", reason),
                    };

                    if let Err(e) = write_frame(&mut writer, &response).await {
                        break Err(e).context("failed to send response");
                    }
                }
                event = next_event(&mut events) => {
                    let Some(event) = event else {
                        events = None;
                        continue;
                    };
                    let notification = Notification::Event { event };
                    if let Err(e) = write_frame(&mut writer, &notification).await {
                        break Err(e).context("failed to send notification");
                    }
                }
            }
        };

        read_task.abort();
        result
    }

    /// Read frames until the client goes away
    async fn read_requests(mut reader: OwnedReadHalf, requests: mpsc::Sender<Incoming>) {
        loop {
            let body = match read_frame(&mut reader).await {
                Ok(Some(body)) => body,
                Ok(None) => return,
                Err(e) => {
                    warn!(?e, "failed to read request, disconnecting");
                    return;
                }
            };

            let incoming = serde_json::from_slice::<Request>(&body)
                .map_err(|e| format!("failed to parse request: {}", e));
            if requests.send(incoming).await.is_err() {
                return;
            }
        }
    }

    /// Process a request and return a response
    async fn process_request(request: Request, context: &ClientContext) -> Response {
        let detection = &context.detection;
        let snapshot = match request {
            Request::Ping => return Response::Pong,
            Request::Subscribe => return Response::Subscribed,
            Request::GetStatus => detection.snapshot().await,
            Request::SetCamera { on } => {
                info!(on, "camera toggled via IPC");
                detection.set_camera(on).await
            }
            Request::SetDetecting { on } => {
                info!(on, "detection toggled via IPC");
                detection.set_detecting(on).await
            }
            Request::ToggleDetection => detection.toggle_detection().await,
            Request::SetInterval { interval_ms } => match validate_interval(interval_ms) {
                Ok(interval) => detection.set_interval(interval).await,
                Err(response) => return response,
            },
        };

        Self::status_response(snapshot, context)
    }

    fn status_response(
        snapshot: std::result::Result<Snapshot, LoopClosed>,
        context: &ClientContext,
    ) -> Response {
        match snapshot {
            Ok(snapshot) => Response::Status(DaemonStatus::new(
                snapshot,
                context.start_time.elapsed().as_secs(),
            )),
            Err(e) => Response::error("loop_unavailable", e.to_string()),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Next event for a subscribed client; pending while not subscribed
async fn next_event(events: &mut Option<broadcast::Receiver<LoopEvent>>) -> Option<LoopEvent> {
    let Some(rx) = events.as_mut() else {
        return std::future::pending().await;
    };

    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
