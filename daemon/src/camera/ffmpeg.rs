//! V4L2 camera backed by an ffmpeg child process
//!
//! ffmpeg streams MJPEG to stdout; a reader task splits the stream and keeps
//! only the newest frame in a watch channel. Dropping the stream kills the
//! child, so the device is released on every exit path.

use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::CameraConfig;

use super::mjpeg::JpegSplitter;
use super::{CameraError, CameraSource, Frame};

const READ_CHUNK: usize = 64 * 1024;

/// Camera that captures from a video device through ffmpeg
pub struct FfmpegCamera {
    config: CameraConfig,
    stream: Option<LiveStream>,
}

/// A running capture process and its frame reader
struct LiveStream {
    child: Child,
    reader: JoinHandle<()>,
    latest: watch::Receiver<Option<Frame>>,
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.reader.abort();
        if let Err(e) = self.child.start_kill() {
            debug!(?e, "capture process already exited");
        }
    }
}

impl FfmpegCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    fn spawn_capture(&self) -> Result<Child, CameraError> {
        Command::new(&self.config.ffmpeg)
            .args(["-loglevel", "error", "-f", "v4l2", "-i"])
            .arg(&self.config.device)
            .args(["-f", "image2pipe", "-vcodec", "mjpeg", "-q:v"])
            .arg(self.config.jpeg_quality.to_string())
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CameraError::Other {
                reason: format!("failed to spawn {}: {}", self.config.ffmpeg.display(), e),
            })
    }
}

#[async_trait]
impl CameraSource for FfmpegCamera {
    async fn start(&mut self) -> Result<(), CameraError> {
        // Restarting replaces any stream that is still open
        self.stop();

        probe_device(&self.config.device).await?;

        let mut child = self.spawn_capture()?;
        let stdout = child.stdout.take().ok_or_else(|| CameraError::Other {
            reason: "capture process stdout not piped".to_string(),
        })?;

        let (frame_tx, mut frame_rx) = watch::channel(None);
        let reader = tokio::spawn(read_frames(stdout, frame_tx));
        let stream = LiveStream {
            child,
            reader,
            latest: frame_rx.clone(),
        };

        match time::timeout(self.config.start_timeout, frame_rx.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                return Err(CameraError::Other {
                    reason: "capture stream ended before the first frame".to_string(),
                });
            }
            Err(_) => {
                return Err(CameraError::Other {
                    reason: format!(
                        "no frame within {}ms",
                        self.config.start_timeout.as_millis()
                    ),
                });
            }
        }

        info!(device = ?self.config.device, "camera started");
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            info!(device = ?self.config.device, "camera stopped");
        }
    }

    fn capture_frame(&mut self) -> Option<Frame> {
        let stream = self.stream.as_ref()?;
        if stream.reader.is_finished() {
            warn!("capture stream is no longer producing frames");
            return None;
        }
        stream.latest.borrow().clone()
    }
}

/// Check the device node can be opened before spawning the grabber
async fn probe_device(device: &Path) -> Result<(), CameraError> {
    tokio::fs::File::open(device)
        .await
        .map(drop)
        .map_err(|e| classify_open_error(&e))
}

fn classify_open_error(err: &io::Error) -> CameraError {
    match err.kind() {
        io::ErrorKind::NotFound => CameraError::NotFound,
        io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
        _ => CameraError::Other {
            reason: err.to_string(),
        },
    }
}

async fn read_frames(mut stdout: ChildStdout, frames: watch::Sender<Option<Frame>>) {
    let mut splitter = JpegSplitter::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        match stdout.read(&mut buf).await {
            Ok(0) => {
                debug!("capture stream closed");
                break;
            }
            Ok(n) => {
                // Only the newest complete image matters
                if let Some(jpeg) = splitter.push(&buf[..n]).pop() {
                    frames.send_replace(Some(Frame::new(jpeg)));
                }
            }
            Err(e) => {
                warn!(?e, "capture stream read failed");
                break;
            }
        }
    }
}
