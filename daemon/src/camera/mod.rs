//! Camera module for still-frame capture from a live video feed
//!
//! The detection loop only sees the `CameraSource` trait; `FfmpegCamera`
//! backs it with an ffmpeg child process streaming MJPEG from a V4L2 device.

mod ffmpeg;
mod mjpeg;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use ffmpeg::FfmpegCamera;

/// One JPEG still taken from the live feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    jpeg: Arc<[u8]>,
}

impl Frame {
    pub fn new(jpeg: Vec<u8>) -> Self {
        Self { jpeg: jpeg.into() }
    }

    /// Encoded JPEG bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn len(&self) -> usize {
        self.jpeg.len()
    }
}

/// Reasons camera acquisition can fail
///
/// The display strings are shown to the user as the last error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera permission denied. Grant access to the video device and try again.")]
    PermissionDenied,

    #[error("No camera found. Please connect a camera.")]
    NotFound,

    #[error("Could not start camera.")]
    Other { reason: String },
}

/// A live camera that can hand out still frames
#[async_trait]
pub trait CameraSource: Send {
    /// Acquire the device and wait until frames are flowing
    async fn start(&mut self) -> Result<(), CameraError>;

    /// Release the device. Idempotent.
    fn stop(&mut self);

    /// Latest still from the feed, or `None` when no frame is available
    fn capture_frame(&mut self) -> Option<Frame>;
}
