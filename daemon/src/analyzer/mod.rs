//! Analyzer module for remote scene description
//!
//! `Analyzer` is the seam the detection loop calls once per captured frame.
//! `GeminiAnalyzer` implements it against the Gemini `generateContent` API.

mod gemini;

use async_trait::async_trait;
use thiserror::Error;

use crate::camera::Frame;
use crate::detection::DetectionResponse;

pub use gemini::GeminiAnalyzer;

/// Why an analysis call failed
///
/// Every variant surfaces to the user as the same generic message.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to analyze image.")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to analyze image.")]
    Status { status: u16, body: String },

    #[error("Failed to analyze image.")]
    EmptyResponse,

    #[error("Failed to analyze image.")]
    Malformed(#[from] serde_json::Error),

    #[error("Failed to analyze image.")]
    TaskFailed(String),
}

/// A vision service that describes one still frame
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Describe the frame; the returned objects are already ranked
    async fn analyze(&self, frame: &Frame) -> Result<DetectionResponse, AnalysisError>;
}
