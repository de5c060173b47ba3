//! Events module for detection loop notifications
//!
//! Provides structured event types for status transitions, camera and
//! detection lifecycle changes, and what was spoken.

use serde::{Deserialize, Serialize};

use crate::state::Status;

/// Events emitted by the detection loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEvent {
    /// Status moved from one state to another
    StatusChanged {
        from: Status,
        to: Status,
        /// Time spent in the previous status
        duration_ms: u64,
    },

    /// Camera acquired and producing frames
    CameraStarted,

    /// Camera released
    CameraStopped,

    /// Camera could not be acquired
    CameraFailed { message: String },

    /// Detection timer armed
    DetectionStarted { interval_ms: u64 },

    /// Detection timer disarmed
    DetectionStopped,

    /// Detection interval changed
    IntervalChanged { interval_ms: u64 },

    /// A message was handed to speech output
    MessageSpoken { text: String },

    /// An analysis call failed
    AnalysisFailed { message: String },

    /// An analysis result arrived after its detection session ended
    StaleResultDiscarded,
}

impl std::fmt::Display for LoopEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopEvent::StatusChanged { from, to, duration_ms } => {
                write!(f, "STATUS_CHANGED {} -> {} ({}ms)", from, to, duration_ms)
            }
            LoopEvent::CameraStarted => write!(f, "CAMERA_STARTED"),
            LoopEvent::CameraStopped => write!(f, "CAMERA_STOPPED"),
            LoopEvent::CameraFailed { message } => write!(f, "CAMERA_FAILED ({})", message),
            LoopEvent::DetectionStarted { interval_ms } => {
                write!(f, "DETECTION_STARTED ({}ms)", interval_ms)
            }
            LoopEvent::DetectionStopped => write!(f, "DETECTION_STOPPED"),
            LoopEvent::IntervalChanged { interval_ms } => {
                write!(f, "INTERVAL_CHANGED ({}ms)", interval_ms)
            }
            LoopEvent::MessageSpoken { text } => write!(f, "MESSAGE_SPOKEN ({})", text),
            LoopEvent::AnalysisFailed { message } => write!(f, "ANALYSIS_FAILED ({})", message),
            LoopEvent::StaleResultDiscarded => write!(f, "STALE_RESULT_DISCARDED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = LoopEvent::StatusChanged {
            from: Status::Running,
            to: Status::Processing,
            duration_ms: 1500,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("status_changed"));
        assert!(json.contains("processing"));
        assert!(json.contains("1500"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"message_spoken","text":"car near"}"#;
        let event: LoopEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            LoopEvent::MessageSpoken {
                text: "car near".into()
            }
        );
    }

    #[test]
    fn test_event_display() {
        let event = LoopEvent::DetectionStarted { interval_ms: 3000 };
        assert_eq!(event.to_string(), "DETECTION_STARTED (3000ms)");
    }
}
