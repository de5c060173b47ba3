//! Core status machine implementation
//!
//! Holds the single detection status, validates transitions against the
//! allowed graph and broadcasts every change.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::events::LoopEvent;

/// The five possible detection statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// No timer armed
    Idle,
    /// Camera device is being acquired
    Starting,
    /// Timer armed, waiting for the next tick
    Running,
    /// One analysis call in flight
    Processing,
    /// Camera acquisition or analysis failed
    Error,
}

impl Default for Status {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Idle => write!(f, "Idle"),
            Status::Starting => write!(f, "Starting"),
            Status::Running => write!(f, "Running"),
            Status::Processing => write!(f, "Processing"),
            Status::Error => write!(f, "Error"),
        }
    }
}

impl Status {
    /// Whether `self -> next` is an edge of the status graph
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;

        match (self, next) {
            // Error is reachable from anywhere
            (_, Error) => true,
            (Idle, Starting | Running) => true,
            (Starting, Idle | Running) => true,
            (Running, Processing | Idle) => true,
            (Processing, Running | Idle) => true,
            (Error, Idle | Starting | Running | Processing) => true,
            _ => false,
        }
    }
}

/// Owns the current status and announces transitions
pub struct StatusMachine {
    /// Current status
    status: Status,
    /// When the current status was entered
    entered_at: Instant,
    /// Channel for emitting loop events
    event_tx: broadcast::Sender<LoopEvent>,
}

impl StatusMachine {
    /// Create a new status machine in Idle
    pub fn new(event_tx: broadcast::Sender<LoopEvent>) -> Self {
        Self {
            status: Status::Idle,
            entered_at: Instant::now(),
            event_tx,
        }
    }

    /// Get the current status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Move to `next`, returning whether the status changed
    ///
    /// Writing the current status again is a silent no-op. Edges outside the
    /// status graph are refused.
    pub fn transition_to(&mut self, next: Status) -> bool {
        let previous = self.status;
        if previous == next {
            return false;
        }

        if !previous.can_transition_to(next) {
            warn!(from = %previous, to = %next, "refusing illegal status transition");
            return false;
        }

        let duration_ms = self.entered_at.elapsed().as_millis() as u64;

        info!(
            from = %previous,
            to = %next,
            duration_ms = duration_ms,
            "status transition"
        );

        self.status = next;
        self.entered_at = Instant::now();

        let event = LoopEvent::StatusChanged {
            from: previous,
            to: next,
            duration_ms,
        };
        debug!(?event, "emitting status event");
        let _ = self.event_tx.send(event);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_machine() -> (StatusMachine, broadcast::Receiver<LoopEvent>) {
        let (tx, rx) = broadcast::channel(16);
        (StatusMachine::new(tx), rx)
    }

    #[test]
    fn test_initial_status() {
        let (sm, _) = create_machine();
        assert_eq!(sm.status(), Status::Idle);
    }

    #[test]
    fn test_detection_cycle() {
        let (mut sm, _) = create_machine();

        assert!(sm.transition_to(Status::Starting));
        assert!(sm.transition_to(Status::Running));
        assert!(sm.transition_to(Status::Processing));
        assert!(sm.transition_to(Status::Running));
        assert!(sm.transition_to(Status::Idle));
        assert_eq!(sm.status(), Status::Idle);
    }

    #[test]
    fn test_error_reachable_from_every_status() {
        for from in [
            Status::Idle,
            Status::Starting,
            Status::Running,
            Status::Processing,
        ] {
            assert!(from.can_transition_to(Status::Error), "{} -> Error", from);
        }
    }

    #[test]
    fn test_error_allows_retry() {
        let (mut sm, _) = create_machine();
        sm.transition_to(Status::Error);

        assert!(sm.transition_to(Status::Starting));
        assert!(sm.transition_to(Status::Running));
    }

    #[test]
    fn test_illegal_transition_refused() {
        let (mut sm, _) = create_machine();

        // Processing requires an armed timer
        assert!(!sm.transition_to(Status::Processing));
        assert_eq!(sm.status(), Status::Idle);
    }

    #[test]
    fn test_same_status_is_silent() {
        let (mut sm, mut rx) = create_machine();

        assert!(!sm.transition_to(Status::Idle));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_transition_emits_event() {
        let (mut sm, mut rx) = create_machine();
        sm.transition_to(Status::Running);

        match rx.try_recv().unwrap() {
            LoopEvent::StatusChanged { from, to, .. } => {
                assert_eq!(from, Status::Idle);
                assert_eq!(to, Status::Running);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
