//! The detection loop
//!
//! A single task owns the camera, the speaker, the timer and the status
//! machine. It multiplexes client commands, timer ticks and the one
//! analysis call that may be in flight, so no state is shared or locked.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analyzer::{AnalysisError, Analyzer};
use crate::camera::{CameraError, CameraSource};
use crate::events::LoopEvent;
use crate::speech::Speaker;
use crate::state::{Status, StatusMachine};

use super::format::{format_message, ANALYSIS_ERROR_MESSAGE};
use super::ticker::Ticker;
use super::types::DetectionResponse;

type AnalysisResult = Result<DetectionResponse, AnalysisError>;

/// What a client asked the loop to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Action {
    SetCamera(bool),
    SetDetecting(bool),
    ToggleDetection,
    SetInterval(Duration),
    Query,
}

/// A request plus the channel its resulting snapshot is sent on
#[derive(Debug)]
pub struct Command {
    pub(super) action: Action,
    pub(super) reply: oneshot::Sender<Snapshot>,
}

/// Point-in-time view of the loop for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: Status,
    pub camera_on: bool,
    pub detecting: bool,
    pub interval_ms: u64,
    pub last_message: Option<String>,
    pub last_error: Option<String>,
}

/// The analysis call currently outstanding
struct InFlight {
    /// Detection session that issued the call
    session: u64,
    task: JoinHandle<AnalysisResult>,
}

/// Why the loop woke up
enum Wake {
    Command(Command),
    Tick,
    Analysis(u64, AnalysisResult),
}

/// Owns every device and drives capture, analysis and speech
pub struct DetectionLoop {
    camera: Box<dyn CameraSource>,
    analyzer: Arc<dyn Analyzer>,
    speaker: Speaker,
    status: StatusMachine,
    ticker: Ticker,
    interval: Duration,
    camera_on: bool,
    detecting: bool,
    /// Incremented each time detection is switched on
    session: u64,
    /// At most one analysis call exists at a time
    in_flight: Option<InFlight>,
    last_message: Option<String>,
    last_error: Option<String>,
    event_tx: broadcast::Sender<LoopEvent>,
}

impl DetectionLoop {
    pub fn new(
        camera: Box<dyn CameraSource>,
        analyzer: Arc<dyn Analyzer>,
        speaker: Speaker,
        interval: Duration,
        event_tx: broadcast::Sender<LoopEvent>,
    ) -> Self {
        Self {
            camera,
            analyzer,
            speaker,
            status: StatusMachine::new(event_tx.clone()),
            ticker: Ticker::new(),
            interval,
            camera_on: false,
            detecting: false,
            session: 0,
            in_flight: None,
            last_message: None,
            last_error: None,
            event_tx,
        }
    }

    /// Run until every command sender is dropped
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) {
        info!(interval_ms = self.interval_ms(), "detection loop started");

        loop {
            let wake = tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(command) => Wake::Command(command),
                    None => break,
                },
                (session, result) = next_result(&mut self.in_flight) => {
                    Wake::Analysis(session, result)
                }
                _ = self.ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Command(Command { action, reply }) => {
                    self.apply(action).await;
                    let _ = reply.send(self.snapshot());
                }
                Wake::Tick => self.on_tick(),
                Wake::Analysis(session, result) => self.on_analysis(session, result),
            }
        }

        self.shutdown();
        info!("detection loop stopped");
    }

    /// Release the camera and silence speech
    pub fn shutdown(&mut self) {
        self.stop_detection();
        self.release_camera();
        self.status.transition_to(Status::Idle);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status.status(),
            camera_on: self.camera_on,
            detecting: self.detecting,
            interval_ms: self.interval_ms(),
            last_message: self.last_message.clone(),
            last_error: self.last_error.clone(),
        }
    }

    async fn apply(&mut self, action: Action) {
        debug!(?action, "applying command");
        match action {
            Action::SetCamera(on) => self.set_camera(on).await,
            Action::SetDetecting(on) => self.set_detecting(on).await,
            Action::ToggleDetection => self.set_detecting(!self.detecting).await,
            Action::SetInterval(interval) => self.set_interval(interval),
            Action::Query => {}
        }
    }

    async fn set_camera(&mut self, on: bool) {
        if on {
            if self.camera_on {
                return;
            }
            if self.acquire_camera().await.is_ok() {
                self.status.transition_to(Status::Idle);
            }
        } else {
            self.stop_detection();
            self.release_camera();
            self.status.transition_to(Status::Idle);
        }
    }

    async fn set_detecting(&mut self, on: bool) {
        if !on {
            self.stop_detection();
            return;
        }
        if self.detecting {
            return;
        }
        if !self.camera_on && self.acquire_camera().await.is_err() {
            return;
        }

        self.detecting = true;
        self.session += 1;
        self.ticker.schedule_repeating(self.interval);
        self.status.transition_to(Status::Running);
        self.emit(LoopEvent::DetectionStarted {
            interval_ms: self.interval_ms(),
        });
    }

    fn set_interval(&mut self, interval: Duration) {
        if interval == self.interval {
            return;
        }
        self.interval = interval;
        // Takes effect from the next cycle, never fires on the spot
        self.ticker.reschedule(interval);
        info!(interval_ms = self.interval_ms(), "detection interval changed");
        self.emit(LoopEvent::IntervalChanged {
            interval_ms: self.interval_ms(),
        });
    }

    async fn acquire_camera(&mut self) -> Result<(), CameraError> {
        self.status.transition_to(Status::Starting);

        match self.camera.start().await {
            Ok(()) => {
                self.camera_on = true;
                self.last_error = None;
                self.emit(LoopEvent::CameraStarted);
                Ok(())
            }
            Err(e) => {
                warn!(?e, "camera acquisition failed");
                self.camera.stop();
                let message = e.to_string();
                self.last_error = Some(message.clone());
                self.status.transition_to(Status::Error);
                self.emit(LoopEvent::CameraFailed { message });
                Err(e)
            }
        }
    }

    fn release_camera(&mut self) {
        self.camera.stop();
        if self.camera_on {
            self.camera_on = false;
            self.emit(LoopEvent::CameraStopped);
        }
    }

    fn stop_detection(&mut self) {
        self.ticker.cancel();
        self.speaker.cancel();

        if !self.detecting {
            return;
        }
        self.detecting = false;
        // Error and Processing stay visible until something resolves them
        if self.status.status() == Status::Running {
            self.status.transition_to(Status::Idle);
        }
        self.emit(LoopEvent::DetectionStopped);
    }

    fn on_tick(&mut self) {
        if !self.detecting {
            self.ticker.cancel();
            return;
        }
        if self.in_flight.is_some() {
            debug!("analysis still in flight, skipping tick");
            return;
        }
        let Some(frame) = self.camera.capture_frame() else {
            debug!("no frame available, skipping tick");
            return;
        };

        self.status.transition_to(Status::Processing);

        let analyzer = Arc::clone(&self.analyzer);
        let task = tokio::spawn(async move { analyzer.analyze(&frame).await });
        self.in_flight = Some(InFlight {
            session: self.session,
            task,
        });
    }

    fn on_analysis(&mut self, session: u64, result: AnalysisResult) {
        if !self.detecting || session != self.session {
            debug!(session, current = self.session, "discarding stale analysis result");
            if self.status.status() == Status::Processing {
                let settled = if self.detecting {
                    Status::Running
                } else {
                    Status::Idle
                };
                self.status.transition_to(settled);
            }
            self.emit(LoopEvent::StaleResultDiscarded);
            return;
        }

        match result {
            Ok(response) => {
                self.last_error = None;
                if response.has_content() {
                    self.announce(format_message(&response));
                }
                self.status.transition_to(Status::Running);
            }
            Err(e) => {
                warn!(?e, "analysis failed");
                let message = e.to_string();
                self.last_error = Some(message.clone());
                self.status.transition_to(Status::Error);
                self.speaker.speak(ANALYSIS_ERROR_MESSAGE);
                self.emit(LoopEvent::AnalysisFailed { message });
            }
        }
    }

    /// Speak `message` unless it repeats the previous one
    fn announce(&mut self, message: String) {
        if message.is_empty() || self.last_message.as_deref() == Some(message.as_str()) {
            debug!("message unchanged, not repeating");
            return;
        }

        self.speaker.speak(&message);
        self.emit(LoopEvent::MessageSpoken {
            text: message.clone(),
        });
        self.last_message = Some(message);
    }

    fn emit(&self, event: LoopEvent) {
        debug!(%event, "emitting loop event");
        let _ = self.event_tx.send(event);
    }

    fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }
}

/// Wait for the outstanding analysis, pending forever when there is none
async fn next_result(slot: &mut Option<InFlight>) -> (u64, AnalysisResult) {
    let Some(in_flight) = slot.as_mut() else {
        return future::pending().await;
    };

    let joined = (&mut in_flight.task).await;
    let session = in_flight.session;
    *slot = None;

    let result = joined.unwrap_or_else(|e| Err(AnalysisError::TaskFailed(e.to_string())));
    (session, result)
}
