//! Client side of the detection loop's command channel

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::runner::{Action, Command, Snapshot};

/// The detection loop task has exited
#[derive(Debug, Error)]
#[error("detection loop is not running")]
pub struct LoopClosed;

/// Cloneable handle for driving a running `DetectionLoop`
///
/// Every request answers with the loop's state after it was applied.
#[derive(Debug, Clone)]
pub struct DetectionHandle {
    tx: mpsc::Sender<Command>,
}

impl DetectionHandle {
    pub fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    pub async fn set_camera(&self, on: bool) -> Result<Snapshot, LoopClosed> {
        self.request(Action::SetCamera(on)).await
    }

    pub async fn set_detecting(&self, on: bool) -> Result<Snapshot, LoopClosed> {
        self.request(Action::SetDetecting(on)).await
    }

    pub async fn toggle_detection(&self) -> Result<Snapshot, LoopClosed> {
        self.request(Action::ToggleDetection).await
    }

    pub async fn set_interval(&self, interval: Duration) -> Result<Snapshot, LoopClosed> {
        self.request(Action::SetInterval(interval)).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot, LoopClosed> {
        self.request(Action::Query).await
    }

    async fn request(&self, action: Action) -> Result<Snapshot, LoopClosed> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command { action, reply })
            .await
            .map_err(|_| LoopClosed)?;
        response.await.map_err(|_| LoopClosed)
    }
}
