//! Signal handling for graceful shutdown

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

/// Handles shutdown signals (SIGTERM, SIGINT)
#[derive(Debug, Default)]
pub struct ShutdownSignal;

impl ShutdownSignal {
    pub fn new() -> Self {
        Self
    }

    /// Wait for SIGTERM or SIGINT
    ///
    /// Fails only if the handlers cannot be registered.
    pub async fn wait(&self) -> io::Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }

        Ok(())
    }
}
