//! aura-vision-daemon: Background daemon that describes nearby obstacles
//!
//! This daemon runs a detection loop that:
//! - Captures a still frame from the camera on a fixed interval
//! - Sends it to a remote vision service for obstacle detection
//! - Speaks a ranked summary of what was found
//!
//! A UI drives it over a Unix socket: camera and detection toggles, the
//! detection interval, status queries and event subscriptions.

mod analyzer;
mod camera;
mod config;
mod detection;
mod events;
mod ipc;
mod lifecycle;
mod speech;
mod state;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::analyzer::GeminiAnalyzer;
use crate::camera::FfmpegCamera;
use crate::config::Config;
use crate::detection::{DetectionHandle, DetectionLoop};
use crate::events::LoopEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::speech::{EspeakSpeech, Speaker};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "aura-vision-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, interval_ms = config.interval.as_millis() as u64, "configuration loaded");

    let api_key = config
        .analyzer
        .api_key
        .clone()
        .context("GEMINI_API_KEY or API_KEY must be set")?;

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Create channels for inter-component communication
    // IPC server -> detection loop
    let (command_tx, command_rx) = mpsc::channel(32);
    // Detection loop -> IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<LoopEvent>(64);

    // Create the collaborators the loop owns
    let analyzer = GeminiAnalyzer::new(&config.analyzer, api_key)
        .context("failed to build analyzer client")?;
    let camera = FfmpegCamera::new(config.camera.clone());
    let engine = EspeakSpeech::discover(&config.speech).await;
    let speaker = Speaker::new(Box::new(engine), config.speech.preference.clone());

    let mut detection_loop = DetectionLoop::new(
        Box::new(camera),
        Arc::new(analyzer),
        speaker,
        config.interval,
        event_tx.clone(),
    );

    // Create IPC server
    let server = Server::new(
        &config.socket_path,
        DetectionHandle::new(command_tx),
        event_tx.clone(),
    )?;

    let mut log_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the detection loop (processes commands and ticks)
        _ = detection_loop.run(command_rx) => {
            info!("detection loop exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Log loop events
        _ = async {
            loop {
                match log_rx.recv().await {
                    Ok(event) => info!(%event, "loop event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "loop event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("event logger exited");
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "failed to install signal handlers"),
            }
        }
    }

    // Cleanup
    info!("shutting down...");

    detection_loop.shutdown();
    server.shutdown().await;

    info!("aura-vision-daemon stopped");

    Ok(())
}
