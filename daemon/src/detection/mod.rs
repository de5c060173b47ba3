//! Detection module: the capture, analyze and speak loop
//!
//! - `types`: detection results as returned by the analyzer
//! - `rank` / `format`: ordering and wording of what gets spoken
//! - `ticker`: the repeating timer
//! - `runner`: the loop task that owns every device
//! - `handle`: the cloneable front door used by the IPC server

mod format;
mod handle;
mod rank;
mod runner;
mod ticker;
mod types;

use std::time::Duration;

pub use handle::{DetectionHandle, LoopClosed};
pub use rank::rank_objects;
pub use runner::{DetectionLoop, Snapshot};
pub use types::{DetectedObject, DetectionResponse, Distance, Position, Urgency};

/// Shortest detection interval a client may request
pub const MIN_INTERVAL: Duration = Duration::from_millis(1000);
/// Longest detection interval a client may request
pub const MAX_INTERVAL: Duration = Duration::from_millis(10_000);
/// Interval used when nothing is configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);
