//! State machine module for detection status
//!
//! Provides an explicit status machine with five states:
//! - Idle: No timer armed
//! - Starting: Camera device is being acquired
//! - Running: Timer armed, waiting for the next tick
//! - Processing: One analysis round trip in flight
//! - Error: Camera acquisition or analysis failed

mod machine;

pub use machine::{Status, StatusMachine};
