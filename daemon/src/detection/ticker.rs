//! Repeating detection timer
//!
//! Wraps a tokio interval so the loop can arm, re-arm and disarm it. Under
//! test the tokio clock is paused, which turns this into a virtual clock.

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Shortest period the timer accepts
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Repeating timer that can be armed and disarmed
#[derive(Debug, Default)]
pub struct Ticker {
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new() -> Self {
        Self { interval: None }
    }

    /// Arm the timer; the first tick fires one full period from now
    pub fn schedule_repeating(&mut self, period: Duration) {
        let period = period.max(MIN_PERIOD);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    /// Re-arm with a new period, only if currently armed
    pub fn reschedule(&mut self, period: Duration) {
        if self.is_armed() {
            self.schedule_repeating(period);
        }
    }

    /// Disarm the timer. Idempotent.
    pub fn cancel(&mut self) {
        self.interval = None;
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next tick; never resolves while disarmed
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }
}
