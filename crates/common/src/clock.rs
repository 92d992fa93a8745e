//! Clock and timing utilities for render supervision.
//!
//! A render is anchored to a monotonic clock epoch recorded when the
//! renderer is launched. This module provides utilities for:
//! - Capturing the epoch
//! - Detecting renders whose reported status stopped changing
//! - Grace periods for cooperative shutdown

use std::time::{Duration, Instant};

/// A render clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the renderer was launched).
#[derive(Debug, Clone)]
pub struct RenderClock {
    /// The instant the render started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl RenderClock {
    /// Create a new render clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the render started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at render start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Tracks when a polled status value last changed.
///
/// The renderer protocol has no heartbeat, so "stalled" means the observed
/// status has been identical for longer than the configured window.
#[derive(Debug, Clone)]
pub struct ProgressWatch<T> {
    last_value: Option<T>,
    last_change: Instant,
}

impl<T: PartialEq> ProgressWatch<T> {
    pub fn new() -> Self {
        Self {
            last_value: None,
            last_change: Instant::now(),
        }
    }

    /// Record an observation. Returns true when the value differs from the
    /// previous one.
    pub fn observe(&mut self, value: T) -> bool {
        self.observe_at(value, Instant::now())
    }

    fn observe_at(&mut self, value: T, now: Instant) -> bool {
        if self.last_value.as_ref() == Some(&value) {
            return false;
        }
        self.last_value = Some(value);
        self.last_change = now;
        true
    }

    /// Time since the last observed change.
    pub fn since_change(&self) -> Duration {
        self.last_change.elapsed()
    }

    /// Whether nothing changed for longer than `timeout`.
    pub fn is_stalled(&self, timeout: Duration) -> bool {
        self.since_change() > timeout
    }
}

impl<T: PartialEq> Default for ProgressWatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A deadline started at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct GracePeriod {
    started: Instant,
    length: Duration,
}

impl GracePeriod {
    pub fn start(length: Duration) -> Self {
        Self {
            started: Instant::now(),
            length,
        }
    }

    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.length
    }

    pub fn remaining(&self) -> Duration {
        self.length.saturating_sub(self.started.elapsed())
    }
}
