//! Debounced toggle for the hotkey-driven button
//!
//! Turns edge-triggered "key pressed" events into a boolean toggle that
//! flips at most once per debounce interval. Edge detection is the
//! caller's job: the bridge invokes [`ToggleDebouncer::trigger`] once per
//! recognized press and then waits for release, so a held key does not
//! re-trigger once the window reopens.

use std::time::{Duration, Instant};

/// Minimum time between accepted toggle transitions
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(200);

/// Debounced button toggle state, session-scoped (starts released)
#[derive(Debug)]
pub struct ToggleDebouncer {
    state: bool,
    last_toggle: Option<Instant>,
    interval: Duration,
}

impl ToggleDebouncer {
    pub fn new() -> Self {
        Self::with_interval(DEBOUNCE_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            state: false,
            last_toggle: None,
            interval,
        }
    }

    /// Register a press event at `now` (monotonic).
    ///
    /// Flips and returns the new state if the debounce interval has
    /// elapsed since the last accepted toggle; otherwise leaves state and
    /// timestamp untouched and returns the current state.
    pub fn trigger(&mut self, now: Instant) -> bool {
        let elapsed = self
            .last_toggle
            .map_or(true, |t| now.saturating_duration_since(t) >= self.interval);
        if elapsed {
            self.state = !self.state;
            self.last_toggle = Some(now);
        }
        self.state
    }

    /// Current toggle state
    pub fn state(&self) -> bool {
        self.state
    }
}

impl Default for ToggleDebouncer {
    fn default() -> Self {
        Self::new()
    }
}
