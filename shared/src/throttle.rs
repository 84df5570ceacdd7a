//! Minimum-interval gate used by every throttled stage.
//!
//! Time is passed in explicitly as a [`Duration`] since scene start, so the same
//! gate works with Bevy's `Time`, a test clock, or anything else monotonic.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    interval: Duration,
    last: Option<Duration>,
}

impl Throttle {
    /// A leading gate: the first call fires immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// A trailing gate: the first call fires one interval after `now`.
    pub fn starting_at(interval: Duration, now: Duration) -> Self {
        Self {
            interval,
            last: Some(now),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Whether at least one interval has passed since the last fire.
    pub fn ready(&self, now: Duration) -> bool {
        match self.last {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval,
        }
    }

    /// Fires and records `now` when ready.
    pub fn try_fire(&mut self, now: Duration) -> bool {
        if self.ready(now) {
            self.last = Some(now);
            true
        } else {
            false
        }
    }

    /// Records `now` as a fire without checking readiness.
    pub fn mark(&mut self, now: Duration) {
        self.last = Some(now);
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
