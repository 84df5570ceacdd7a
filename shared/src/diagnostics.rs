//! Developer commands and frame-rate sampling.
//!
//! Debug commands are only honoured when the embedding app hands the
//! controller a [`DebugCapabilities`] that allows them. Release builds pass
//! [`DebugCapabilities::disabled`].

use std::time::Duration;

use crate::throttle::Throttle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugCapabilities {
    pub clear_session: bool,
    pub culling: bool,
}

impl DebugCapabilities {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            clear_session: true,
            culling: true,
        }
    }

    pub fn allows(&self, command: &DebugCommand) -> bool {
        match command {
            DebugCommand::ClearSession => self.clear_session,
            DebugCommand::SetCulling(_) | DebugCommand::ConfigureCulling { .. } => self.culling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DebugCommand {
    ClearSession,
    SetCulling(bool),
    ConfigureCulling {
        threshold: Option<f32>,
        interval: Option<Duration>,
    },
}

/// Average frame rate over fixed sampling windows.
#[derive(Debug, Clone)]
pub struct FpsMonitor {
    throttle: Throttle,
    window_start: Duration,
    frames: u32,
    fps: f32,
}

impl FpsMonitor {
    /// `initial_fps` is reported until the first window closes.
    pub fn new(interval: Duration, now: Duration, initial_fps: f32) -> Self {
        Self {
            throttle: Throttle::starting_at(interval, now),
            window_start: now,
            frames: 0,
            fps: initial_fps,
        }
    }

    /// Counts a frame. Returns the new average when a window closes.
    pub fn frame(&mut self, now: Duration) -> Option<f32> {
        self.frames += 1;
        if !self.throttle.try_fire(now) {
            return None;
        }
        let elapsed = now.saturating_sub(self.window_start).as_secs_f32();
        if elapsed > 0.0 {
            self.fps = self.frames as f32 / elapsed;
        }
        self.window_start = now;
        self.frames = 0;
        Some(self.fps)
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_builds_ignore_debug_commands() {
        let caps = DebugCapabilities::disabled();
        assert!(!caps.allows(&DebugCommand::ClearSession));
        assert!(!caps.allows(&DebugCommand::SetCulling(false)));
        assert!(DebugCapabilities::all().allows(&DebugCommand::ConfigureCulling {
            threshold: Some(0.5),
            interval: None,
        }));
    }

    #[test]
    fn averages_over_the_window() {
        let mut fps = FpsMonitor::new(Duration::from_millis(200), Duration::ZERO, 60.0);
        let mut reported = None;
        for frame in 1..=10u64 {
            reported = fps.frame(Duration::from_millis(frame * 20));
        }
        let value = reported.unwrap();
        assert!((value - 50.0).abs() < 1.0e-3);
        assert_eq!(fps.fps(), value);
        assert_eq!(fps.frame(Duration::from_millis(220)), None);
    }
}
