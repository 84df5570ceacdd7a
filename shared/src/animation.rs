//! Which clip the character plays, and which way it faces.

use std::f32::consts::FRAC_PI_2;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::throttle::Throttle;
use crate::types::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationClip {
    Still,
    Walk,
    Jumping,
}

impl AnimationClip {
    /// Name of the animation group inside the character model.
    pub fn name(self) -> &'static str {
        match self {
            Self::Still => "Still",
            Self::Walk => "Walk",
            Self::Jumping => "Jumping",
        }
    }
}

/// What the renderer should do with the character's animation this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationCommand {
    /// Switch to `clip` and loop it.
    Play { clip: AnimationClip, speed: f32 },
    /// Keep the current clip, only change its playback rate.
    SetSpeed { speed: f32 },
    None,
}

/// Walk playback rate for a movement speed.
pub fn walk_speed_ratio(speed: f32) -> f32 {
    const EPS: f32 = 1.0e-6;
    if (speed - 0.7).abs() < EPS {
        4.0
    } else if (speed - 2.0).abs() < EPS {
        2.5
    } else {
        1.5
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationSelector {
    current: Option<AnimationClip>,
}

impl AnimationSelector {
    pub fn current(&self) -> Option<AnimationClip> {
        self.current
    }

    /// Animation names to publish with the presence record.
    pub fn active_names(&self) -> Vec<String> {
        self.current
            .map(|clip| vec![clip.name().to_owned()])
            .unwrap_or_default()
    }

    pub fn select(&mut self, jumped: bool, grounded: bool, moving: bool, speed: f32) -> AnimationCommand {
        let (clip, ratio) = if jumped {
            (AnimationClip::Jumping, 1.0)
        } else if !grounded {
            return AnimationCommand::None;
        } else if moving {
            (AnimationClip::Walk, walk_speed_ratio(speed))
        } else {
            (AnimationClip::Still, 1.0)
        };
        self.play(clip, ratio)
    }

    fn play(&mut self, clip: AnimationClip, speed: f32) -> AnimationCommand {
        if self.current == Some(clip) {
            return AnimationCommand::SetSpeed { speed };
        }
        self.current = Some(clip);
        AnimationCommand::Play { clip, speed }
    }
}

/// Turns the character toward its movement direction at a capped rate.
#[derive(Debug, Clone)]
pub struct FacingUpdater {
    throttle: Throttle,
}

impl FacingUpdater {
    pub fn new(interval: Duration) -> Self {
        Self {
            throttle: Throttle::new(interval),
        }
    }

    /// New yaw for a horizontal movement, or `None` when idle or throttled.
    pub fn update(&mut self, movement: &Vec3, now: Duration) -> Option<f32> {
        let flat = Vec3::new(movement.x, 0.0, movement.z);
        let direction = flat.try_normalize(1.0e-6)?;
        if !self.throttle.try_fire(now) {
            return None;
        }
        Some((-direction.x).atan2(-direction.z) + FRAC_PI_2)
    }
}
