//! Keyboard and virtual-joystick aggregation.
//!
//! The aggregator turns raw key and stick events into one [`MovementIntent`] per
//! frame. The intent is expressed in the camera's local frame (`+x` right, `+z`
//! forward) and is not normalized; the pipeline normalizes and applies `speed`
//! after the camera transform.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::InputConfig;
use crate::constants::CLICK_MAX_DURATION;
use crate::types::{CharacterState, Vec3};

/// Keys the movement loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKey {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    ToggleFlight,
    ClearSession,
}

impl InputKey {
    /// Maps a DOM-style key name (`"w"`, `"ArrowUp"`, `" "`) to a key.
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "w" | "W" | "ArrowUp" => Some(Self::Forward),
            "s" | "S" | "ArrowDown" => Some(Self::Back),
            "a" | "A" | "ArrowLeft" => Some(Self::Left),
            "d" | "D" | "ArrowRight" => Some(Self::Right),
            " " | "Space" => Some(Self::Jump),
            "f" | "F" => Some(Self::ToggleFlight),
            "x" | "X" => Some(Self::ClearSession),
            _ => None,
        }
    }

    fn direction(self) -> Option<Vec3> {
        match self {
            Self::Forward => Some(Vec3::new(0.0, 0.0, 1.0)),
            Self::Back => Some(Vec3::new(0.0, 0.0, -1.0)),
            Self::Left => Some(Vec3::new(-1.0, 0.0, 0.0)),
            Self::Right => Some(Vec3::new(1.0, 0.0, 0.0)),
            _ => None,
        }
    }
}

/// Held keys plus the keys that went down since the last frame.
#[derive(Debug, Default, Clone)]
pub struct KeyboardState {
    held: HashSet<InputKey>,
    pressed: HashSet<InputKey>,
}

impl KeyboardState {
    pub fn press(&mut self, key: InputKey) {
        if self.held.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: InputKey) {
        self.held.remove(&key);
    }

    pub fn is_held(&self, key: InputKey) -> bool {
        self.held.contains(&key)
    }

    pub fn just_pressed(&self, key: InputKey) -> bool {
        self.pressed.contains(&key)
    }

    /// Sum of the held direction keys. Opposite keys cancel.
    pub fn direction(&self) -> Vec3 {
        self.held
            .iter()
            .filter_map(|key| key.direction())
            .fold(Vec3::zeros(), |acc, dir| acc + dir)
    }

    /// Forgets key-down edges once a frame has consumed them.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.pressed.clear();
    }
}

/// Polar stick reading: angle in degrees, distance in UI pixels from center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickSample {
    pub angle_deg: f32,
    pub distance: f32,
}

/// Dead-zone and low-pass filter for stick samples.
#[derive(Debug, Default, Clone)]
pub struct JoystickFilter {
    current: Option<JoystickSample>,
}

impl JoystickFilter {
    /// Blend weight kept from the previous sample. Slow frames smooth less so the
    /// stick stays responsive.
    pub fn smoothing_factor(fps: f32) -> f32 {
        if fps < 20.0 {
            0.05
        } else if fps < 30.0 {
            0.1
        } else {
            0.2
        }
    }

    /// Feeds a raw sample. `None` means the stick was released.
    pub fn push(&mut self, sample: Option<JoystickSample>, fps: f32, dead_zone: f32) {
        self.current = match (sample, self.current) {
            (Some(raw), _) if raw.distance < dead_zone => None,
            (Some(raw), Some(prev)) => {
                let k = Self::smoothing_factor(fps);
                Some(JoystickSample {
                    angle_deg: blend_angle(prev.angle_deg, raw.angle_deg, k),
                    distance: prev.distance * k + raw.distance * (1.0 - k),
                })
            }
            (Some(raw), None) => Some(raw),
            (None, _) => None,
        };
    }

    pub fn current(&self) -> Option<JoystickSample> {
        self.current
    }

    pub fn release(&mut self) {
        self.current = None;
    }
}

/// `prev * k + next * (1 - k)` along the shorter arc, in degrees within
/// `[-180, 180)`.
fn blend_angle(prev: f32, next: f32, k: f32) -> f32 {
    let delta = (next - prev + 180.0).rem_euclid(360.0) - 180.0;
    (prev + delta * (1.0 - k) + 180.0).rem_euclid(360.0) - 180.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedBand {
    Low,
    Medium,
    High,
}

impl SpeedBand {
    pub fn classify(distance: f32, config: &InputConfig) -> Self {
        if distance >= config.high_band {
            Self::High
        } else if distance >= config.medium_band {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn speed(self, config: &InputConfig) -> f32 {
        match self {
            Self::Low => config.speed_low,
            Self::Medium => config.speed_medium,
            Self::High => config.speed_high,
        }
    }
}

/// What the player asked for this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementIntent {
    /// Camera-local direction, `+x` right and `+z` forward. Not normalized.
    pub local: Vec3,
    /// Horizontal speed per reference frame.
    pub speed: f32,
    /// Vertical velocity to start a jump with, if one was triggered.
    pub jump: Option<f32>,
    /// Direct upward displacement per reference frame while flying.
    pub ascend: f32,
    pub toggle_flight: bool,
    pub clear_session: bool,
    pub joystick_active: bool,
}

impl MovementIntent {
    pub fn is_moving(&self) -> bool {
        self.local.x != 0.0 || self.local.z != 0.0
    }
}

/// Stateful keyboard + joystick aggregator.
#[derive(Debug, Clone)]
pub struct InputAggregator {
    pub keyboard: KeyboardState,
    pub joystick: JoystickFilter,
    speed: f32,
}

impl InputAggregator {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            keyboard: KeyboardState::default(),
            joystick: JoystickFilter::default(),
            speed: config.speed_keyboard,
        }
    }

    /// Feeds a stick sample through the dead-zone and smoothing filter.
    pub fn push_joystick(&mut self, sample: Option<JoystickSample>, fps: f32, config: &InputConfig) {
        self.joystick.push(sample, fps, config.dead_zone);
    }

    /// Builds this frame's intent from the held keys and filtered stick.
    ///
    /// Jump decisions read `character` as it was at the end of the previous frame.
    pub fn aggregate(&mut self, character: &CharacterState, config: &InputConfig) -> MovementIntent {
        let keys = self.keyboard.direction();
        let mut local = keys;
        let mut ascend = 0.0;
        let mut jump = None;

        if keys != Vec3::zeros() {
            self.speed = config.speed_keyboard;
        }

        let stick = self.joystick.current();
        if let Some(JoystickSample {
            angle_deg,
            distance,
        }) = stick
        {
            let angle = angle_deg.to_radians();
            let heading = Vec3::new(angle.cos(), 0.0, angle.sin());
            let band = SpeedBand::classify(distance, config);

            if character.flying {
                self.speed = config.speed_flight;
                local += heading * (distance / config.max_distance);
                ascend = match band {
                    SpeedBand::High => config.ascend_fast,
                    SpeedBand::Medium => config.ascend_slow,
                    SpeedBand::Low => 0.0,
                };
            } else {
                if character.grounded {
                    self.speed = band.speed(config);
                    if band == SpeedBand::High {
                        jump = Some(config.joystick_jump_impulse);
                    }
                }
                let gain = (distance / config.max_distance).min(1.0) * config.joystick_sensitivity;
                local += heading * gain;
            }
        }

        if self.keyboard.just_pressed(InputKey::Jump) && character.grounded && !character.flying {
            jump = Some(config.keyboard_jump_impulse);
        }

        let intent = MovementIntent {
            local,
            speed: self.speed,
            jump,
            ascend,
            toggle_flight: self.keyboard.just_pressed(InputKey::ToggleFlight),
            clear_session: self.keyboard.just_pressed(InputKey::ClearSession),
            joystick_active: stick.is_some(),
        };
        self.keyboard.end_frame();
        intent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerGesture {
    Click,
    Drag,
}

/// Tells clicks from drags by how long the pointer stayed down.
#[derive(Debug, Clone, Default)]
pub struct PointerClassifier {
    down_at: Option<Duration>,
}

impl PointerClassifier {
    pub fn press(&mut self, now: Duration) {
        self.down_at = Some(now);
    }

    /// `None` if there was no matching press.
    pub fn release(&mut self, now: Duration) -> Option<PointerGesture> {
        let down_at = self.down_at.take()?;
        if now.saturating_sub(down_at) < CLICK_MAX_DURATION {
            Some(PointerGesture::Click)
        } else {
            Some(PointerGesture::Drag)
        }
    }
}
