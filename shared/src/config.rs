//! Runtime-tunable controller settings.
//!
//! Every field defaults to the matching value in [`crate::constants`]. A JSON
//! file only needs the fields it overrides:
//!
//! ```json
//! { "presence": { "interval_ms": 150 }, "visibility": { "max_distance": 200.0 } }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::types::{DeviceClass, MapEdge};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub device: DeviceClass,
    pub input: InputConfig,
    pub vertical: VerticalConfig,
    pub collision: CollisionConfig,
    pub streaming: StreamingConfig,
    pub visibility: VisibilityConfig,
    pub presence: PresenceConfig,
}

impl ControllerConfig {
    /// Defaults with the device-specific cadences and gains applied.
    pub fn for_device(device: DeviceClass) -> Self {
        let mut config = Self {
            device,
            ..Self::default()
        };
        if device == DeviceClass::Mobile {
            config.input.joystick_sensitivity = MOBILE_JOYSTICK_SENSITIVITY;
            config.visibility.frustum_interval_ms = FRUSTUM_INTERVAL_MOBILE.as_millis() as u64;
            config.visibility.frustum_threshold = FRUSTUM_THRESHOLD_MOBILE;
            config.presence.interval_ms = PRESENCE_INTERVAL_MOBILE.as_millis() as u64;
        }
        config
    }

    /// Parses a JSON override file on top of the device defaults.
    pub fn from_json(device: DeviceClass, json: &str) -> Result<Self, serde_json::Error> {
        let overrides: serde_json::Value = serde_json::from_str(json)?;
        let mut merged = serde_json::to_value(Self::for_device(device))?;
        merge_json(&mut merged, overrides);
        let mut config: Self = serde_json::from_value(merged)?;
        config.device = device;
        Ok(config)
    }
}

fn merge_json(base: &mut serde_json::Value, overrides: serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        log::warn!("ignoring unknown controller setting {key:?}");
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub dead_zone: f32,
    pub max_distance: f32,
    pub medium_band: f32,
    pub high_band: f32,
    pub speed_low: f32,
    pub speed_medium: f32,
    pub speed_high: f32,
    pub speed_flight: f32,
    pub speed_keyboard: f32,
    pub joystick_sensitivity: f32,
    pub ascend_fast: f32,
    pub ascend_slow: f32,
    pub keyboard_jump_impulse: f32,
    pub joystick_jump_impulse: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dead_zone: JOYSTICK_DEAD_ZONE,
            max_distance: JOYSTICK_MAX_DISTANCE,
            medium_band: JOYSTICK_MEDIUM_BAND,
            high_band: JOYSTICK_HIGH_BAND,
            speed_low: SPEED_LOW,
            speed_medium: SPEED_MEDIUM,
            speed_high: SPEED_HIGH,
            speed_flight: SPEED_FLIGHT,
            speed_keyboard: SPEED_KEYBOARD,
            joystick_sensitivity: 1.0,
            ascend_fast: FLIGHT_ASCEND_FAST,
            ascend_slow: FLIGHT_ASCEND_SLOW,
            keyboard_jump_impulse: KEYBOARD_JUMP_IMPULSE,
            joystick_jump_impulse: JOYSTICK_JUMP_IMPULSE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerticalConfig {
    pub gravity: f32,
    pub ray_lift: f32,
    pub ray_length: f32,
    pub hit_tolerance: f32,
    pub flat_tolerance: f32,
}

impl Default for VerticalConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY_PER_FRAME,
            ray_lift: GROUND_RAY_LIFT,
            ray_length: GROUND_RAY_LENGTH,
            hit_tolerance: GROUND_HIT_TOLERANCE,
            flat_tolerance: FLAT_GROUND_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub step_height: f32,
    pub blocked_ratio: f32,
    pub settle_ratio: f32,
    pub ground_base_y: f32,
    pub foot_offset: f32,
    pub floor_snap_band: f32,
    pub fall_recovery_margin: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            step_height: STEP_HEIGHT,
            blocked_ratio: STEP_BLOCKED_RATIO,
            settle_ratio: STEP_SETTLE_RATIO,
            ground_base_y: GROUND_BASE_Y,
            foot_offset: GROUND_FOOT_OFFSET,
            floor_snap_band: FLOOR_SNAP_BAND,
            fall_recovery_margin: FALL_RECOVERY_MARGIN,
        }
    }
}

impl CollisionConfig {
    /// Height of the character's feet when standing on the flat floor.
    pub fn floor_y(&self) -> f32 {
        self.ground_base_y + self.foot_offset
    }
}

/// Location loaded when the character crosses each map edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeLocations {
    pub north: String,
    pub south: String,
    pub east: String,
    pub west: String,
}

impl Default for EdgeLocations {
    fn default() -> Self {
        Self {
            north: "pijaoQuindio".to_owned(),
            south: "genovaQuindio".to_owned(),
            east: "armeniaQuindio".to_owned(),
            west: "salentoQuindio".to_owned(),
        }
    }
}

impl EdgeLocations {
    pub fn for_edge(&self, edge: MapEdge) -> &str {
        match edge {
            MapEdge::North => &self.north,
            MapEdge::South => &self.south,
            MapEdge::East => &self.east,
            MapEdge::West => &self.west,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub cooldown_ms: u64,
    pub offset_distance: f32,
    pub locations: EdgeLocations,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: AREA_LOAD_COOLDOWN.as_millis() as u64,
            offset_distance: AREA_OFFSET_DISTANCE,
            locations: EdgeLocations::default(),
        }
    }
}

impl StreamingConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    pub batch_size: usize,
    pub frustum_interval_ms: u64,
    pub frustum_threshold: f32,
    pub rotation_threshold: f32,
    pub max_distance: f32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            batch_size: FRUSTUM_BATCH_SIZE,
            frustum_interval_ms: FRUSTUM_INTERVAL_DESKTOP.as_millis() as u64,
            frustum_threshold: FRUSTUM_THRESHOLD_DESKTOP,
            rotation_threshold: FRUSTUM_ROTATION_THRESHOLD,
            max_distance: VISIBILITY_MAX_DISTANCE,
        }
    }
}

impl VisibilityConfig {
    pub fn frustum_interval(&self) -> Duration {
        Duration::from_millis(self.frustum_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub interval_ms: u64,
    pub position_epsilon: f32,
    pub interpolation_ms: u64,
    pub afk_timeout_ms: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            interval_ms: PRESENCE_INTERVAL_DESKTOP.as_millis() as u64,
            position_epsilon: PRESENCE_POSITION_EPSILON,
            interpolation_ms: REMOTE_INTERPOLATION.as_millis() as u64,
            afk_timeout_ms: AFK_TIMEOUT.as_millis() as u64,
        }
    }
}

impl PresenceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn interpolation(&self) -> Duration {
        Duration::from_millis(self.interpolation_ms)
    }

    pub fn afk_timeout(&self) -> Duration {
        Duration::from_millis(self.afk_timeout_ms)
    }
}
