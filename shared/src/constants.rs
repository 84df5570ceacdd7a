//! Movement-loop tuning defaults.
//!
//! Notes
//! - Distances are world units (meters), time is a [`Duration`] or seconds.
//! - Values marked "per reference frame" were tuned for a 60 Hz render loop. The
//!   pipeline scales them by `dt * REFERENCE_TICK_HZ`, so at 60 Hz they apply as-is.
//! - Per-actor overrides go through [`crate::config::ControllerConfig`]; these are
//!   only the defaults it is built from.

use std::time::Duration;

/// Render rate the per-frame constants were tuned for (Hz).
pub const REFERENCE_TICK_HZ: f32 = 60.0;

/// Upper bound for the frame scale so a long stall doesn't teleport the character.
pub const MAX_FRAME_SCALE: f32 = 3.0;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Joystick samples closer than this to the stick center are neutral (UI pixels).
pub const JOYSTICK_DEAD_ZONE: f32 = 5.0;

/// Joystick distance at which the stick counts as fully deflected (UI pixels).
pub const JOYSTICK_MAX_DISTANCE: f32 = 50.0;

/// Lower edge of the medium speed band (UI pixels).
pub const JOYSTICK_MEDIUM_BAND: f32 = 15.0;

/// Lower edge of the high speed band (UI pixels).
pub const JOYSTICK_HIGH_BAND: f32 = 50.0;

/// Joystick speed bands, per reference frame.
pub const SPEED_LOW: f32 = 0.5;
pub const SPEED_MEDIUM: f32 = 0.8;
pub const SPEED_HIGH: f32 = 1.3;

/// Flight-mode speed, per reference frame.
pub const SPEED_FLIGHT: f32 = 1.8;

/// Keyboard speed, per reference frame.
pub const SPEED_KEYBOARD: f32 = 2.0;

/// Joystick gain on touch devices.
pub const MOBILE_JOYSTICK_SENSITIVITY: f32 = 1.2;

/// Flight-mode ascent per reference frame with the stick fully deflected.
pub const FLIGHT_ASCEND_FAST: f32 = 0.5;

/// Flight-mode ascent per reference frame in the medium band.
pub const FLIGHT_ASCEND_SLOW: f32 = 0.2;

/// Vertical velocity set by a keyboard jump.
pub const KEYBOARD_JUMP_IMPULSE: f32 = 0.8;

/// Vertical velocity set by a full joystick deflection while grounded.
pub const JOYSTICK_JUMP_IMPULSE: f32 = 0.75;

/// Pointer presses shorter than this are clicks, longer ones are drags.
pub const CLICK_MAX_DURATION: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// How often the cached camera forward/right basis is refreshed.
pub const CAMERA_DIRECTION_INTERVAL: Duration = Duration::from_millis(50);

/// How often orbit camera limits are reapplied.
pub const CAMERA_LIMITS_INTERVAL: Duration = Duration::from_millis(200);

/// Distance along camera forward applied to streamed area content.
pub const AREA_OFFSET_DISTANCE: f32 = 100.0;

// ---------------------------------------------------------------------------
// Vertical motion
// ---------------------------------------------------------------------------

/// Gravity applied to the vertical velocity, per reference frame.
pub const GRAVITY_PER_FRAME: f32 = -1.0;

/// Ray origin offset above the character position for the ground ray.
pub const GROUND_RAY_LIFT: f32 = 0.1;

/// Ground ray length.
pub const GROUND_RAY_LENGTH: f32 = 2.5;

/// A ground ray hit closer than this (from the ray origin) counts as standing on it.
pub const GROUND_HIT_TOLERANCE: f32 = 1.6;

/// Slack above the flat-ground reference height that still counts as grounded.
pub const FLAT_GROUND_TOLERANCE: f32 = 0.05;

/// Y of the collision ground plane in flat-world mode.
pub const GROUND_BASE_Y: f32 = -500.0;

/// Character feet offset above the collision ground.
pub const GROUND_FOOT_OFFSET: f32 = 1.3;

/// Below `GROUND_BASE_Y + FLOOR_SNAP_BAND` the character is snapped onto the floor.
pub const FLOOR_SNAP_BAND: f32 = 2.0;

/// Below `GROUND_BASE_Y - FALL_RECOVERY_MARGIN` the character is teleported back.
pub const FALL_RECOVERY_MARGIN: f32 = 50.0;

// ---------------------------------------------------------------------------
// Collision
// ---------------------------------------------------------------------------

/// Fraction of intended horizontal travel below which a move counts as blocked.
pub const STEP_BLOCKED_RATIO: f32 = 0.2;

/// Temporary lift used when retrying a blocked move.
pub const STEP_HEIGHT: f32 = 0.9;

/// Fraction of `STEP_HEIGHT` given back after a successful step.
pub const STEP_SETTLE_RATIO: f32 = 0.9;

/// Horizontal intent shorter than this never triggers a step attempt.
pub const MIN_INTENDED_TRAVEL: f32 = 1.0e-4;

/// Character capsule radius.
pub const CAPSULE_RADIUS: f32 = 0.35;

/// Character capsule cylinder half height. With the radius this puts the feet
/// `GROUND_FOOT_OFFSET` below the capsule center.
pub const CAPSULE_HALF_HEIGHT: f32 = 0.95;

/// Default planet radius for spherical worlds.
pub const PLANET_RADIUS: f32 = 200.0;

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// Time after an area load finishes before another may start.
pub const AREA_LOAD_COOLDOWN: Duration = Duration::from_millis(1000);

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Meshes evaluated per frustum update.
pub const FRUSTUM_BATCH_SIZE: usize = 20;

/// Frustum update interval and camera-move threshold on desktop.
pub const FRUSTUM_INTERVAL_DESKTOP: Duration = Duration::from_millis(200);
pub const FRUSTUM_THRESHOLD_DESKTOP: f32 = 1.0;

/// Frustum update interval and camera-move threshold on mobile.
pub const FRUSTUM_INTERVAL_MOBILE: Duration = Duration::from_millis(300);
pub const FRUSTUM_THRESHOLD_MOBILE: f32 = 2.0;

/// Minimum orbit (alpha, beta, radius) change that forces a frustum update.
pub const FRUSTUM_ROTATION_THRESHOLD: f32 = 0.1;

/// Parents farther than this from the player are hidden.
pub const VISIBILITY_MAX_DISTANCE: f32 = 150.0;

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Presence write cadence on desktop.
pub const PRESENCE_INTERVAL_DESKTOP: Duration = Duration::from_millis(100);

/// Presence write cadence on mobile.
pub const PRESENCE_INTERVAL_MOBILE: Duration = Duration::from_millis(250);

/// Per-axis movement below this is not worth a presence write.
pub const PRESENCE_POSITION_EPSILON: f32 = 0.005;

/// Remote proxies glide to a new snapshot position over this long.
pub const REMOTE_INTERPOLATION: Duration = Duration::from_millis(500);

/// Inactivity after which the local presence record is removed.
pub const AFK_TIMEOUT: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Animation / facing
// ---------------------------------------------------------------------------

/// How often the facing rotation follows the movement direction.
pub const FACING_INTERVAL: Duration = Duration::from_millis(50);

/// How often the FPS average is recomputed.
pub const FPS_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);
