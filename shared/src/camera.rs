//! Camera-relative movement transform.

use std::f32::consts::PI;
use std::time::Duration;

use crate::constants::{CAMERA_DIRECTION_INTERVAL, CAMERA_LIMITS_INTERVAL};
use crate::throttle::Throttle;
use crate::types::Vec3;

/// What the engine reports about the active camera this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub position: Vec3,
    /// Unit vector the camera looks along.
    pub forward: Vec3,
    /// Unit vector to the camera's right.
    pub right: Vec3,
    /// `(alpha, beta, radius)` for orbit cameras.
    pub orbit: Option<(f32, f32, f32)>,
}

/// Forward/right basis refreshed at a fixed cadence instead of every frame.
#[derive(Debug, Clone)]
pub struct CameraDirectionCache {
    forward: Vec3,
    right: Vec3,
    throttle: Throttle,
}

impl Default for CameraDirectionCache {
    fn default() -> Self {
        Self::new(CAMERA_DIRECTION_INTERVAL)
    }
}

impl CameraDirectionCache {
    pub fn new(interval: Duration) -> Self {
        Self {
            forward: Vec3::z(),
            right: Vec3::x(),
            throttle: Throttle::new(interval),
        }
    }

    /// Pulls a fresh basis from `camera` if the cache is due.
    pub fn refresh(&mut self, camera: &CameraSnapshot, now: Duration) {
        if self.throttle.try_fire(now) {
            self.forward = camera.forward.try_normalize(0.0).unwrap_or(self.forward);
            self.right = camera.right.try_normalize(0.0).unwrap_or(self.right);
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Camera-local `(x right, z forward)` to world. The `y` component of
    /// `local` is ignored; vertical motion is integrated separately.
    pub fn to_world(&self, local: &Vec3) -> Vec3 {
        self.right * local.x + self.forward * local.z
    }

    /// Area-load offset along the cached forward direction.
    pub fn direction_offset(&self, distance: f32) -> Vec3 {
        self.forward * distance
    }
}

/// Removes the radial component of `movement` so it stays on the sphere surface
/// at `position` (sphere centered at the origin).
pub fn project_to_tangent(movement: &Vec3, position: &Vec3) -> Vec3 {
    match position.try_normalize(0.0) {
        Some(up) => movement - up * movement.dot(&up),
        None => *movement,
    }
}

/// Orbit camera clamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitLimits {
    pub lower_beta: Option<f32>,
    pub upper_beta: f32,
    pub lower_radius: f32,
}

impl OrbitLimits {
    /// Pulled back and tilted down so the character stays in view while the
    /// stick is held.
    pub fn joystick() -> Self {
        Self {
            lower_beta: Some(PI / 3.0),
            upper_beta: PI / 2.5,
            lower_radius: 60.0,
        }
    }

    pub fn free() -> Self {
        Self {
            lower_beta: None,
            upper_beta: PI / 2.1,
            lower_radius: 5.0,
        }
    }
}

/// Reapplies orbit limits at a fixed cadence.
#[derive(Debug, Clone)]
pub struct OrbitLimitsController {
    throttle: Throttle,
}

impl Default for OrbitLimitsController {
    fn default() -> Self {
        Self {
            throttle: Throttle::new(CAMERA_LIMITS_INTERVAL),
        }
    }
}

impl OrbitLimitsController {
    /// Limits to apply this frame, or `None` while throttled.
    pub fn update(&mut self, joystick_active: bool, now: Duration) -> Option<OrbitLimits> {
        if !self.throttle.try_fire(now) {
            return None;
        }
        Some(if joystick_active {
            OrbitLimits::joystick()
        } else {
            OrbitLimits::free()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(forward: Vec3, right: Vec3) -> CameraSnapshot {
        CameraSnapshot {
            position: Vec3::zeros(),
            forward,
            right,
            orbit: None,
        }
    }

    #[test]
    fn local_forward_maps_to_camera_forward() {
        let mut cache = CameraDirectionCache::default();
        cache.refresh(
            &snapshot(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
            Duration::ZERO,
        );
        let world = cache.to_world(&Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(world, Vec3::new(-1.0, 0.0, 0.0));
        let world = cache.to_world(&Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(world, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn cache_ignores_camera_between_refreshes() {
        let mut cache = CameraDirectionCache::default();
        cache.refresh(&snapshot(Vec3::z(), Vec3::x()), Duration::ZERO);
        cache.refresh(&snapshot(Vec3::x(), -Vec3::z()), Duration::from_millis(20));
        assert_eq!(cache.forward(), Vec3::z());
        cache.refresh(&snapshot(Vec3::x(), -Vec3::z()), Duration::from_millis(50));
        assert_eq!(cache.forward(), Vec3::x());
    }

    #[test]
    fn tangent_projection_drops_radial_part() {
        let position = Vec3::new(0.0, 200.0, 0.0);
        let projected = project_to_tangent(&Vec3::new(1.0, 5.0, 2.0), &position);
        assert_eq!(projected, Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn limits_follow_joystick_at_throttled_rate() {
        let mut limits = OrbitLimitsController::default();
        assert_eq!(
            limits.update(true, Duration::ZERO),
            Some(OrbitLimits::joystick())
        );
        assert_eq!(limits.update(false, Duration::from_millis(100)), None);
        assert_eq!(
            limits.update(false, Duration::from_millis(200)),
            Some(OrbitLimits::free())
        );
    }
}
