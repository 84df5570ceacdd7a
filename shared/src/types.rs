//! Plain data shared by every stage of the movement loop.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::{GROUND_BASE_Y, GROUND_FOOT_OFFSET, PLANET_RADIUS};

pub type Vec3 = Vector3<f32>;

/// The locally controlled character.
///
/// Created when a scene loads and dropped on teardown. `rotation` holds Euler
/// angles in radians; only `rotation.y` (yaw) is driven by the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterState {
    pub position: Vec3,
    pub rotation: Vec3,
    pub grounded: bool,
    pub vertical_velocity: f32,
    pub flying: bool,
}

impl CharacterState {
    pub fn spawn_at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::zeros(),
            grounded: false,
            vertical_velocity: 0.0,
            flying: false,
        }
    }

    /// Puts the character's feet on the flat floor with no vertical motion.
    pub fn land_at(&mut self, floor_y: f32) {
        self.position.y = floor_y;
        self.vertical_velocity = 0.0;
        self.grounded = true;
    }
}

impl Default for CharacterState {
    fn default() -> Self {
        Self::spawn_at(Vec3::new(0.0, GROUND_BASE_Y + GROUND_FOOT_OFFSET, 0.0))
    }
}

/// Axis-aligned playable rectangle on the XZ plane.
///
/// `north`/`south` bound z, `east`/`west` bound x.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapLimits {
    pub north: f32,
    pub south: f32,
    pub east: f32,
    pub west: f32,
}

impl Default for MapLimits {
    fn default() -> Self {
        Self {
            north: 5000.0,
            south: -5000.0,
            east: 100.0,
            west: -100.0,
        }
    }
}

impl MapLimits {
    pub fn contains(&self, position: &Vec3) -> bool {
        position.x >= self.west
            && position.x <= self.east
            && position.z >= self.south
            && position.z <= self.north
    }

    /// The same rectangle moved by `offset` on the XZ plane.
    pub fn translated(&self, offset: &Vec3) -> Self {
        Self {
            north: self.north + offset.z,
            south: self.south + offset.z,
            east: self.east + offset.x,
            west: self.west + offset.x,
        }
    }
}

/// One side of [`MapLimits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapEdge {
    North,
    South,
    East,
    West,
}

/// Shape of the playable world.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WorldMode {
    /// Flat ground bounded by [`MapLimits`].
    #[default]
    Flat,
    /// Sphere centered at the origin; the character walks on its surface.
    Planet { radius: f32 },
}

impl WorldMode {
    pub fn planet() -> Self {
        Self::Planet {
            radius: PLANET_RADIUS,
        }
    }

    pub fn is_planet(&self) -> bool {
        matches!(self, Self::Planet { .. })
    }
}

/// Which camera rig the scene uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraKind {
    /// Third-person orbit around the character. Angles in radians.
    Orbit { alpha: f32, beta: f32, radius: f32 },
    FreeFly,
}

impl CameraKind {
    /// Camera rig for a location type. Homes (`base`) and farms (`finca`) orbit
    /// the character; every other place uses the free camera.
    pub fn for_location_type(location_type: &str) -> Self {
        match location_type {
            "base" | "finca" => Self::Orbit {
                alpha: std::f32::consts::FRAC_PI_2,
                beta: std::f32::consts::FRAC_PI_4,
                radius: 40.0,
            },
            _ => Self::FreeFly,
        }
    }
}

/// Whether the player is on a touch device. Several cadences and gains differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

/// Public identity of a player in the presence store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub email: String,
}

impl PlayerProfile {
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "Anónimo".to_owned(),
            description: "Usuario anónimo".to_owned(),
            email: " ".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_are_the_valley_strip() {
        let limits = MapLimits::default();
        assert!(limits.contains(&Vec3::new(0.0, 0.0, 0.0)));
        assert!(limits.contains(&Vec3::new(100.0, 0.0, 5000.0)));
        assert!(!limits.contains(&Vec3::new(100.5, 0.0, 0.0)));
        assert!(!limits.contains(&Vec3::new(0.0, 0.0, -5000.5)));
    }

    #[test]
    fn translated_limits_move_on_xz_only() {
        let moved = MapLimits::default().translated(&Vec3::new(10.0, 99.0, -20.0));
        assert_eq!(moved.east, 110.0);
        assert_eq!(moved.west, -90.0);
        assert_eq!(moved.north, 4980.0);
        assert_eq!(moved.south, -5020.0);
    }

    #[test]
    fn only_homes_and_farms_orbit() {
        assert!(matches!(
            CameraKind::for_location_type("finca"),
            CameraKind::Orbit { .. }
        ));
        assert!(matches!(
            CameraKind::for_location_type("base"),
            CameraKind::Orbit { .. }
        ));
        assert_eq!(CameraKind::for_location_type("pueblo"), CameraKind::FreeFly);
    }

    #[test]
    fn anonymous_profile_defaults() {
        let profile = PlayerProfile::anonymous("abc");
        assert_eq!(profile.name, "Anónimo");
        assert_eq!(profile.description, "Usuario anónimo");
        assert_eq!(profile.email, " ");
    }
}
