//! Gravity, jump and flight integration plus grounded detection.

use crate::collision::CollisionWorld;
use crate::config::{CollisionConfig, VerticalConfig};
use crate::input::MovementIntent;
use crate::types::{CharacterState, Vec3, WorldMode};

/// Result of the vertical stage for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMotion {
    /// Vertical displacement to sweep this frame.
    pub dy: f32,
    pub jumped: bool,
}

/// Whether `character` is standing on something.
///
/// Flat worlds cast straight down from just above the character and also treat
/// anything at or below the floor reference as ground. Planet worlds always are.
pub fn cast_ground_ray(
    world: &dyn CollisionWorld,
    character: &CharacterState,
    mode: WorldMode,
    vertical: &VerticalConfig,
    collision: &CollisionConfig,
) -> bool {
    if mode.is_planet() {
        return true;
    }

    let on_floor = character.position.y <= collision.floor_y() + vertical.flat_tolerance;
    if on_floor {
        return true;
    }

    let origin = character.position + Vec3::new(0.0, vertical.ray_lift, 0.0);
    world
        .cast_ray_down(&origin, vertical.ray_length)
        .is_some_and(|distance| distance <= vertical.hit_tolerance)
}

/// Applies flight toggles and jumps from `intent`, refreshes `grounded`, and
/// advances the vertical velocity by one frame.
///
/// `scale` converts per-reference-frame quantities to this frame.
pub fn integrate(
    character: &mut CharacterState,
    intent: &MovementIntent,
    world: &dyn CollisionWorld,
    mode: WorldMode,
    vertical: &VerticalConfig,
    collision: &CollisionConfig,
    scale: f32,
) -> VerticalMotion {
    if intent.toggle_flight {
        character.flying = !character.flying;
        if character.flying {
            character.vertical_velocity = 0.0;
            character.grounded = false;
        }
        log::info!("flight mode {}", if character.flying { "on" } else { "off" });
    }

    let mut jumped = false;
    if let Some(impulse) = intent.jump.filter(|_| !character.flying) {
        character.vertical_velocity = impulse;
        character.grounded = false;
        jumped = true;
    }

    if !jumped {
        character.grounded = cast_ground_ray(world, character, mode, vertical, collision);
    }

    if character.flying {
        character.vertical_velocity = 0.0;
        return VerticalMotion {
            dy: intent.ascend * scale,
            jumped,
        };
    }

    if mode.is_planet() {
        character.vertical_velocity = 0.0;
        return VerticalMotion { dy: 0.0, jumped };
    }

    let dy = if character.grounded && character.vertical_velocity <= 0.0 {
        // Resting: keep pressing into the ground so slopes stay in contact.
        character.vertical_velocity = 0.0;
        vertical.gravity * scale
    } else {
        let dy = character.vertical_velocity * scale;
        character.vertical_velocity += vertical.gravity * scale;
        dy
    };

    VerticalMotion { dy, jumped }
}
