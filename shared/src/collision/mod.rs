/*!
Collision root module.

- resolver:     per-frame move resolution (step-up retry, map clamp, planet
                reprojection, floor snap and fall recovery)
- rapier_world: a `CollisionWorld` backed by Rapier's kinematic character
                controller over immutable static geometry

The resolver only talks to the engine through [`CollisionWorld`], so any
physics backend (or a scripted test world) can drive it.
*/

pub mod rapier_world;
pub mod resolver;

pub use rapier_world::{ColliderShapeDef, RapierCollisionWorld, RapierQueryWorld, WorldStaticDef};
pub use resolver::{CollisionResolver, ResolveOutcome, StepOutcome};

use crate::types::Vec3;

/// Engine collision primitives used by the movement loop.
pub trait CollisionWorld {
    /// Sweeps the character from `position` by `displacement`, stopping or
    /// sliding at collidable geometry. Returns the resulting position.
    fn move_with_collisions(&self, position: &Vec3, displacement: &Vec3) -> Vec3;

    /// Distance from `origin` straight down to the first collidable surface
    /// within `max_distance`.
    fn cast_ray_down(&self, origin: &Vec3, max_distance: f32) -> Option<f32>;
}

/// No geometry at all. Moves always succeed and rays never hit.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyWorld;

impl CollisionWorld for EmptyWorld {
    fn move_with_collisions(&self, position: &Vec3, displacement: &Vec3) -> Vec3 {
        position + displacement
    }

    fn cast_ray_down(&self, _origin: &Vec3, _max_distance: f32) -> Option<f32> {
        None
    }
}
