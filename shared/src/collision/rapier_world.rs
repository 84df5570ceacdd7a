//! Rapier-backed [`CollisionWorld`] over immutable static geometry.
//!
//! The client maps the ground plane and every `collision*` proxy mesh of the
//! loaded placements to [`WorldStaticDef`]s, then builds one of these. When an
//! area streams in, the world is rebuilt from the new set.

use rapier3d::control::{CharacterLength, KinematicCharacterController};
use rapier3d::na::{Translation3, UnitQuaternion};
use rapier3d::prelude::*;

use super::CollisionWorld;
use crate::constants::{CAPSULE_HALF_HEIGHT, CAPSULE_RADIUS, REFERENCE_TICK_HZ};
use crate::types::Vec3;

/// Schema-agnostic definition of one static collider.
///
/// Units are meters; for planes the normal is `rotation * +Y` and the plane
/// passes through `translation`.
#[derive(Clone, Debug)]
pub struct WorldStaticDef {
    /// Stable id; insertion happens in id order.
    pub id: u32,
    pub translation: Vector<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub shape: ColliderShapeDef,
}

#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite half-space.
    Plane,
    Cuboid { half_extents: Vector<f32> },
    Sphere { radius: f32 },
    CylinderY { radius: f32, half_height: f32 },
}

impl WorldStaticDef {
    /// Horizontal ground plane at height `y`.
    pub fn ground(id: u32, y: f32) -> Self {
        Self {
            id,
            translation: vector![0.0, y, 0.0],
            rotation: UnitQuaternion::identity(),
            shape: ColliderShapeDef::Plane,
        }
    }

    /// Box around `center`, turned `yaw` radians about +Y.
    pub fn cuboid(id: u32, center: Vec3, half_extents: Vec3, yaw: f32) -> Self {
        Self {
            id,
            translation: center,
            rotation: UnitQuaternion::from_axis_angle(&Vector::y_axis(), yaw),
            shape: ColliderShapeDef::Cuboid { half_extents },
        }
    }

    fn collider(&self) -> Collider {
        match &self.shape {
            // Local +Y; the parent body's pose carries the rotation.
            ColliderShapeDef::Plane => {
                ColliderBuilder::new(SharedShape::new(HalfSpace::new(Vector::y_axis()))).build()
            }
            ColliderShapeDef::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z).build()
            }
            ColliderShapeDef::Sphere { radius } => ColliderBuilder::ball(*radius).build(),
            ColliderShapeDef::CylinderY {
                radius,
                half_height,
            } => ColliderBuilder::cylinder(*half_height, *radius).build(),
        }
    }

    fn is_finite(&self) -> bool {
        let extents_ok = match &self.shape {
            ColliderShapeDef::Plane => true,
            ColliderShapeDef::Cuboid { half_extents } => {
                half_extents.iter().all(|v| v.is_finite() && *v > 0.0)
            }
            ColliderShapeDef::Sphere { radius } => radius.is_finite() && *radius > 0.0,
            ColliderShapeDef::CylinderY {
                radius,
                half_height,
            } => radius.is_finite() && half_height.is_finite() && *radius > 0.0,
        };
        extents_ok && self.translation.iter().all(|v| v.is_finite())
    }
}

/// Rapier sets needed for scene queries against a static world.
pub struct RapierQueryWorld {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub broad_phase: BroadPhaseBvh,
    pub narrow_phase: NarrowPhase,
}

impl RapierQueryWorld {
    /// Builds the world from `defs`. Non-finite definitions are logged and skipped.
    pub fn build(mut defs: Vec<WorldStaticDef>) -> Self {
        defs.sort_by_key(|d| d.id);

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        for def in defs {
            if !def.is_finite() {
                log::warn!("skipping static collider {} with non-finite geometry", def.id);
                continue;
            }
            let pose = Isometry::from_parts(Translation3::from(def.translation), def.rotation);
            let body = bodies.insert(RigidBodyBuilder::fixed().pose(pose).build());
            colliders.insert_with_parent(def.collider(), body, &mut bodies);
        }

        // Collision detection only: fills the BVH so queries can run.
        let mut broad_phase = BroadPhaseBvh::new();
        let mut narrow_phase = NarrowPhase::new();
        CollisionPipeline::new().step(
            0.0,
            &mut broad_phase,
            &mut narrow_phase,
            &mut bodies,
            &mut colliders,
            &(),
            &(),
        );

        Self {
            bodies,
            colliders,
            broad_phase,
            narrow_phase,
        }
    }

    pub fn query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

/// Capsule character swept with Rapier's kinematic character controller.
///
/// Autostep and ground snapping are off; stepping is handled by
/// [`super::CollisionResolver`].
pub struct RapierCollisionWorld {
    world: RapierQueryWorld,
    controller: KinematicCharacterController,
    capsule: Capsule,
}

impl RapierCollisionWorld {
    pub fn new(defs: Vec<WorldStaticDef>) -> Self {
        Self::with_capsule(defs, CAPSULE_HALF_HEIGHT, CAPSULE_RADIUS)
    }

    pub fn with_capsule(defs: Vec<WorldStaticDef>, half_height: f32, radius: f32) -> Self {
        let controller = KinematicCharacterController {
            autostep: None,
            snap_to_ground: None,
            offset: CharacterLength::Relative(0.025),
            ..KinematicCharacterController::default()
        };
        Self {
            world: RapierQueryWorld::build(defs),
            controller,
            capsule: Capsule::new_y(half_height, radius),
        }
    }

    /// Replaces the static geometry, keeping controller settings.
    pub fn rebuild(&mut self, defs: Vec<WorldStaticDef>) {
        self.world = RapierQueryWorld::build(defs);
        log::debug!("collision world rebuilt with {} colliders", self.world.collider_count());
    }

    pub fn query_world(&self) -> &RapierQueryWorld {
        &self.world
    }
}

impl CollisionWorld for RapierCollisionWorld {
    fn move_with_collisions(&self, position: &Vec3, displacement: &Vec3) -> Vec3 {
        let pipeline = self.world.query_pipeline(QueryFilter::default());
        let pose = Isometry::translation(position.x, position.y, position.z);
        let movement = self.controller.move_shape(
            1.0 / REFERENCE_TICK_HZ,
            &pipeline,
            &self.capsule,
            &pose,
            *displacement,
            |_| {},
        );
        position + movement.translation
    }

    fn cast_ray_down(&self, origin: &Vec3, max_distance: f32) -> Option<f32> {
        let pipeline = self.world.query_pipeline(QueryFilter::default());
        let ray = Ray::new(point![origin.x, origin.y, origin.z], vector![0.0, -1.0, 0.0]);
        pipeline
            .cast_ray(&ray, max_distance.max(0.0), true)
            .map(|(_, distance)| distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_and_wall() -> Vec<WorldStaticDef> {
        vec![
            WorldStaticDef::ground(1, 0.0),
            WorldStaticDef::cuboid(
                2,
                Vec3::new(3.0, 2.0, 0.0),
                Vec3::new(0.5, 2.0, 5.0),
                0.0,
            ),
        ]
    }

    #[test]
    fn ray_hits_ground_plane() {
        let world = RapierCollisionWorld::new(floor_and_wall());
        let distance = world
            .cast_ray_down(&Vec3::new(-5.0, 1.4, 0.0), 2.5)
            .expect("ground below");
        assert!((distance - 1.4).abs() < 1.0e-3);
        assert_eq!(world.cast_ray_down(&Vec3::new(-5.0, 3.0, 0.0), 2.5), None);
    }

    #[test]
    fn free_move_is_unobstructed() {
        let world = RapierCollisionWorld::new(floor_and_wall());
        let start = Vec3::new(-5.0, 2.0, 0.0);
        let end = world.move_with_collisions(&start, &Vec3::new(0.0, 0.0, 1.0));
        assert!((end.z - 1.0).abs() < 0.05);
        assert!((end.x + 5.0).abs() < 0.05);
    }

    #[test]
    fn wall_stops_the_capsule() {
        let world = RapierCollisionWorld::new(floor_and_wall());
        let start = Vec3::new(0.0, 2.0, 0.0);
        let end = world.move_with_collisions(&start, &Vec3::new(5.0, 0.0, 0.0));
        // Wall face at x = 2.5, capsule radius 0.35.
        assert!(end.x < 2.5 - CAPSULE_RADIUS + 0.05, "ended at {end:?}");
        assert!(end.x > 1.0);
    }

    #[test]
    fn non_finite_defs_are_skipped() {
        let mut defs = floor_and_wall();
        defs.push(WorldStaticDef::cuboid(
            3,
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            0.0,
        ));
        let world = RapierQueryWorld::build(defs);
        assert_eq!(world.collider_count(), 2);
    }
}
