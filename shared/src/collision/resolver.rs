//! Per-frame move resolution.
//!
//! Order within one resolve:
//! 1. swept move through the [`CollisionWorld`]
//! 2. step-up retry when a grounded walk was nearly blocked
//! 3. map clamp (flat) or radial reprojection (planet)
//! 4. fall recovery, then floor snap (flat only)

use super::CollisionWorld;
use crate::config::CollisionConfig;
use crate::constants::MIN_INTENDED_TRAVEL;
use crate::types::{CharacterState, MapEdge, MapLimits, Vec3, WorldMode};

/// What the step-up heuristic did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    NotNeeded,
    /// Lifted, retried, and made enough progress.
    Climbed,
    /// The lifted retry was blocked too; the position was restored.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveOutcome {
    pub step: StepOutcome,
    /// Edge the character was clamped against, if it tried to leave the map.
    pub crossed: Option<MapEdge>,
    /// The character fell out of the world and was put back on the floor.
    pub recovered: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CollisionResolver {
    pub config: CollisionConfig,
}

fn horizontal_len(v: &Vec3) -> f32 {
    (v.x * v.x + v.z * v.z).sqrt()
}

impl CollisionResolver {
    pub fn new(config: CollisionConfig) -> Self {
        Self { config }
    }

    /// Moves `character` by `displacement` and applies every post-move rule.
    pub fn resolve(
        &self,
        world: &dyn CollisionWorld,
        character: &mut CharacterState,
        displacement: &Vec3,
        limits: &MapLimits,
        mode: WorldMode,
    ) -> ResolveOutcome {
        let before = character.position;
        character.position = world.move_with_collisions(&before, displacement);

        let step = self.try_step_up(world, character, &before, displacement);

        let crossed = match mode {
            WorldMode::Flat => clamp_to_limits(&mut character.position, limits),
            WorldMode::Planet { radius } => {
                if let Some(up) = character.position.try_normalize(0.0) {
                    character.position = up * radius;
                }
                None
            }
        };

        let mut recovered = false;
        if mode == WorldMode::Flat {
            let floor_y = self.config.floor_y();
            if character.position.y < self.config.ground_base_y - self.config.fall_recovery_margin {
                log::warn!(
                    "character fell out of the world at {:?}, resetting to floor",
                    character.position
                );
                character.land_at(floor_y);
                recovered = true;
            } else if character.position.y <= self.config.ground_base_y + self.config.floor_snap_band {
                character.land_at(floor_y);
            }
        }

        ResolveOutcome {
            step,
            crossed,
            recovered,
        }
    }

    fn try_step_up(
        &self,
        world: &dyn CollisionWorld,
        character: &mut CharacterState,
        before: &Vec3,
        displacement: &Vec3,
    ) -> StepOutcome {
        let intended = horizontal_len(displacement);
        let moved = horizontal_len(&(character.position - before));
        let blocked = intended > MIN_INTENDED_TRAVEL && moved < intended * self.config.blocked_ratio;
        if !blocked || !character.grounded || character.flying {
            return StepOutcome::NotNeeded;
        }

        let saved = character.position;
        let lifted = saved + Vec3::new(0.0, self.config.step_height, 0.0);
        let retry = Vec3::new(displacement.x, 0.0, displacement.z);
        let after = world.move_with_collisions(&lifted, &retry);

        if horizontal_len(&(after - lifted)) < intended * self.config.blocked_ratio {
            character.position = saved;
            StepOutcome::Rejected
        } else {
            character.position = after;
            character.position.y -= self.config.step_height * self.config.settle_ratio;
            StepOutcome::Climbed
        }
    }
}

/// Clamps `position` into `limits`. Returns the edge that was hit, preferring
/// north/south over east/west when a corner is crossed.
fn clamp_to_limits(position: &mut Vec3, limits: &MapLimits) -> Option<MapEdge> {
    let z_edge = if position.z > limits.north {
        position.z = limits.north;
        Some(MapEdge::North)
    } else if position.z < limits.south {
        position.z = limits.south;
        Some(MapEdge::South)
    } else {
        None
    };

    let x_edge = if position.x > limits.east {
        position.x = limits.east;
        Some(MapEdge::East)
    } else if position.x < limits.west {
        position.x = limits.west;
        Some(MapEdge::West)
    } else {
        None
    };

    z_edge.or(x_edge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::EmptyWorld;
    use std::cell::RefCell;

    /// Replays scripted move results and records every request.
    struct ScriptedWorld {
        results: RefCell<Vec<Vec3>>,
        calls: RefCell<Vec<(Vec3, Vec3)>>,
    }

    impl ScriptedWorld {
        fn new(results: Vec<Vec3>) -> Self {
            Self {
                results: RefCell::new(results),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CollisionWorld for ScriptedWorld {
        fn move_with_collisions(&self, position: &Vec3, displacement: &Vec3) -> Vec3 {
            self.calls.borrow_mut().push((*position, *displacement));
            let mut results = self.results.borrow_mut();
            if results.is_empty() {
                position + displacement
            } else {
                results.remove(0)
            }
        }

        fn cast_ray_down(&self, _origin: &Vec3, _max_distance: f32) -> Option<f32> {
            None
        }
    }

    fn standing_at(position: Vec3) -> CharacterState {
        CharacterState {
            grounded: true,
            ..CharacterState::spawn_at(position)
        }
    }

    #[test]
    fn blocked_walk_climbs_a_step() {
        let start = Vec3::new(0.0, 10.0, 0.0);
        let displacement = Vec3::new(1.0, -1.0, 0.0);
        let world = ScriptedWorld::new(vec![
            Vec3::new(0.1, 10.0, 0.0),
            Vec3::new(1.0, 10.9, 0.0),
        ]);
        let mut character = standing_at(start);

        let outcome = CollisionResolver::default().resolve(
            &world,
            &mut character,
            &displacement,
            &MapLimits::default(),
            WorldMode::Flat,
        );

        assert_eq!(outcome.step, StepOutcome::Climbed);
        let calls = world.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, Vec3::new(0.1, 10.9, 0.0));
        assert_eq!(calls[1].1, Vec3::new(1.0, 0.0, 0.0));
        assert!((character.position.y - (10.9 - 0.81)).abs() < 1.0e-4);
        assert_eq!(character.position.x, 1.0);
    }

    #[test]
    fn failed_step_restores_exact_position_and_retries_once() {
        let start = Vec3::new(0.0, 10.0, 0.0);
        let blocked_at = Vec3::new(0.05, 10.0, 0.0);
        let world = ScriptedWorld::new(vec![blocked_at, Vec3::new(0.1, 10.9, 0.0)]);
        let mut character = standing_at(start);

        let outcome = CollisionResolver::default().resolve(
            &world,
            &mut character,
            &Vec3::new(1.0, 0.0, 0.0),
            &MapLimits::default(),
            WorldMode::Flat,
        );

        assert_eq!(outcome.step, StepOutcome::Rejected);
        assert_eq!(character.position, blocked_at);
        assert_eq!(world.calls.borrow().len(), 2);
    }

    #[test]
    fn airborne_or_flying_never_steps() {
        for (grounded, flying) in [(false, false), (true, true)] {
            let world = ScriptedWorld::new(vec![Vec3::new(0.0, 10.0, 0.0)]);
            let mut character = CharacterState {
                grounded,
                flying,
                ..CharacterState::spawn_at(Vec3::new(0.0, 10.0, 0.0))
            };
            let outcome = CollisionResolver::default().resolve(
                &world,
                &mut character,
                &Vec3::new(1.0, 0.0, 0.0),
                &MapLimits::default(),
                WorldMode::Flat,
            );
            assert_eq!(outcome.step, StepOutcome::NotNeeded);
            assert_eq!(world.calls.borrow().len(), 1);
        }
    }

    #[test]
    fn clamps_to_east_edge_and_reports_it() {
        let mut character = standing_at(Vec3::new(99.5, 10.0, 0.0));
        let outcome = CollisionResolver::default().resolve(
            &EmptyWorld,
            &mut character,
            &Vec3::new(2.0, 0.0, 0.0),
            &MapLimits::default(),
            WorldMode::Flat,
        );
        assert_eq!(outcome.crossed, Some(MapEdge::East));
        assert_eq!(character.position.x, 100.0);
    }

    #[test]
    fn corner_crossing_reports_north() {
        let mut position = Vec3::new(150.0, 0.0, 6000.0);
        assert_eq!(
            clamp_to_limits(&mut position, &MapLimits::default()),
            Some(MapEdge::North)
        );
        assert_eq!(position, Vec3::new(100.0, 0.0, 5000.0));
    }

    #[test]
    fn fall_through_world_is_recovered() {
        let config = CollisionConfig::default();
        let mut character = CharacterState::spawn_at(Vec3::new(0.0, -540.0, 0.0));
        character.vertical_velocity = -30.0;
        let outcome = CollisionResolver::new(config.clone()).resolve(
            &EmptyWorld,
            &mut character,
            &Vec3::new(0.0, -20.0, 0.0),
            &MapLimits::default(),
            WorldMode::Flat,
        );
        assert!(outcome.recovered);
        assert_eq!(character.position.y, config.floor_y());
        assert_eq!(character.vertical_velocity, 0.0);
        assert!(character.grounded);
    }

    #[test]
    fn near_floor_snaps_without_recovery() {
        let config = CollisionConfig::default();
        let mut character = CharacterState::spawn_at(Vec3::new(0.0, -497.0, 0.0));
        let outcome = CollisionResolver::new(config.clone()).resolve(
            &EmptyWorld,
            &mut character,
            &Vec3::new(0.0, -1.5, 0.0),
            &MapLimits::default(),
            WorldMode::Flat,
        );
        assert!(!outcome.recovered);
        assert_eq!(character.position.y, config.floor_y());
        assert!(character.grounded);
    }

    #[test]
    fn planet_move_is_reprojected_to_radius() {
        let mut character = standing_at(Vec3::new(0.0, 200.0, 0.0));
        let outcome = CollisionResolver::default().resolve(
            &EmptyWorld,
            &mut character,
            &Vec3::new(3.0, 0.0, 4.0),
            &MapLimits::default(),
            WorldMode::Planet { radius: 200.0 },
        );
        assert_eq!(outcome.crossed, None);
        assert!((character.position.norm() - 200.0).abs() < 1.0e-3);
    }
}
