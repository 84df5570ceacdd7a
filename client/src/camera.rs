use bevy::input::mouse::MouseMotion;
use bevy::{camera::Exposure, prelude::*};
use pueblo_shared::camera::OrbitLimits;
use pueblo_shared::CameraKind;

use crate::character::LocalCharacter;
use crate::input::Pointer;
use crate::scene::{LastFrame, START_LOCATION_TYPE, START_PLACE, SceneSet};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, add_camera);
    app.add_systems(
        Update,
        (apply_orbit_limits, drag_orbit, follow_player)
            .chain()
            .in_set(SceneSet::Apply),
    );
}

#[derive(Component)]
pub struct MainCamera;

/// Third-person orbit around the character. Angles in radians.
#[derive(Component, Debug, Clone)]
pub struct OrbitRig {
    pub alpha: f32,
    pub beta: f32,
    pub radius: f32,
    pub limits: OrbitLimits,
}

impl OrbitRig {
    fn clamp(&mut self) {
        if let Some(lower) = self.limits.lower_beta {
            self.beta = self.beta.max(lower);
        }
        self.beta = self.beta.min(self.limits.upper_beta);
        self.radius = self.radius.max(self.limits.lower_radius);
    }

    fn offset(&self) -> Vec3 {
        Vec3::new(
            self.radius * self.alpha.cos() * self.beta.sin(),
            self.radius * self.beta.cos(),
            self.radius * self.alpha.sin() * self.beta.sin(),
        )
    }
}

const FREE_CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 12.0, -20.0);
const CAMERA_DECAY_RATE: f32 = 44.0;
const DRAG_SENSITIVITY: f32 = 0.005;

fn add_camera(mut commands: Commands) {
    let mut camera = commands.spawn((
        MainCamera,
        Exposure { ev100: 13.0 },
        Camera3d::default(),
        Transform::from_translation(FREE_CAMERA_OFFSET).looking_at(Vec3::ZERO, Vec3::Y),
        DistanceFog {
            color: Color::srgba(0.35, 0.48, 0.66, 1.0),
            directional_light_color: Color::srgba(1.0, 0.95, 0.85, 0.5),
            directional_light_exponent: 30.0,
            falloff: FogFalloff::from_visibility_colors(
                600.0,
                Color::srgb(0.35, 0.5, 0.66),
                Color::srgb(0.8, 0.8, 0.7),
            ),
        },
    ));

    if let CameraKind::Orbit {
        alpha,
        beta,
        radius,
    } = CameraKind::for_location_type(START_LOCATION_TYPE)
    {
        camera.insert(OrbitRig {
            alpha,
            beta,
            radius,
            limits: OrbitLimits::free(),
        });
    }
    info!("camera ready for {START_PLACE}");
}

fn apply_orbit_limits(last: Res<LastFrame>, mut rigs: Query<&mut OrbitRig>) {
    let Some(limits) = last.0.as_ref().and_then(|report| report.orbit_limits) else {
        return;
    };
    for mut rig in &mut rigs {
        rig.limits = limits;
        rig.clamp();
    }
}

fn drag_orbit(
    pointer: Res<Pointer>,
    mut motion: MessageReader<MouseMotion>,
    mut rigs: Query<&mut OrbitRig>,
) {
    let delta: Vec2 = motion.read().map(|m| m.delta).sum();
    if !pointer.dragging || delta == Vec2::ZERO {
        return;
    }
    for mut rig in &mut rigs {
        rig.alpha -= delta.x * DRAG_SENSITIVITY;
        rig.beta -= delta.y * DRAG_SENSITIVITY;
        rig.clamp();
    }
}

fn follow_player(
    mut camera: Query<(&mut Transform, Option<&OrbitRig>), With<MainCamera>>,
    player: Single<&Transform, (With<LocalCharacter>, Without<MainCamera>)>,
    time: Res<Time>,
) {
    let Ok((mut cam_tf, rig)) = camera.single_mut() else {
        return;
    };

    let focus = player.translation;
    match rig {
        Some(rig) => {
            cam_tf.translation = focus + rig.offset();
        }
        None => {
            let target = focus + FREE_CAMERA_OFFSET;
            cam_tf
                .translation
                .smooth_nudge(&target, CAMERA_DECAY_RATE, time.delta_secs());
        }
    }
    cam_tf.look_at(focus, Vec3::Y);
}
