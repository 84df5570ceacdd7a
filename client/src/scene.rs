//! Scene composition: owns the movement loop and runs it once per frame.
//!
//! Every other plugin reads [`LastFrame`] after [`SceneSet::Tick`] or writes
//! inputs before it.

use std::path::{Path, PathBuf};

use bevy::camera::primitives::{Frustum as CameraFrustum, Sphere};
use bevy::math::Vec3A;
use bevy::prelude::*;
use pueblo_shared::diagnostics::DebugCapabilities;
use pueblo_shared::input::JoystickSample;
use pueblo_shared::presence::SequentialIds;
use pueblo_shared::visibility::{Frustum, SceneMesh};
use pueblo_shared::{
    ControllerConfig, DeviceClass, FrameContext, FrameReport, MapLimits, RapierCollisionWorld,
    SceneController, SceneSetup, WorldMode,
};

use crate::camera::MainCamera;
use crate::server::{SpacetimeDB, StdbPresenceStore};

pub const START_PLACE: &str = "casa";
/// Homes and farms use the orbit camera.
pub const START_LOCATION_TYPE: &str = "base";

pub(super) fn plugin(app: &mut App) {
    app.configure_sets(
        Update,
        (SceneSet::Input, SceneSet::Tick, SceneSet::Apply).chain(),
    );
    app.init_resource::<JoystickInput>();
    app.init_resource::<PlayerActivity>();
    app.init_resource::<LastFrame>();
    app.add_systems(PreStartup, setup_scene);
    app.add_systems(Update, tick_scene.in_set(SceneSet::Tick));
}

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneSet {
    /// Feed keyboard, stick and pointer state into the controller.
    Input,
    Tick,
    /// Mirror the controller's results onto entities.
    Apply,
}

/// The movement loop. Presence writes go through the SpacetimeDB link.
#[derive(Resource)]
pub struct Scene {
    pub controller: SceneController,
}

#[derive(Resource)]
pub struct CollisionWorldRes(pub RapierCollisionWorld);

/// Stick sample for this frame, written by the input plugin.
#[derive(Resource, Default)]
pub struct JoystickInput(pub Option<JoystickSample>);

/// Set by anything that counts as player activity this frame.
#[derive(Resource, Default)]
pub struct PlayerActivity(pub bool);

#[derive(Resource, Default)]
pub struct LastFrame(pub Option<FrameReport>);

/// Registry id of the entity's mesh in the visibility optimizer.
#[derive(Component, Clone, Copy, Debug)]
pub struct SceneMeshId(pub u32);

pub fn to_na(v: Vec3) -> pueblo_shared::Vec3 {
    pueblo_shared::Vec3::new(v.x, v.y, v.z)
}

pub fn to_bevy(v: &pueblo_shared::Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn device_class() -> DeviceClass {
    if cfg!(any(target_os = "android", target_os = "ios")) {
        DeviceClass::Mobile
    } else {
        DeviceClass::Desktop
    }
}

/// `BEVY_ASSET_ROOT` if set, else the crate's `assets/` directory.
pub fn asset_root() -> PathBuf {
    std::env::var_os("BEVY_ASSET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).to_path_buf())
        .join("assets")
}

fn config_path() -> PathBuf {
    asset_root().join("config").join("controller.json")
}

fn load_config(device: DeviceClass) -> ControllerConfig {
    let path = config_path();
    let json = match std::fs::read_to_string(&path) {
        Ok(json) => json,
        Err(err) => {
            info!("no controller config at {} ({err}), using defaults", path.display());
            return ControllerConfig::for_device(device);
        }
    };
    ControllerConfig::from_json(device, &json).unwrap_or_else(|err| {
        warn!("controller config {} is invalid ({err}), using defaults", path.display());
        ControllerConfig::for_device(device)
    })
}

fn debug_capabilities() -> DebugCapabilities {
    if cfg!(feature = "dev") {
        DebugCapabilities::all()
    } else {
        DebugCapabilities::disabled()
    }
}

fn setup_scene(mut commands: Commands, time: Res<Time>) {
    let device = device_class();
    let config = load_config(device);
    let spawn = pueblo_shared::Vec3::new(0.0, config.collision.floor_y(), 0.0);
    let launch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let setup = SceneSetup {
        config,
        mode: WorldMode::Flat,
        place: START_PLACE.to_owned(),
        limits: MapLimits::default(),
        spawn,
        profile: None,
        debug: debug_capabilities(),
        ids: Box::new(SequentialIds::new(format!("{launch:x}"))),
    };
    let controller = SceneController::new(setup, time.elapsed());
    commands.insert_resource(Scene { controller });
}

/// Bevy's view frustum, testing each mesh as a unit sphere at its position.
struct ViewFrustum<'a>(&'a CameraFrustum);

impl Frustum for ViewFrustum<'_> {
    fn contains(&self, mesh: &SceneMesh) -> bool {
        let sphere = Sphere {
            center: Vec3A::new(mesh.position.x, mesh.position.y, mesh.position.z),
            radius: 1.0,
        };
        self.0.intersects_sphere(&sphere, true)
    }
}

fn tick_scene(
    time: Res<Time>,
    mut scene: ResMut<Scene>,
    stdb: SpacetimeDB,
    world: Res<CollisionWorldRes>,
    joystick: Res<JoystickInput>,
    mut activity: ResMut<PlayerActivity>,
    mut last: ResMut<LastFrame>,
    camera: Query<(&GlobalTransform, &CameraFrustum, Option<&crate::camera::OrbitRig>), With<MainCamera>>,
) {
    let view = camera.single().ok();
    let snapshot = view.map(|(transform, _, rig)| pueblo_shared::camera::CameraSnapshot {
        position: to_na(transform.translation()),
        forward: to_na(*transform.forward()),
        right: to_na(*transform.right()),
        orbit: rig.map(|rig| (rig.alpha, rig.beta, rig.radius)),
    });
    let frustum = view.map(|(_, frustum, _)| ViewFrustum(frustum));

    let frame = FrameContext {
        now: time.elapsed(),
        dt: time.delta_secs(),
        camera: snapshot,
        joystick: joystick.0,
        frustum: frustum.as_ref().map(|f| f as &dyn Frustum),
        activity: activity.0,
    };

    let mut store = StdbPresenceStore::new(&stdb);
    last.0 = Some(scene.controller.tick(&frame, &world.0, &mut store));
    activity.0 = false;
}
