//! Ground, static area content, and the collision world built from them.
//!
//! Models are drawn as boxes sized by their placement scale.

use bevy::prelude::*;
use pueblo_shared::placement::{PlacementRecord, is_collision_proxy, load_area};
use pueblo_shared::streaming::AreaLoadRequest;
use pueblo_shared::visibility::SceneMesh;
use pueblo_shared::{RapierCollisionWorld, WorldStaticDef};

use crate::presence::RemoteEntityMapping;
use crate::scene::{
    CollisionWorldRes, LastFrame, START_PLACE, Scene, SceneMeshId, SceneSet, asset_root, to_bevy,
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<NextMeshId>();
    app.init_resource::<PendingAreaLoads>();
    app.init_resource::<CurrentArea>();
    app.add_systems(Startup, setup);
    app.add_systems(Update, complete_area_loads.in_set(SceneSet::Input));
    app.add_systems(Update, queue_area_loads.in_set(SceneSet::Apply));
}

/// Ids for [`pueblo_shared::visibility::MeshRegistry`] entries.
#[derive(Resource, Default)]
pub struct NextMeshId(u32);

impl NextMeshId {
    pub fn next(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

/// Entities spawned from an area file; replaced when a new area streams in.
#[derive(Component)]
pub struct AreaContent;

/// Placements of the area the player stands in, as loaded.
#[derive(Resource, Default)]
pub struct CurrentArea(pub Vec<PlacementRecord>);

/// Requests issued this frame, completed at the start of the next one.
#[derive(Resource, Default)]
struct PendingAreaLoads(Vec<AreaLoadRequest>);

#[derive(Resource)]
struct PlacementAssets {
    mesh: Handle<Mesh>,
    material: Handle<StandardMaterial>,
}

const GROUND_SIZE: f32 = 12_000.0;

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut scene: ResMut<Scene>,
    mut ids: ResMut<NextMeshId>,
    mut area: ResMut<CurrentArea>,
) {
    let ground_y = scene.controller.config().collision.ground_base_y;
    let ground_at = pueblo_shared::Vec3::new(0.0, ground_y, 0.0);

    let visible_id = ids.next();
    commands.spawn((
        SceneMeshId(visible_id),
        Transform::from_xyz(0.0, ground_y, 0.0),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(GROUND_SIZE, GROUND_SIZE).build())),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::linear_rgb(0.2, 0.3, 0.25),
            perceptual_roughness: 1.0,
            metallic: 0.0,
            ..default()
        })),
    ));

    let collision_id = ids.next();
    let mut collision_ground = SceneMesh::new(collision_id, "collisionGround", ground_at);
    collision_ground.visible = false;
    collision_ground.check_collisions = true;

    let registry = scene.controller.registry_mut();
    registry.insert(SceneMesh::new(visible_id, "visibleGround", ground_at));
    registry.insert(collision_ground);

    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(40.0, ground_y + 80.0, 40.0).looking_at(Vec3::new(0.0, ground_y, 0.0), Vec3::Y),
    ));

    let assets = PlacementAssets {
        mesh: meshes.add(Cuboid::new(1.0, 1.0, 1.0)),
        material: materials.add(Color::srgb_u8(196, 176, 150)),
    };

    let placements = match load_area(&asset_root(), START_PLACE) {
        Ok(document) => document.arquitectura,
        Err(err) => {
            warn!("starting area {START_PLACE} could not be loaded: {err}");
            Vec::new()
        }
    };
    spawn_placements(&mut commands, &assets, &mut scene, &mut ids, &placements);
    commands.insert_resource(CollisionWorldRes(RapierCollisionWorld::new(collision_defs(
        ground_y,
        &placements,
    ))));
    commands.insert_resource(assets);
    scene.controller.refresh_visibility();
    area.0 = placements;
}

/// Ground plane plus one box collider per placement.
fn collision_defs(ground_y: f32, placements: &[PlacementRecord]) -> Vec<WorldStaticDef> {
    let mut defs = vec![WorldStaticDef::ground(0, ground_y)];
    for (index, placement) in placements.iter().enumerate() {
        let half = placement.scaling * 0.5;
        let center = placement.position + pueblo_shared::Vec3::new(0.0, half.y, 0.0);
        defs.push(WorldStaticDef::cuboid(
            index as u32 + 1,
            center,
            half,
            placement.rotation.y,
        ));
    }
    defs
}

fn spawn_placements(
    commands: &mut Commands,
    assets: &PlacementAssets,
    scene: &mut Scene,
    ids: &mut NextMeshId,
    placements: &[PlacementRecord],
) {
    for placement in placements {
        let id = ids.next();
        let scale = to_bevy(&placement.scaling);
        let center = to_bevy(&placement.position) + Vec3::new(0.0, scale.y * 0.5, 0.0);
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            placement.rotation.x,
            placement.rotation.y,
            placement.rotation.z,
        );

        let proxy = is_collision_proxy(&placement.name_glb);
        let mut mesh = SceneMesh::new(id, placement.name_glb.clone(), placement.position);
        mesh.check_collisions = true;
        mesh.visible = !proxy;
        scene.controller.registry_mut().insert(mesh);

        let mut entity = commands.spawn((
            AreaContent,
            SceneMeshId(id),
            Name::new(placement.name_glb.clone()),
            Transform {
                translation: center,
                rotation,
                scale,
            },
        ));
        // Proxies only feed the collision world.
        if !proxy {
            entity.insert((
                Mesh3d(assets.mesh.clone()),
                MeshMaterial3d(assets.material.clone()),
            ));
        }
    }
}

fn queue_area_loads(last: Res<LastFrame>, mut pending: ResMut<PendingAreaLoads>) {
    if let Some(request) = last.0.as_ref().and_then(|report| report.area_request.clone()) {
        info!("queued area load {} for {}", request.id, request.location_id);
        pending.0.push(request);
    }
}

fn complete_area_loads(
    mut commands: Commands,
    time: Res<Time>,
    mut pending: ResMut<PendingAreaLoads>,
    mut scene: ResMut<Scene>,
    mut world: ResMut<CollisionWorldRes>,
    mut ids: ResMut<NextMeshId>,
    assets: Res<PlacementAssets>,
    mut area: ResMut<CurrentArea>,
    mut remotes: ResMut<RemoteEntityMapping>,
    content: Query<Entity, With<AreaContent>>,
) {
    for request in pending.0.drain(..) {
        let result = load_area(&asset_root(), &request.location_id);
        let Some(applied) = scene
            .controller
            .complete_area_load(&request, result, time.elapsed())
        else {
            continue;
        };

        for entity in &content {
            commands.entity(entity).despawn();
        }
        for id in &applied.disposed_remotes {
            remotes.despawn(&mut commands, id);
        }
        spawn_placements(&mut commands, &assets, &mut scene, &mut ids, &applied.placements);
        let ground_y = scene.controller.config().collision.ground_base_y;
        world.0.rebuild(collision_defs(ground_y, &applied.placements));
        scene.controller.refresh_visibility();
        area.0 = applied.placements;
    }
}
