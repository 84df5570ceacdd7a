//! Other players: mirrors the subscribed `character` rows of the current place
//! and keeps one proxy entity per remote character.

use bevy::{platform::collections::HashMap, prelude::*};
use bevy_spacetimedb::{ReadDeleteMessage, ReadInsertMessage, ReadUpdateMessage};
use pueblo_shared::constants::{CAPSULE_HALF_HEIGHT, CAPSULE_RADIUS};

use crate::module_bindings::Character;
use crate::scene::{Scene, SceneSet, to_bevy};
use crate::server::{SpacetimeDB, place_snapshot};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<RemoteEntityMapping>();
    app.add_systems(Update, (sync_roster, move_proxies).chain().in_set(SceneSet::Apply));
}

/// Presence id to proxy entity.
#[derive(Resource, Default)]
pub struct RemoteEntityMapping(pub HashMap<String, Entity>);

impl RemoteEntityMapping {
    pub fn despawn(&mut self, commands: &mut Commands, id: &str) {
        if let Some(entity) = self.0.remove(id) {
            commands.entity(entity).despawn();
        }
    }
}

#[derive(Component)]
pub struct RemoteCharacter(pub String);

/// Re-reads the place's rows from the client cache whenever any `character`
/// row changed this frame.
fn sync_roster(
    mut commands: Commands,
    time: Res<Time>,
    stdb: SpacetimeDB,
    mut inserted: ReadInsertMessage<Character>,
    mut updated: ReadUpdateMessage<Character>,
    mut deleted: ReadDeleteMessage<Character>,
    mut scene: ResMut<Scene>,
    mut mapping: ResMut<RemoteEntityMapping>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let changed = inserted.read().count() + updated.read().count() + deleted.read().count();
    if changed == 0 {
        return;
    }

    let docs = place_snapshot(&stdb, scene.controller.place());
    let changes = scene.controller.apply_remote_snapshot(&docs, time.elapsed());

    for id in changes.disposed {
        mapping.despawn(&mut commands, &id);
    }
    for id in changes.spawned {
        let Some(proxy) = scene.controller.roster().get(&id) else {
            continue;
        };
        info!("{} joined", proxy.name);
        let entity = commands
            .spawn((
                RemoteCharacter(id.clone()),
                Name::new(proxy.name.clone()),
                Mesh3d(meshes.add(Capsule3d::new(CAPSULE_RADIUS, CAPSULE_HALF_HEIGHT * 2.0))),
                MeshMaterial3d(materials.add(Color::srgb_u8(90, 140, 214))),
                Transform::from_translation(to_bevy(&proxy.position)),
            ))
            .id();
        mapping.0.insert(id, entity);
    }
}

/// Proxies follow the roster's interpolated positions; rotation snaps.
fn move_proxies(scene: Res<Scene>, mut proxies: Query<(&RemoteCharacter, &mut Transform)>) {
    let roster = scene.controller.roster();
    for (remote, mut transform) in &mut proxies {
        let Some(proxy) = roster.get(&remote.0) else {
            continue;
        };
        transform.translation = to_bevy(&proxy.position);
        transform.rotation = Quat::from_euler(
            EulerRot::XYZ,
            proxy.rotation.x,
            proxy.rotation.y,
            proxy.rotation.z,
        );
    }
}
