use bevy::prelude::*;
use pueblo_shared::animation::{AnimationClip, AnimationCommand};
use pueblo_shared::constants::{CAPSULE_HALF_HEIGHT, CAPSULE_RADIUS};
use pueblo_shared::visibility::SceneMesh;

use crate::scene::{LastFrame, Scene, SceneMeshId, SceneSet, to_bevy};
use crate::world::NextMeshId;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, spawn_character);
    app.add_systems(
        Update,
        (sync_transform, play_animation).in_set(SceneSet::Apply),
    );
}

#[derive(Component)]
pub struct LocalCharacter;

/// Clip the character model is playing and at what rate.
#[derive(Component, Debug, Default)]
pub struct CharacterAnimation {
    pub clip: Option<AnimationClip>,
    pub speed: f32,
}

fn spawn_character(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut scene: ResMut<Scene>,
    mut ids: ResMut<NextMeshId>,
) {
    let id = ids.next();
    let position = scene.controller.character().position;
    scene
        .controller
        .registry_mut()
        .insert(SceneMesh::new(id, "personaje", position));
    scene.controller.set_player_mesh(id);

    commands.spawn((
        LocalCharacter,
        SceneMeshId(id),
        CharacterAnimation::default(),
        Mesh3d(meshes.add(Capsule3d::new(CAPSULE_RADIUS, CAPSULE_HALF_HEIGHT * 2.0))),
        MeshMaterial3d(materials.add(Color::srgb_u8(214, 140, 69))),
        Transform::from_translation(to_bevy(&position)),
    ));
}

fn sync_transform(scene: Res<Scene>, mut character: Single<&mut Transform, With<LocalCharacter>>) {
    let state = scene.controller.character();
    character.translation = to_bevy(&state.position);
    character.rotation = Quat::from_rotation_y(state.rotation.y);
}

fn play_animation(last: Res<LastFrame>, mut animation: Single<&mut CharacterAnimation, With<LocalCharacter>>) {
    let Some(report) = last.0.as_ref() else {
        return;
    };
    match report.animation {
        AnimationCommand::Play { clip, speed } => {
            debug!("character plays {}", clip.name());
            animation.clip = Some(clip);
            animation.speed = speed;
        }
        AnimationCommand::SetSpeed { speed } => animation.speed = speed,
        AnimationCommand::None => {}
    }
}
