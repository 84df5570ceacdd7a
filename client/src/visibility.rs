use bevy::prelude::*;

use crate::scene::{Scene, SceneMeshId, SceneSet};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Update, sync_visibility.in_set(SceneSet::Apply));
}

/// Mirrors the optimizer's `visible`/`enabled` flags onto Bevy visibility.
fn sync_visibility(scene: Res<Scene>, mut meshes: Query<(&SceneMeshId, &mut Visibility)>) {
    let registry = scene.controller.registry();
    for (id, mut visibility) in &mut meshes {
        let Some(mesh) = registry.get(id.0) else {
            continue;
        };
        let wanted = if mesh.visible && mesh.enabled {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        visibility.set_if_neq(wanted);
    }
}
