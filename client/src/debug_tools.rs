//! Debug/performance tooling for native dev builds.
//!
//! F1 toggles frustum culling, F2 logs culling counts, F3 drops a fake remote
//! player next to the character and F4 switches culling to a coarse, slow
//! profile.

use std::time::Duration;

use bevy::diagnostic::{
    EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin, SystemInformationDiagnosticsPlugin,
};
use bevy::prelude::*;
use bevy::render::diagnostic::RenderDiagnosticsPlugin;
use iyes_perf_ui::prelude::*;
use pueblo_shared::diagnostics::DebugCommand;
use pueblo_shared::format_vec3;

use crate::module_bindings::set_character;
use crate::scene::Scene;
use crate::server::{ServerLink, SpacetimeDB};

/// Add debug/perf tooling (intended for `dev_native` builds only).
pub(super) fn plugin(app: &mut App) {
    app.add_plugins((
        FrameTimeDiagnosticsPlugin::default(),
        EntityCountDiagnosticsPlugin::default(),
        SystemInformationDiagnosticsPlugin::default(),
        RenderDiagnosticsPlugin,
        PerfUiPlugin,
    ));

    app.add_systems(Startup, spawn_perf_ui);
    app.add_systems(Update, (culling_keys, spawn_fake_remote));
}

fn spawn_perf_ui(mut commands: Commands) {
    commands.spawn(PerfUiAllEntries::default());
}

fn culling_keys(keys: Res<ButtonInput<KeyCode>>, mut scene: ResMut<Scene>, mut culling: Local<Option<bool>>) {
    let enabled = culling.get_or_insert(true);
    if keys.just_pressed(KeyCode::F1) {
        *enabled = !*enabled;
        if scene.controller.apply_debug(DebugCommand::SetCulling(*enabled)) {
            info!("frustum culling {}", if *enabled { "on" } else { "off" });
        }
    }
    if keys.just_pressed(KeyCode::F2) {
        let stats = scene.controller.culling_stats();
        info!(
            "culling: {} meshes, {} culled, {} visible, fps {:.0}",
            stats.total,
            stats.culled,
            stats.visible,
            scene.controller.fps()
        );
    }
    if keys.just_pressed(KeyCode::F4) {
        scene.controller.apply_debug(DebugCommand::ConfigureCulling {
            threshold: Some(4.0),
            interval: Some(Duration::from_millis(500)),
        });
    }
}

/// Creates an extra `character` row next to the player through the same
/// reducer real clients use. The server drops it with the connection.
fn spawn_fake_remote(
    keys: Res<ButtonInput<KeyCode>>,
    scene: Res<Scene>,
    stdb: SpacetimeDB,
    link: Res<ServerLink>,
    mut spawned: Local<u32>,
) {
    if !keys.just_pressed(KeyCode::F3) {
        return;
    }
    if !link.online {
        warn!("not connected, no fake remote");
        return;
    }
    *spawned += 1;
    let n = *spawned;
    let angle = n as f32 * 0.9;
    let mut position = scene.controller.character().position;
    position.x += 4.0 * angle.cos();
    position.z += 4.0 * angle.sin();

    let identity = stdb.identity().to_hex().to_string();
    let id = format!("fake-{}-{n}", &identity[..8.min(identity.len())]);
    let result = stdb.reducers().set_character(
        id.clone(),
        format!("Visitante {n}"),
        String::new(),
        format_vec3(&position),
        format_vec3(&pueblo_shared::Vec3::zeros()),
        Vec::new(),
        scene.controller.place().to_owned(),
    );
    match result {
        Ok(()) => info!("fake remote {id} placed"),
        Err(err) => warn!("fake remote {id} not sent: {err}"),
    }
}
