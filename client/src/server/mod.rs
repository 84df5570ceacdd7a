//! SpacetimeDB link: connection, per-place subscriptions, and the presence
//! store the scene loop writes through.

pub mod reducers;
mod store;
mod types;

pub use store::StdbPresenceStore;
pub use types::presence_document;

use crate::input::InputAction;
use crate::module_bindings::{
    CharacterTableAccess, DbConnection, Finca, FincaTableAccess, RemoteTables, SubscriptionHandle,
    save_finca,
};
use crate::scene::{Scene, SceneSet};
use crate::world::CurrentArea;
use bevy::prelude::*;
use bevy_spacetimedb::{
    ReadInsertMessage, ReadStdbConnectedMessage, ReadUpdateMessage, StdbConnection, StdbPlugin,
};
use leafwing_input_manager::prelude::ActionState;
use pueblo_shared::presence::PresenceDocument;
use reducers::*;
use spacetimedb_sdk::{SubscriptionHandle as _, Table};

pub type SpacetimeDB<'a> = Res<'a, StdbConnection<DbConnection>>;

const DEFAULT_URI: &str = "http://127.0.0.1:3000";
const DEFAULT_MODULE: &str = "pueblo";

const PLACE_SUBSCRIPTION: &str = "character subscription";
const FINCA_SUBSCRIPTION: &str = "finca subscription";

/// Connection state as the scene sees it.
#[derive(Resource, Default, Debug)]
pub struct ServerLink {
    pub online: bool,
    /// Place whose `character` rows are currently subscribed.
    subscribed_place: Option<String>,
}

pub(super) fn plugin(app: &mut App) {
    let uri = std::env::var("PUEBLO_STDB_URI").unwrap_or_else(|_| DEFAULT_URI.to_owned());
    let module = std::env::var("PUEBLO_STDB_MODULE").unwrap_or_else(|_| DEFAULT_MODULE.to_owned());
    info!("SpacetimeDB module {module} at {uri}");

    let stdb_plugin = StdbPlugin::default()
        .with_uri(uri.as_str())
        .with_module_name(module.as_str());
    let stdb_plugin = match token_from_args_or_env() {
        Some(token) => stdb_plugin.with_token(token),
        None => {
            warn!("no SpacetimeDB token given; this run gets a fresh identity");
            stdb_plugin
        }
    };

    app.add_plugins(
        stdb_plugin
            .add_reducer::<SetCharacter>()
            .add_reducer::<UpdateCharacter>()
            .add_reducer::<DeleteCharacter>()
            .add_reducer::<SaveFinca>()
            .add_table(RemoteTables::character)
            .add_table(RemoteTables::finca)
            .with_run_fn(DbConnection::run_threaded),
    );

    app.init_resource::<ServerLink>();
    app.add_systems(
        Update,
        (on_connect, follow_place).chain().in_set(SceneSet::Input),
    );
    app.add_systems(
        Update,
        (remember_fincas, save_current_finca, reducers::log_rejections).in_set(SceneSet::Apply),
    );
    app.add_systems(Last, remove_presence_on_exit);
}

fn on_connect(
    mut messages: ReadStdbConnectedMessage,
    stdb: SpacetimeDB,
    mut link: ResMut<ServerLink>,
    mut scene: ResMut<Scene>,
) {
    for message in messages.read() {
        info!("SpacetimeDB connected as {:?}", message.identity);
        link.online = true;
        link.subscribed_place = None;

        let owner = message.identity.to_hex().to_string();
        let query = format!("SELECT * FROM finca WHERE user_id = '{}'", sql_text(&owner));
        let handle = stdb.subscription_builder().subscribe(vec![query.as_str()]);
        let subscriptions = scene.controller.subscriptions_mut();
        subscriptions.dispose(FINCA_SUBSCRIPTION);
        subscriptions.register(FINCA_SUBSCRIPTION, move || {
            unsubscribe(handle, FINCA_SUBSCRIPTION)
        });
    }
}

/// Keeps exactly one `character` subscription, for the scene's current place.
fn follow_place(stdb: SpacetimeDB, mut link: ResMut<ServerLink>, mut scene: ResMut<Scene>) {
    if !link.online || link.subscribed_place.as_deref() == Some(scene.controller.place()) {
        return;
    }
    let place = scene.controller.place().to_owned();

    let subscriptions = scene.controller.subscriptions_mut();
    subscriptions.dispose(PLACE_SUBSCRIPTION);
    let query = format!("SELECT * FROM character WHERE place = '{}'", sql_text(&place));
    let handle = stdb.subscription_builder().subscribe(vec![query.as_str()]);
    subscriptions.register(PLACE_SUBSCRIPTION, move || {
        unsubscribe(handle, PLACE_SUBSCRIPTION)
    });

    info!("following players in {place}");
    link.subscribed_place = Some(place);
}

fn unsubscribe(handle: SubscriptionHandle, label: &str) {
    if let Err(err) = handle.unsubscribe() {
        warn!("{label} could not be dropped: {err}");
    }
}

/// Escapes a value for a single-quoted SQL string literal.
fn sql_text(value: &str) -> String {
    value.replace('\'', "''")
}

fn remember_fincas(
    mut inserted: ReadInsertMessage<Finca>,
    mut updated: ReadUpdateMessage<Finca>,
    mut scene: ResMut<Scene>,
) {
    let rows = inserted
        .read()
        .map(|msg| msg.row.clone())
        .chain(updated.read().map(|msg| msg.new.clone()));
    for row in rows {
        match types::finca_record(&row) {
            Ok(finca) => {
                info!("finca {} ({}) available", finca.name, finca.id);
                scene.controller.remember_finca(&finca);
            }
            Err(err) => warn!("finca {} has a malformed placement: {err}", row.id),
        }
    }
}

/// Saves what stands in the current area as the player's farm.
fn save_current_finca(
    actions: Res<ActionState<InputAction>>,
    stdb: SpacetimeDB,
    link: Res<ServerLink>,
    area: Res<CurrentArea>,
    mut scene: ResMut<Scene>,
) {
    if !actions.just_pressed(&InputAction::SaveFinca) {
        return;
    }
    if !link.online {
        warn!("not connected, finca not saved");
        return;
    }

    let owner = stdb.identity().to_hex().to_string();
    let finca = scene.controller.finca_to_save(&owner, area.0.clone());
    let rows = finca.arquitectura.iter().map(types::placement_row).collect();
    match stdb.reducers().save_finca(finca.id.clone(), finca.name.clone(), rows) {
        Ok(()) => info!(
            "saving finca {} with {} placements",
            finca.id,
            finca.arquitectura.len()
        ),
        Err(err) => warn!("finca {} could not be sent: {err}", finca.id),
    }
}

/// Deletes the local record and drops every subscription when the app exits.
fn remove_presence_on_exit(
    mut exits: MessageReader<AppExit>,
    stdb: SpacetimeDB,
    mut scene: ResMut<Scene>,
) {
    if exits.read().next().is_none() {
        return;
    }
    let mut store = StdbPresenceStore::new(&stdb);
    scene.controller.shutdown(&mut store);
}

/// Characters of `place` in the client cache, as presence documents.
pub fn place_snapshot(stdb: &StdbConnection<DbConnection>, place: &str) -> Vec<PresenceDocument> {
    stdb.db()
        .character()
        .iter()
        .filter(|row| row.place == place)
        .map(|row| presence_document(&row))
        .collect()
}

/// JWT from `--token <jwt>`, `--token=<jwt>`, `--token-file <path>`, or the
/// `STDB_TOKEN` environment variable.
fn token_from_args_or_env() -> Option<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    for (index, arg) in args.iter().enumerate() {
        let next = args.get(index + 1);
        if let Some(token) = arg.strip_prefix("--token=") {
            return Some(token.to_owned());
        }
        if let Some(path) = arg.strip_prefix("--token-file=") {
            return read_token_file(path);
        }
        match (arg.as_str(), next) {
            ("--token", Some(token)) => return Some(token.clone()),
            ("--token-file", Some(path)) => return read_token_file(path),
            _ => {}
        }
    }
    std::env::var("STDB_TOKEN").ok()
}

fn read_token_file(path: &str) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(token) => Some(token.trim().to_owned()),
        Err(err) => {
            warn!("token file {path} unreadable: {err}");
            None
        }
    }
}
