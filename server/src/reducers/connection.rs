//! Connection lifecycle reducers.
//!
//! Disconnect removes every `character` row the client owns.

use crate::schema::*;
use spacetimedb::ReducerContext;

#[spacetimedb::reducer(client_connected)]
pub fn identity_connected(ctx: &ReducerContext) {
    log::info!("Client connected: {:?}", ctx.sender);
}

#[spacetimedb::reducer(client_disconnected)]
pub fn identity_disconnected(ctx: &ReducerContext) {
    log::info!("Client disconnected: {:?}", ctx.sender);

    let owned: Vec<String> = ctx
        .db
        .character()
        .owner()
        .filter(ctx.sender)
        .map(|row| row.id)
        .collect();
    for id in owned {
        ctx.db.character().id().delete(&id);
        log::info!("removed character {id} of disconnected client");
    }
}
