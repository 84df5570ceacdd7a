//! Presence record writes.
//!
//! Each client owns the rows it created. `set_character` upserts the whole
//! record. `update_character` rewrites the moving parts and fails when the row
//! is gone; clients answer that with `set_character`.

use crate::schema::*;
use crate::utils::canonical_vec3;
use pueblo_shared::presence::{SERVICE_CREATE, SERVICE_UPDATE};
use spacetimedb::{ReducerContext, Table};

#[spacetimedb::reducer]
pub fn set_character(
    ctx: &ReducerContext,
    id: String,
    name: String,
    email: String,
    position: String,
    rotation: String,
    animation: Vec<String>,
    place: String,
) -> Result<(), String> {
    if id.is_empty() {
        return Err("`set_character` needs a character id.".into());
    }
    let position = canonical_vec3("position", &position)?;
    let rotation = canonical_vec3("rotation", &rotation)?;

    let row = Character {
        id: id.clone(),
        name,
        email,
        position,
        rotation,
        animation,
        place,
        service: SERVICE_CREATE.to_owned(),
        owner: ctx.sender,
        updated_at: ctx.timestamp,
    };

    match ctx.db.character().id().find(&id) {
        Some(existing) if existing.owner != ctx.sender => {
            Err(format!("character {id} belongs to another connection."))
        }
        Some(_) => {
            ctx.db.character().id().update(row);
            Ok(())
        }
        None => {
            log::info!("character {id} joined {}", row.place);
            ctx.db.character().insert(row);
            Ok(())
        }
    }
}

#[spacetimedb::reducer]
pub fn update_character(
    ctx: &ReducerContext,
    id: String,
    position: String,
    rotation: String,
    animation: Vec<String>,
    place: String,
    service: String,
) -> Result<(), String> {
    let Some(existing) = ctx.db.character().id().find(&id) else {
        return Err(format!("character {id} not found."));
    };
    if existing.owner != ctx.sender {
        return Err(format!("character {id} belongs to another connection."));
    }

    let service = if service.is_empty() {
        SERVICE_UPDATE.to_owned()
    } else {
        service
    };
    ctx.db.character().id().update(Character {
        position: canonical_vec3("position", &position)?,
        rotation: canonical_vec3("rotation", &rotation)?,
        animation,
        place,
        service,
        updated_at: ctx.timestamp,
        ..existing
    });
    Ok(())
}

#[spacetimedb::reducer]
pub fn delete_character(ctx: &ReducerContext, id: String) -> Result<(), String> {
    let Some(existing) = ctx.db.character().id().find(&id) else {
        return Err(format!("character {id} not found."));
    };
    if existing.owner != ctx.sender {
        return Err(format!("character {id} belongs to another connection."));
    }
    ctx.db.character().id().delete(&id);
    log::info!("character {id} left {}", existing.place);
    Ok(())
}
