use crate::schema::*;
use crate::types::PlacementRow;
use spacetimedb::{ReducerContext, Table};

/// Creates or replaces one of the caller's farms.
///
/// Placement vectors are validated and stored in canonical `"x, y, z"` form.
#[spacetimedb::reducer]
pub fn save_finca(
    ctx: &ReducerContext,
    id: String,
    name: String,
    arquitectura: Vec<PlacementRow>,
) -> Result<(), String> {
    let user_id = ctx.sender.to_hex().to_string();

    let mut rows = Vec::with_capacity(arquitectura.len());
    for (index, row) in arquitectura.iter().enumerate() {
        let record = row
            .to_record()
            .map_err(|err| format!("placement {index} ({}): {err}", row.name_glb))?;
        rows.push(PlacementRow::from(&record));
    }

    let finca = Finca {
        id: id.clone(),
        name,
        user_id: user_id.clone(),
        arquitectura: rows,
    };

    match ctx.db.finca().id().find(&id) {
        Some(existing) if existing.user_id != user_id => {
            Err(format!("finca {id} belongs to another player."))
        }
        Some(_) => {
            ctx.db.finca().id().update(finca);
            Ok(())
        }
        None => {
            ctx.db.finca().insert(finca);
            Ok(())
        }
    }
}
