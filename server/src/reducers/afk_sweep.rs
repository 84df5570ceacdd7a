//! Idle sweep.
//!
//! Removes `character` rows that have not been written for
//! `afk_timeout_secs`, including rows left by clients that stopped without
//! deleting their own record.

use crate::schema::*;
use crate::utils::{elapsed_secs, interval_from_secs};
use spacetimedb::{ReducerContext, ScheduleAt, Table};

/// IMPORTANT: scheduled tables need a `scheduled_id: u64` primary key with `#[auto_inc]`.
#[spacetimedb::table(name = afk_sweep_timer, scheduled(afk_sweep_reducer))]
pub struct AfkSweepTimer {
    #[primary_key]
    #[auto_inc]
    pub scheduled_id: u64,

    pub scheduled_at: ScheduleAt,
}

/// Schedules the sweep from the current settings row.
pub fn init(ctx: &ReducerContext) {
    let secs = ctx
        .db
        .presence_settings()
        .id()
        .find(1)
        .map_or(30, |settings| settings.sweep_interval_secs);

    ctx.db.afk_sweep_timer().scheduled_id().delete(1);
    ctx.db.afk_sweep_timer().insert(AfkSweepTimer {
        scheduled_id: 1,
        scheduled_at: interval_from_secs(secs),
    });
}

#[spacetimedb::reducer]
pub fn afk_sweep_reducer(ctx: &ReducerContext, _timer: AfkSweepTimer) -> Result<(), String> {
    if ctx.sender != ctx.identity() {
        return Err("`afk_sweep_reducer` may not be invoked by clients.".into());
    }

    let Some(settings) = ctx.db.presence_settings().id().find(1) else {
        return Err("`afk_sweep_reducer` couldn't find presence settings.".into());
    };
    let timeout = settings.afk_timeout_secs as f32;

    let stale: Vec<String> = ctx
        .db
        .character()
        .iter()
        .filter(|row| elapsed_secs(ctx.timestamp, row.updated_at).is_some_and(|idle| idle >= timeout))
        .map(|row| row.id)
        .collect();

    for id in stale {
        ctx.db.character().id().delete(&id);
        log::info!("removed idle character {id}");
    }
    Ok(())
}
