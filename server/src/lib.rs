mod reducers {
    pub(crate) mod afk_sweep;
    pub mod character;
    mod connection;
    pub mod finca;
}
pub mod schema;
pub mod types;
mod utils;

use crate::schema::*;
use pueblo_shared::constants::AFK_TIMEOUT;
use spacetimedb::*;

/// Seconds between idle sweeps.
const SWEEP_INTERVAL_SECS: u32 = 30;

#[reducer(init)]
pub fn init(ctx: &ReducerContext) {
    ctx.db.presence_settings().id().delete(1);
    ctx.db.presence_settings().insert(PresenceSettings {
        id: 1,
        afk_timeout_secs: AFK_TIMEOUT.as_secs() as u32,
        sweep_interval_secs: SWEEP_INTERVAL_SECS,
    });
    reducers::afk_sweep::init(ctx);
}
