use spacetimedb::*;

/// Presence tunables. Single row with `id = 1`, seeded by `init`.
#[table(name = presence_settings, public)]
pub struct PresenceSettings {
    #[primary_key]
    pub id: u32,

    /// Rows not written for this long are removed by the idle sweep (seconds).
    pub afk_timeout_secs: u32,

    /// How often the idle sweep runs (seconds).
    pub sweep_interval_secs: u32,
}
