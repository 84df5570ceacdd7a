use spacetimedb::*;

/// Presence record of one character in one place.
///
/// Clients subscribe to the rows of their current `place` to mirror the other
/// players. Vectors are kept as `"x, y, z"` strings; that text form is the
/// contract every client reads and writes.
#[table(name = character, public)]
pub struct Character {
    /// Session-scoped character id chosen by the client.
    #[primary_key]
    pub id: String,

    pub name: String,
    pub email: String,

    /// `"x, y, z"`
    pub position: String,
    /// `"x, y, z"`, Euler angles in radians.
    pub rotation: String,

    /// Names of the animations currently playing.
    pub animation: Vec<String>,

    /// Location id the character is in.
    #[index(btree)]
    pub place: String,

    /// Free-form tag naming the write path that produced the row.
    pub service: String,

    /// Connection that owns the row. Only it may update or delete it.
    #[index(btree)]
    pub owner: Identity,

    /// Last write, used by the idle sweep.
    pub updated_at: Timestamp,
}
