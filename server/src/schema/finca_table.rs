use crate::types::PlacementRow;
use spacetimedb::*;

/// A player-owned farm and the models placed on it.
#[table(name = finca, public)]
pub struct Finca {
    #[primary_key]
    pub id: String,

    pub name: String,

    /// Hex identity of the owner.
    #[index(btree)]
    pub user_id: String,

    pub arquitectura: Vec<PlacementRow>,
}
