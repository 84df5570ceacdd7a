use crate::module_bindings::{
    CharacterTableAccess, DbConnection, delete_character, set_character, update_character,
};
use bevy_spacetimedb::StdbConnection;
use pueblo_shared::StoreError;
use pueblo_shared::format_vec3;
use pueblo_shared::presence::{PresenceRecord, PresenceStore, PresenceUpdate};

/// [`PresenceStore`] backed by the `character` table and its reducers.
///
/// Reducer calls are fire-and-forget; their outcome arrives later as a
/// reducer message. Updates first check the client cache so a row that is
/// gone reports [`StoreError::NotFound`] right away.
pub struct StdbPresenceStore<'a> {
    conn: &'a StdbConnection<DbConnection>,
}

impl<'a> StdbPresenceStore<'a> {
    pub fn new(conn: &'a StdbConnection<DbConnection>) -> Self {
        Self { conn }
    }
}

fn rejected(err: spacetimedb_sdk::Error) -> StoreError {
    StoreError::Rejected(err.to_string())
}

impl PresenceStore for StdbPresenceStore<'_> {
    fn create(&mut self, record: &PresenceRecord) -> Result<(), StoreError> {
        let doc = record.to_document();
        self.conn
            .reducers()
            .set_character(
                doc.id,
                doc.name,
                doc.email,
                doc.position,
                doc.rotation,
                doc.animation,
                doc.place,
            )
            .map_err(rejected)
    }

    fn update(&mut self, id: &str, update: &PresenceUpdate) -> Result<(), StoreError> {
        let id = id.to_owned();
        if self.conn.db().character().id().find(&id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        self.conn
            .reducers()
            .update_character(
                id,
                format_vec3(&update.position),
                format_vec3(&update.rotation),
                update.animation.clone(),
                update.place.clone(),
                update.service.clone(),
            )
            .map_err(rejected)
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.conn
            .reducers()
            .delete_character(id.to_owned())
            .map_err(rejected)
    }
}
