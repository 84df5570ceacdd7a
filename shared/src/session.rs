//! Per-tab session values (`userInfo`, `id`, `finca`), stored as JSON.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub const USER_INFO_KEY: &str = "userInfo";
pub const CHARACTER_ID_KEY: &str = "id";
pub const FINCA_KEY: &str = "finca";

#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    values: HashMap<String, serde_json::Value>,
}

impl SessionStore {
    pub fn set_item<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.values.insert(key.to_owned(), value);
            }
            Err(err) => log::error!("session value {key} could not be stored: {err}"),
        }
    }

    /// `None` when missing or stored with a different shape.
    pub fn get_item<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(item) => Some(item),
            Err(err) => {
                log::warn!("session value {key} has an unexpected shape: {err}");
                None
            }
        }
    }

    pub fn remove_item(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn clear(&mut self) {
        self.values.clear();
        log::info!("session cleared");
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerProfile;

    #[test]
    fn stores_typed_values() {
        let mut session = SessionStore::default();
        session.set_item(USER_INFO_KEY, &PlayerProfile::anonymous("u1"));
        session.set_item(CHARACTER_ID_KEY, &"c1");

        let profile: PlayerProfile = session.get_item(USER_INFO_KEY).unwrap();
        assert_eq!(profile.id, "u1");
        assert_eq!(session.get_item::<String>(CHARACTER_ID_KEY).as_deref(), Some("c1"));
        assert_eq!(session.get_item::<PlayerProfile>(CHARACTER_ID_KEY), None);

        session.clear();
        assert!(session.is_empty());
    }
}
