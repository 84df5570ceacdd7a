//! Network presence: publishing the local character and mirroring the others.
//!
//! The store only ever sees [`PresenceDocument`]s, whose vectors are
//! `"x, y, z"` strings. Everything on this side of the boundary works with
//! [`PresenceRecord`] and real vectors.

use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::{format_vec3, parse_vec3};
use crate::config::PresenceConfig;
use crate::error::{ParseVec3Error, StoreError};
use crate::session::{CHARACTER_ID_KEY, SessionStore, USER_INFO_KEY};
use crate::throttle::Throttle;
use crate::types::{PlayerProfile, Vec3};

pub const SERVICE_CREATE: &str = "presence create";
pub const SERVICE_UPDATE: &str = "presence update";

/// A `character` row as the store holds it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PresenceDocument {
    pub id: String,
    pub name: String,
    pub email: String,
    pub position: String,
    pub rotation: String,
    #[serde(default)]
    pub animation: Vec<String>,
    pub place: String,
    #[serde(default)]
    pub service: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresenceRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub animation: Vec<String>,
    pub place: String,
    pub service: String,
}

impl PresenceRecord {
    pub fn to_document(&self) -> PresenceDocument {
        PresenceDocument {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            position: format_vec3(&self.position),
            rotation: format_vec3(&self.rotation),
            animation: self.animation.clone(),
            place: self.place.clone(),
            service: self.service.clone(),
        }
    }

    pub fn from_document(doc: &PresenceDocument) -> Result<Self, ParseVec3Error> {
        Ok(Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            email: doc.email.clone(),
            position: parse_vec3(&doc.position)?,
            rotation: parse_vec3(&doc.rotation)?,
            animation: doc.animation.clone(),
            place: doc.place.clone(),
            service: doc.service.clone(),
        })
    }
}

/// Fields rewritten on every throttled update.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceUpdate {
    pub position: Vec3,
    pub rotation: Vec3,
    pub animation: Vec<String>,
    pub place: String,
    pub service: String,
}

/// Where presence records live.
pub trait PresenceStore {
    /// Inserts or replaces the record with `record.id`.
    fn create(&mut self, record: &PresenceRecord) -> Result<(), StoreError>;
    /// Fails with [`StoreError::NotFound`] when there is no record to update.
    fn update(&mut self, id: &str, update: &PresenceUpdate) -> Result<(), StoreError>;
    fn delete(&mut self, id: &str) -> Result<(), StoreError>;
}

/// In-process store for tests. Clones share the same table.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct LocalPresenceStore {
    rows: Arc<Mutex<HashMap<String, PresenceDocument>>>,
}

#[cfg(test)]
impl LocalPresenceStore {
    /// Every document in `place`, sorted by id.
    pub fn snapshot(&self, place: &str) -> Vec<PresenceDocument> {
        let Ok(rows) = self.rows.lock() else {
            log::error!("presence table lock is poisoned");
            return Vec::new();
        };
        let mut docs: Vec<_> = rows.values().filter(|doc| doc.place == place).cloned().collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }

    pub fn get(&self, id: &str) -> Option<PresenceDocument> {
        self.rows.lock().ok()?.get(id).cloned()
    }

    /// Writes a raw document, bypassing the record conversion.
    pub fn insert_document(&self, doc: PresenceDocument) -> Result<(), StoreError> {
        let mut rows = self.lock()?;
        rows.insert(doc.id.clone(), doc);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, PresenceDocument>>, StoreError> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Rejected("presence table lock is poisoned".to_owned()))
    }
}

#[cfg(test)]
impl PresenceStore for LocalPresenceStore {
    fn create(&mut self, record: &PresenceRecord) -> Result<(), StoreError> {
        self.insert_document(record.to_document())
    }

    fn update(&mut self, id: &str, update: &PresenceUpdate) -> Result<(), StoreError> {
        let mut rows = self.lock()?;
        let doc = rows
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        doc.position = format_vec3(&update.position);
        doc.rotation = format_vec3(&update.rotation);
        doc.animation = update.animation.clone();
        doc.place = update.place.clone();
        doc.service = update.service.clone();
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.lock()?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))
    }
}

/// Hands out fresh character ids.
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// `<prefix>-<n>` ids. The prefix should be unique per client, e.g. seeded
/// from the connection identity or the launch time.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// What the local character looks like this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPresence {
    pub position: Vec3,
    pub rotation: Vec3,
    pub animation: Vec<String>,
    pub place: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceWrite {
    Created(String),
    Updated(String),
}

/// Throttled upsert of the local character's record.
#[derive(Debug, Clone)]
pub struct PresenceSynchronizer {
    throttle: Throttle,
    epsilon: f32,
    profile: Option<PlayerProfile>,
    last_written: Option<Vec3>,
}

impl PresenceSynchronizer {
    /// `profile` is the signed-in player, or `None` to publish anonymously.
    /// The first write can happen one interval after `now`.
    pub fn new(config: &PresenceConfig, profile: Option<PlayerProfile>, now: Duration) -> Self {
        Self {
            throttle: Throttle::starting_at(config.interval(), now),
            epsilon: config.position_epsilon,
            profile,
            last_written: None,
        }
    }

    /// Id of the record this client owns, once one was created.
    pub fn character_id(session: &SessionStore) -> Option<String> {
        session.get_item(CHARACTER_ID_KEY)
    }

    fn moved(&self, position: &Vec3) -> bool {
        match self.last_written {
            None => true,
            Some(last) => (position - last).abs().max() > self.epsilon,
        }
    }

    /// Writes the local record if the throttle allows and the character moved.
    pub fn tick(
        &mut self,
        local: &LocalPresence,
        store: &mut dyn PresenceStore,
        session: &mut SessionStore,
        ids: &mut dyn IdSource,
        now: Duration,
    ) -> Option<PresenceWrite> {
        if !self.throttle.try_fire(now) || !self.moved(&local.position) {
            return None;
        }

        let has_profile = session.get_item::<PlayerProfile>(USER_INFO_KEY).is_some();
        let existing = Self::character_id(session).filter(|_| has_profile);
        let result = match existing {
            None => self.create(local, store, session, ids),
            Some(id) => {
                let update = PresenceUpdate {
                    position: local.position,
                    rotation: local.rotation,
                    animation: local.animation.clone(),
                    place: local.place.clone(),
                    service: SERVICE_UPDATE.to_owned(),
                };
                match store.update(&id, &update) {
                    Ok(()) => Ok(PresenceWrite::Updated(id)),
                    Err(err) => {
                        log::warn!("presence update for {id} failed ({err}), recreating");
                        self.create(local, store, session, ids)
                    }
                }
            }
        };

        match result {
            Ok(write) => {
                self.last_written = Some(local.position);
                Some(write)
            }
            Err(err) => {
                log::error!("presence write failed: {err}");
                None
            }
        }
    }

    fn create(
        &self,
        local: &LocalPresence,
        store: &mut dyn PresenceStore,
        session: &mut SessionStore,
        ids: &mut dyn IdSource,
    ) -> Result<PresenceWrite, StoreError> {
        let id = Self::character_id(session).unwrap_or_else(|| ids.next_id());
        let profile = match &self.profile {
            Some(profile) => PlayerProfile {
                id: id.clone(),
                ..profile.clone()
            },
            None => PlayerProfile::anonymous(id.clone()),
        };

        let record = PresenceRecord {
            id: id.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            position: local.position,
            rotation: local.rotation,
            animation: local.animation.clone(),
            place: local.place.clone(),
            service: SERVICE_CREATE.to_owned(),
        };
        store.create(&record)?;

        session.set_item(USER_INFO_KEY, &profile);
        session.set_item(CHARACTER_ID_KEY, &id);
        log::info!("presence record {id} created in {}", local.place);
        Ok(PresenceWrite::Created(id))
    }

    /// Deletes the local record, e.g. when the page unloads.
    pub fn remove(store: &mut dyn PresenceStore, session: &SessionStore) {
        let Some(id) = Self::character_id(session) else {
            return;
        };
        match store.delete(&id) {
            Ok(()) => log::info!("presence record {id} removed"),
            Err(err) => log::warn!("presence record {id} could not be removed: {err}"),
        }
    }

    /// Forces the next write even if the character has not moved.
    pub fn invalidate(&mut self) {
        self.last_written = None;
    }
}

/// Deletes the local record once after a stretch without player activity.
#[derive(Debug, Clone)]
pub struct AfkMonitor {
    timeout: Duration,
    last_activity: Duration,
    fired: bool,
}

impl AfkMonitor {
    pub fn new(timeout: Duration, now: Duration) -> Self {
        Self {
            timeout,
            last_activity: now,
            fired: false,
        }
    }

    /// Pointer moves, key presses and clicks all count.
    ///
    /// Returns true when this ends an idle stretch whose record was deleted.
    pub fn activity(&mut self, now: Duration) -> bool {
        self.last_activity = now;
        std::mem::replace(&mut self.fired, false)
    }

    /// The record was deleted for inactivity and no activity followed yet.
    pub fn is_idle(&self) -> bool {
        self.fired
    }

    /// True exactly once per idle stretch.
    pub fn check(&mut self, now: Duration) -> bool {
        if self.fired || now.saturating_sub(self.last_activity) < self.timeout {
            return false;
        }
        self.fired = true;
        true
    }
}

/// Another player's character in the local scene.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteProxy {
    pub id: String,
    pub name: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub animation: Vec<String>,
    lerp: Option<Lerp>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Lerp {
    from: Vec3,
    to: Vec3,
    started: Duration,
}

impl RemoteProxy {
    /// Where the proxy is heading, or its position when at rest.
    pub fn target(&self) -> Vec3 {
        self.lerp.map_or(self.position, |lerp| lerp.to)
    }
}

/// Roster changes the scene has to act on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RosterChanges {
    pub spawned: Vec<String>,
    pub disposed: Vec<String>,
}

/// Mirror of the other players in the current place.
#[derive(Debug, Clone)]
pub struct RemoteRoster {
    interpolation: Duration,
    proxies: HashMap<String, RemoteProxy>,
}

impl RemoteRoster {
    pub fn new(config: &PresenceConfig) -> Self {
        Self {
            interpolation: config.interpolation(),
            proxies: HashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&RemoteProxy> {
        self.proxies.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteProxy> {
        self.proxies.values()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Reconciles the roster with a full snapshot of the place.
    pub fn apply_snapshot(
        &mut self,
        docs: &[PresenceDocument],
        local_id: Option<&str>,
        now: Duration,
    ) -> RosterChanges {
        let mut changes = RosterChanges::default();

        let mut gone: Vec<String> = self
            .proxies
            .keys()
            .filter(|id| !docs.iter().any(|doc| &doc.id == *id))
            .cloned()
            .collect();
        gone.sort();
        for id in gone {
            self.proxies.remove(&id);
            changes.disposed.push(id);
        }

        for doc in docs {
            if local_id == Some(doc.id.as_str()) {
                continue;
            }
            let record = match PresenceRecord::from_document(doc) {
                Ok(record) => record,
                Err(err) => {
                    log::warn!("skipping presence record {}: {err}", doc.id);
                    continue;
                }
            };

            match self.proxies.get_mut(&record.id) {
                Some(proxy) => {
                    proxy.rotation = record.rotation;
                    proxy.animation = record.animation;
                    if proxy.target() != record.position {
                        proxy.lerp = Some(Lerp {
                            from: proxy.position,
                            to: record.position,
                            started: now,
                        });
                    }
                }
                None => {
                    changes.spawned.push(record.id.clone());
                    self.proxies.insert(
                        record.id.clone(),
                        RemoteProxy {
                            id: record.id,
                            name: record.name,
                            position: record.position,
                            rotation: record.rotation,
                            animation: record.animation,
                            lerp: None,
                        },
                    );
                }
            }
        }
        changes
    }

    /// Advances every running interpolation to `now`.
    pub fn advance(&mut self, now: Duration) {
        let duration = self.interpolation.as_secs_f32();
        for proxy in self.proxies.values_mut() {
            let Some(lerp) = proxy.lerp else {
                continue;
            };
            let elapsed = now.saturating_sub(lerp.started).as_secs_f32();
            let t = if duration > 0.0 {
                (elapsed / duration).min(1.0)
            } else {
                1.0
            };
            if t >= 1.0 {
                proxy.position = lerp.to;
                proxy.lerp = None;
            } else {
                proxy.position = lerp.from.lerp(&lerp.to, t);
            }
        }
    }

    /// Drops every proxy, e.g. when the place changes.
    pub fn clear(&mut self) -> Vec<String> {
        let mut ids: Vec<String> = self.proxies.drain().map(|(id, _)| id).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn at(position: Vec3) -> LocalPresence {
        LocalPresence {
            position,
            rotation: Vec3::zeros(),
            animation: vec!["Still".to_owned()],
            place: "pueblo".to_owned(),
        }
    }

    /// Store whose updates always fail, for the recreate path.
    #[derive(Default)]
    struct FlakyStore {
        inner: LocalPresenceStore,
        creates: usize,
    }

    impl PresenceStore for FlakyStore {
        fn create(&mut self, record: &PresenceRecord) -> Result<(), StoreError> {
            self.creates += 1;
            self.inner.create(record)
        }

        fn update(&mut self, id: &str, _update: &PresenceUpdate) -> Result<(), StoreError> {
            Err(StoreError::NotFound(id.to_owned()))
        }

        fn delete(&mut self, id: &str) -> Result<(), StoreError> {
            self.inner.delete(id)
        }
    }

    #[test]
    fn burst_of_moves_produces_one_write_with_last_position() {
        let config = PresenceConfig::default();
        let mut sync = PresenceSynchronizer::new(&config, None, ms(0));
        let mut store = LocalPresenceStore::default();
        let mut session = SessionStore::default();
        let mut ids = SequentialIds::new("t");

        let mut writes = Vec::new();
        for i in 0..10u64 {
            let position = Vec3::new(i as f32, 0.0, 0.0);
            writes.extend(sync.tick(&at(position), &mut store, &mut session, &mut ids, ms(i * 10)));
        }
        assert!(writes.is_empty());

        let write = sync.tick(&at(Vec3::new(9.0, 0.0, 0.0)), &mut store, &mut session, &mut ids, ms(100));
        assert_eq!(write, Some(PresenceWrite::Created("t-1".to_owned())));
        let doc = store.get("t-1").unwrap();
        assert_eq!(doc.position, "9, 0, 0");
        assert_eq!(doc.name, "Anónimo");
        assert_eq!(doc.service, SERVICE_CREATE);
    }

    #[test]
    fn small_moves_are_not_written() {
        let config = PresenceConfig::default();
        let mut sync = PresenceSynchronizer::new(&config, None, ms(0));
        let mut store = LocalPresenceStore::default();
        let mut session = SessionStore::default();
        let mut ids = SequentialIds::new("t");

        assert!(sync.tick(&at(Vec3::zeros()), &mut store, &mut session, &mut ids, ms(100)).is_some());
        let nudged = at(Vec3::new(0.004, 0.0, -0.004));
        assert!(sync.tick(&nudged, &mut store, &mut session, &mut ids, ms(200)).is_none());

        let moved = at(Vec3::new(0.0, 0.006, 0.0));
        let write = sync.tick(&moved, &mut store, &mut session, &mut ids, ms(300));
        assert_eq!(write, Some(PresenceWrite::Updated("t-1".to_owned())));
        assert_eq!(store.get("t-1").unwrap().service, SERVICE_UPDATE);
    }

    #[test]
    fn failed_update_recreates_under_the_same_id() {
        let config = PresenceConfig::default();
        let profile = PlayerProfile {
            id: "auth".to_owned(),
            name: "Ana".to_owned(),
            description: String::new(),
            email: "ana@example.com".to_owned(),
        };
        let mut sync = PresenceSynchronizer::new(&config, Some(profile), ms(0));
        let mut store = FlakyStore::default();
        let mut session = SessionStore::default();
        let mut ids = SequentialIds::new("t");

        sync.tick(&at(Vec3::zeros()), &mut store, &mut session, &mut ids, ms(100));
        let write = sync.tick(&at(Vec3::new(1.0, 0.0, 0.0)), &mut store, &mut session, &mut ids, ms(200));

        assert_eq!(write, Some(PresenceWrite::Created("t-1".to_owned())));
        assert_eq!(store.creates, 2);
        let doc = store.inner.get("t-1").unwrap();
        assert_eq!(doc.name, "Ana");
        assert_eq!(doc.position, "1, 0, 0");
        let saved: PlayerProfile = session.get_item(USER_INFO_KEY).unwrap();
        assert_eq!(saved.id, "t-1");
    }

    #[test]
    fn remove_deletes_the_session_record() {
        let config = PresenceConfig::default();
        let mut sync = PresenceSynchronizer::new(&config, None, ms(0));
        let mut store = LocalPresenceStore::default();
        let mut session = SessionStore::default();
        let mut ids = SequentialIds::new("t");
        sync.tick(&at(Vec3::zeros()), &mut store, &mut session, &mut ids, ms(100));

        PresenceSynchronizer::remove(&mut store, &session);
        assert!(store.get("t-1").is_none());
    }

    #[test]
    fn afk_fires_once_per_idle_stretch() {
        let mut afk = AfkMonitor::new(Duration::from_secs(300), ms(0));
        assert!(!afk.check(Duration::from_secs(299)));
        assert!(afk.check(Duration::from_secs(300)));
        assert!(!afk.check(Duration::from_secs(400)));
        assert!(afk.is_idle());

        assert!(afk.activity(Duration::from_secs(401)));
        assert!(!afk.is_idle());
        assert!(!afk.activity(Duration::from_secs(402)));
        assert!(!afk.check(Duration::from_secs(600)));
        assert!(afk.check(Duration::from_secs(701)));
    }

    fn doc(id: &str, position: &str) -> PresenceDocument {
        PresenceDocument {
            id: id.to_owned(),
            name: id.to_owned(),
            email: " ".to_owned(),
            position: position.to_owned(),
            rotation: "0, 1.5, 0".to_owned(),
            animation: Vec::new(),
            place: "pueblo".to_owned(),
            service: SERVICE_UPDATE.to_owned(),
        }
    }

    #[test]
    fn roster_spawns_interpolates_and_disposes() {
        let mut roster = RemoteRoster::new(&PresenceConfig::default());

        let changes = roster.apply_snapshot(
            &[doc("me", "0, 0, 0"), doc("ana", "0, 0, 0"), doc("luis", "5, 0, 5")],
            Some("me"),
            ms(0),
        );
        assert_eq!(changes.spawned.len(), 2);
        assert!(roster.get("me").is_none());
        assert_eq!(roster.get("ana").unwrap().rotation, Vec3::new(0.0, 1.5, 0.0));

        let changes = roster.apply_snapshot(&[doc("ana", "10, 0, 0")], Some("me"), ms(1000));
        assert_eq!(changes.disposed, vec!["luis".to_owned()]);
        assert!(changes.spawned.is_empty());

        roster.advance(ms(1250));
        let ana = roster.get("ana").unwrap();
        assert!((ana.position.x - 5.0).abs() < 1.0e-4);
        assert_eq!(ana.target(), Vec3::new(10.0, 0.0, 0.0));

        roster.advance(ms(1500));
        assert_eq!(roster.get("ana").unwrap().position, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn malformed_remote_record_is_skipped() {
        let mut roster = RemoteRoster::new(&PresenceConfig::default());
        let changes = roster.apply_snapshot(&[doc("bad", "1, two, 3"), doc("ok", "1, 2, 3")], None, ms(0));
        assert_eq!(changes.spawned, vec!["ok".to_owned()]);
        assert!(roster.get("bad").is_none());
    }
}
