//! Boundary crossing to area load, with a loading latch.
//!
//! A crossing only starts a load while the latch is idle. The latch closes when
//! the request is issued and reopens a cooldown after the load finishes, whether
//! it succeeded or not. Crossings seen in between are dropped.

use std::time::Duration;

use crate::config::StreamingConfig;
use crate::error::ContentError;
use crate::placement::{AreaDocument, PlacementRecord};
use crate::types::{CharacterState, MapEdge, MapLimits, Vec3};

/// Ask for a neighbouring area's content.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaLoadRequest {
    pub id: u64,
    pub location_id: String,
    pub edge: MapEdge,
    /// Applied to every placement of the loaded area.
    pub direction_offset: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Latch {
    Idle,
    Loading,
    CoolingUntil(Duration),
}

#[derive(Debug, Clone)]
pub struct StreamingTrigger {
    config: StreamingConfig,
    latch: Latch,
    next_id: u64,
}

impl StreamingTrigger {
    pub fn new(config: StreamingConfig) -> Self {
        Self {
            config,
            latch: Latch::Idle,
            next_id: 1,
        }
    }

    /// True while a load is in flight or cooling down.
    pub fn is_latched(&self, now: Duration) -> bool {
        match self.latch {
            Latch::Idle => false,
            Latch::Loading => true,
            Latch::CoolingUntil(until) => now < until,
        }
    }

    /// Reacts to the character being clamped at `edge` this frame.
    pub fn on_crossing(
        &mut self,
        edge: MapEdge,
        camera_forward: &Vec3,
        now: Duration,
    ) -> Option<AreaLoadRequest> {
        if self.is_latched(now) {
            log::debug!("ignoring {edge:?} crossing while an area load is latched");
            return None;
        }

        let location_id = self.config.locations.for_edge(edge).to_owned();
        log::info!("crossed {edge:?} edge, loading {location_id}");

        let id = self.next_id;
        self.next_id += 1;
        self.latch = Latch::Loading;
        Some(AreaLoadRequest {
            id,
            location_id,
            edge,
            direction_offset: camera_forward * self.config.offset_distance,
        })
    }

    /// Records the end of a load and starts the cooldown.
    ///
    /// Returns the document to apply on success. Failures are logged.
    pub fn finish(
        &mut self,
        request: &AreaLoadRequest,
        result: Result<AreaDocument, ContentError>,
        now: Duration,
    ) -> Option<AreaDocument> {
        self.latch = Latch::CoolingUntil(now + self.config.cooldown());
        match result {
            Ok(document) => Some(document),
            Err(err) => {
                log::error!("area load {} ({}) failed: {err}", request.id, request.location_id);
                None
            }
        }
    }
}

/// What changes in the scene once a new area is in.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedArea {
    pub location_id: String,
    pub placements: Vec<PlacementRecord>,
    pub limits: MapLimits,
    /// Remote players of the previous place, no longer mirrored.
    pub disposed_remotes: Vec<String>,
}

/// Places `document` around the character.
///
/// The character keeps its position but is lifted to at least `floor_y`.
/// Area-provided limits win; otherwise the old limits move with the content.
pub fn apply_area(
    request: &AreaLoadRequest,
    document: AreaDocument,
    character: &mut CharacterState,
    old_limits: &MapLimits,
    floor_y: f32,
) -> AppliedArea {
    if character.position.y < floor_y {
        character.position.y = floor_y;
    }

    let offset = request.direction_offset;
    let limits = document
        .limits
        .unwrap_or_else(|| old_limits.translated(&offset));
    let placements = document
        .arquitectura
        .iter()
        .map(|placement| placement.offset_by(&offset))
        .collect();

    AppliedArea {
        location_id: request.location_id.clone(),
        placements,
        limits,
        disposed_remotes: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn second_crossing_during_load_is_dropped() {
        let mut trigger = StreamingTrigger::new(StreamingConfig::default());
        let forward = Vec3::new(0.0, 0.0, 1.0);

        let first = trigger.on_crossing(MapEdge::North, &forward, ms(0)).unwrap();
        assert_eq!(first.location_id, "pijaoQuindio");
        assert_eq!(first.direction_offset, Vec3::new(0.0, 0.0, 100.0));
        assert!(trigger.on_crossing(MapEdge::East, &forward, ms(16)).is_none());

        trigger.finish(&first, Ok(AreaDocument::default()), ms(500));
        assert!(trigger.on_crossing(MapEdge::East, &forward, ms(1499)).is_none());

        let next = trigger.on_crossing(MapEdge::East, &forward, ms(1500)).unwrap();
        assert_eq!(next.location_id, "armeniaQuindio");
        assert_ne!(next.id, first.id);
    }

    #[test]
    fn failure_also_releases_after_cooldown() {
        let mut trigger = StreamingTrigger::new(StreamingConfig::default());
        let request = trigger
            .on_crossing(MapEdge::South, &Vec3::z(), ms(0))
            .unwrap();
        let failed = trigger.finish(
            &request,
            Err(ContentError::UnknownLocation("genovaQuindio".to_owned())),
            ms(100),
        );
        assert!(failed.is_none());
        assert!(trigger.is_latched(ms(1099)));
        assert!(!trigger.is_latched(ms(1100)));
    }

    #[test]
    fn applied_area_offsets_content_and_lifts_character() {
        let request = AreaLoadRequest {
            id: 1,
            location_id: "salentoQuindio".to_owned(),
            edge: MapEdge::West,
            direction_offset: Vec3::new(-100.0, 0.0, 0.0),
        };
        let document = AreaDocument::from_json(
            "test",
            r#"{ "arquitectura": [ { "position": "10, 0, 5", "name_glb": "casa" } ] }"#,
        )
        .unwrap();
        let mut character = CharacterState::spawn_at(Vec3::new(-100.0, -600.0, 3.0));

        let applied = apply_area(&request, document, &mut character, &MapLimits::default(), -498.7);

        assert_eq!(applied.placements[0].position, Vec3::new(-90.0, 0.0, 5.0));
        assert_eq!(applied.limits.west, -200.0);
        assert_eq!(applied.limits.east, 0.0);
        assert_eq!(character.position, Vec3::new(-100.0, -498.7, 3.0));
    }

    #[test]
    fn area_limits_override_translated_ones() {
        let request = AreaLoadRequest {
            id: 1,
            location_id: "pijaoQuindio".to_owned(),
            edge: MapEdge::North,
            direction_offset: Vec3::new(0.0, 0.0, 100.0),
        };
        let limits = MapLimits {
            north: 50.0,
            south: -50.0,
            east: 50.0,
            west: -50.0,
        };
        let document = AreaDocument {
            arquitectura: Vec::new(),
            limits: Some(limits),
        };
        let mut character = CharacterState::default();
        let applied = apply_area(&request, document, &mut character, &MapLimits::default(), -498.7);
        assert_eq!(applied.limits, limits);
    }
}
