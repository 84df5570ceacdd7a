//! The per-frame scene loop.
//!
//! [`SceneController::tick`] runs every stage once, in a fixed order:
//!
//! input, camera, vertical, collision, boundary, visibility, presence, animation
//!
//! Movement is fully resolved before anything reads the character transform.
//! Slow work (area loads, roster snapshots) is handed out as requests in the
//! [`FrameReport`] and fed back on a later frame.

use std::time::Duration;

use crate::animation::{AnimationCommand, AnimationSelector, FacingUpdater};
use crate::camera::{
    CameraDirectionCache, CameraSnapshot, OrbitLimits, OrbitLimitsController, project_to_tangent,
};
use crate::collision::{CollisionResolver, CollisionWorld, ResolveOutcome};
use crate::config::ControllerConfig;
use crate::constants::{
    CAMERA_DIRECTION_INTERVAL, FACING_INTERVAL, FPS_SAMPLE_INTERVAL, MAX_FRAME_SCALE,
    REFERENCE_TICK_HZ,
};
use crate::diagnostics::{DebugCapabilities, DebugCommand, FpsMonitor};
use crate::error::ContentError;
use crate::input::{InputAggregator, JoystickSample, MovementIntent};
use crate::placement::{AreaDocument, FincaRecord, PlacementRecord};
use crate::presence::{
    AfkMonitor, IdSource, LocalPresence, PresenceDocument, PresenceStore, PresenceSynchronizer,
    PresenceWrite, RemoteRoster, RosterChanges,
};
use crate::session::{FINCA_KEY, SessionStore, USER_INFO_KEY};
use crate::streaming::{AppliedArea, AreaLoadRequest, StreamingTrigger, apply_area};
use crate::subscriptions::SubscriptionRegistry;
use crate::types::{CharacterState, MapLimits, PlayerProfile, Vec3, WorldMode};
use crate::vertical;
use crate::visibility::{CullingStats, DistanceCuller, Frustum, FrustumCuller, MeshId, MeshRegistry};

/// Per-frame quantities are tuned for 60 Hz; this rescales them to `dt`.
pub fn frame_scale(dt: f32) -> f32 {
    (dt * REFERENCE_TICK_HZ).clamp(0.0, MAX_FRAME_SCALE)
}

/// Meshes that survive an area swap.
const PERSISTENT_MESHES: [&str; 2] = ["collisionGround", "visibleGround"];

/// Everything the engine tells the loop about this frame.
pub struct FrameContext<'a> {
    /// Time since the scene started.
    pub now: Duration,
    /// Seconds since the previous frame.
    pub dt: f32,
    pub camera: Option<CameraSnapshot>,
    /// Raw stick sample; `None` when the stick is released.
    pub joystick: Option<JoystickSample>,
    pub frustum: Option<&'a dyn Frustum>,
    /// Pointer or key activity this frame, for AFK detection.
    pub activity: bool,
}

/// What the engine has to act on after a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub intent: MovementIntent,
    pub resolve: ResolveOutcome,
    pub area_request: Option<AreaLoadRequest>,
    pub orbit_limits: Option<OrbitLimits>,
    pub animation: AnimationCommand,
    /// New yaw for the character, if it turned.
    pub facing: Option<f32>,
    pub presence: Option<PresenceWrite>,
    pub afk_removed: bool,
    pub session_cleared: bool,
}

/// How a scene starts.
pub struct SceneSetup {
    pub config: ControllerConfig,
    pub mode: WorldMode,
    pub place: String,
    pub limits: MapLimits,
    pub spawn: Vec3,
    pub profile: Option<PlayerProfile>,
    pub debug: DebugCapabilities,
    pub ids: Box<dyn IdSource + Send + Sync>,
}

/// Owns the character and every stage of the loop for one scene.
pub struct SceneController {
    config: ControllerConfig,
    mode: WorldMode,
    place: String,
    limits: MapLimits,
    character: CharacterState,
    input: InputAggregator,
    camera: CameraDirectionCache,
    camera_missing: bool,
    orbit_limits: OrbitLimitsController,
    resolver: CollisionResolver,
    streaming: StreamingTrigger,
    registry: MeshRegistry,
    player_mesh: Option<MeshId>,
    frustum: FrustumCuller,
    distance: DistanceCuller,
    session: SessionStore,
    presence: PresenceSynchronizer,
    roster: RemoteRoster,
    afk: AfkMonitor,
    ids: Box<dyn IdSource + Send + Sync>,
    animation: AnimationSelector,
    facing: FacingUpdater,
    fps: FpsMonitor,
    debug: DebugCapabilities,
    subscriptions: SubscriptionRegistry,
}

impl SceneController {
    pub fn new(setup: SceneSetup, now: Duration) -> Self {
        let config = setup.config;
        let mut character = CharacterState::spawn_at(setup.spawn);
        if setup.mode == WorldMode::Flat && character.position.y < config.collision.floor_y() {
            character.position.y = config.collision.floor_y();
        }
        log::info!("scene {} started in {:?} mode", setup.place, setup.mode);

        Self {
            input: InputAggregator::new(&config.input),
            camera: CameraDirectionCache::new(CAMERA_DIRECTION_INTERVAL),
            camera_missing: false,
            orbit_limits: OrbitLimitsController::default(),
            resolver: CollisionResolver::new(config.collision.clone()),
            streaming: StreamingTrigger::new(config.streaming.clone()),
            registry: MeshRegistry::default(),
            player_mesh: None,
            frustum: FrustumCuller::new(&config.visibility),
            distance: DistanceCuller::new(&config.visibility),
            session: SessionStore::default(),
            presence: PresenceSynchronizer::new(&config.presence, setup.profile, now),
            roster: RemoteRoster::new(&config.presence),
            afk: AfkMonitor::new(config.presence.afk_timeout(), now),
            ids: setup.ids,
            animation: AnimationSelector::default(),
            facing: FacingUpdater::new(FACING_INTERVAL),
            fps: FpsMonitor::new(FPS_SAMPLE_INTERVAL, now, REFERENCE_TICK_HZ),
            debug: setup.debug,
            subscriptions: SubscriptionRegistry::default(),
            mode: setup.mode,
            place: setup.place,
            limits: setup.limits,
            character,
            config,
        }
    }

    pub fn character(&self) -> &CharacterState {
        &self.character
    }

    pub fn place(&self) -> &str {
        &self.place
    }

    pub fn limits(&self) -> &MapLimits {
        &self.limits
    }

    pub fn mode(&self) -> WorldMode {
        self.mode
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn fps(&self) -> f32 {
        self.fps.fps()
    }

    pub fn input_mut(&mut self) -> &mut InputAggregator {
        &mut self.input
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    pub fn registry(&self) -> &MeshRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MeshRegistry {
        &mut self.registry
    }

    pub fn roster(&self) -> &RemoteRoster {
        &self.roster
    }

    pub fn subscriptions_mut(&mut self) -> &mut SubscriptionRegistry {
        &mut self.subscriptions
    }

    /// Which registry mesh is the local character. It is never culled.
    pub fn set_player_mesh(&mut self, id: MeshId) {
        self.player_mesh = Some(id);
    }

    /// Re-collects frustum candidates after meshes were added or removed.
    pub fn refresh_visibility(&mut self) {
        self.frustum.refresh(&self.registry, self.player_mesh);
    }

    pub fn culling_stats(&self) -> CullingStats {
        self.frustum.stats(&self.registry)
    }

    /// Runs one frame.
    pub fn tick(
        &mut self,
        frame: &FrameContext<'_>,
        world: &dyn CollisionWorld,
        store: &mut dyn PresenceStore,
    ) -> FrameReport {
        let now = frame.now;
        let scale = frame_scale(frame.dt);
        if let Some(fps) = self.fps.frame(now) {
            self.frustum.adapt_to_fps(fps);
        }

        // Input
        self.input
            .push_joystick(frame.joystick, self.fps.fps(), &self.config.input);
        let intent = self.input.aggregate(&self.character, &self.config.input);
        if (frame.activity || intent.is_moving()) && self.afk.activity(now) {
            log::info!("player is back, presence resumes");
            self.presence.invalidate();
        }
        let session_cleared = intent.clear_session && self.apply_debug(DebugCommand::ClearSession);

        // Camera
        let mut orbit_limits = None;
        match &frame.camera {
            Some(camera) => {
                self.camera_missing = false;
                self.camera.refresh(camera, now);
                if camera.orbit.is_some() {
                    orbit_limits = self.orbit_limits.update(intent.joystick_active, now);
                }
            }
            None => {
                if !self.camera_missing {
                    log::warn!("no active camera, moving along the last known basis");
                    self.camera_missing = true;
                }
            }
        }
        let horizontal = self.horizontal_motion(&intent, scale);

        // Vertical
        let motion = vertical::integrate(
            &mut self.character,
            &intent,
            world,
            self.mode,
            &self.config.vertical,
            &self.config.collision,
            scale,
        );

        // Collision
        let displacement = horizontal + Vec3::new(0.0, motion.dy, 0.0);
        let resolve = self.resolver.resolve(
            world,
            &mut self.character,
            &displacement,
            &self.limits,
            self.mode,
        );

        // Boundary
        let area_request = resolve
            .crossed
            .and_then(|edge| self.streaming.on_crossing(edge, &self.camera.forward(), now));

        // Visibility
        if let (Some(frustum), Some(camera)) = (frame.frustum, &frame.camera) {
            self.frustum.update(&mut self.registry, frustum, camera, now);
        }
        self.distance
            .update(&mut self.registry, self.player_mesh, &self.character.position);

        // Presence
        let mut afk_removed = false;
        if self.afk.check(now) {
            log::info!("player idle, removing presence record");
            PresenceSynchronizer::remove(store, &self.session);
            afk_removed = true;
        }
        let presence = if self.afk.is_idle() {
            None
        } else {
            let local = LocalPresence {
                position: self.character.position,
                rotation: self.character.rotation,
                animation: self.animation.active_names(),
                place: self.place.clone(),
            };
            self.presence
                .tick(&local, store, &mut self.session, self.ids.as_mut(), now)
        };
        self.roster.advance(now);

        // Animation
        let moving = horizontal.x != 0.0 || horizontal.z != 0.0;
        let animation = self.animation.select(
            motion.jumped,
            self.character.grounded,
            moving,
            intent.speed,
        );
        let facing = self.facing.update(&horizontal, now);
        if let Some(yaw) = facing {
            self.character.rotation.y = yaw;
        }

        FrameReport {
            intent,
            resolve,
            area_request,
            orbit_limits,
            animation,
            facing,
            presence,
            afk_removed,
            session_cleared,
        }
    }

    /// Camera-relative, speed-scaled horizontal displacement for this frame.
    fn horizontal_motion(&self, intent: &MovementIntent, scale: f32) -> Vec3 {
        let mut world = self.camera.to_world(&intent.local);
        world.y = 0.0;
        if self.mode.is_planet() {
            world = project_to_tangent(&world, &self.character.position);
        }
        world
            .try_normalize(0.0)
            .map_or_else(Vec3::zeros, |direction| direction * intent.speed * scale)
    }

    /// Finishes an area load issued by an earlier [`FrameReport::area_request`].
    ///
    /// On success the scene's meshes are dropped except the ground and the
    /// player; the caller inserts the returned placements and then calls
    /// [`Self::refresh_visibility`].
    pub fn complete_area_load(
        &mut self,
        request: &AreaLoadRequest,
        result: Result<AreaDocument, ContentError>,
        now: Duration,
    ) -> Option<AppliedArea> {
        let document = self.streaming.finish(request, result, now)?;
        let mut applied = apply_area(
            request,
            document,
            &mut self.character,
            &self.limits,
            self.config.collision.floor_y(),
        );

        let player = self.player_mesh;
        self.registry.retain(|mesh| {
            Some(mesh.id) == player || PERSISTENT_MESHES.contains(&mesh.name.as_str())
        });
        self.limits = applied.limits;
        self.place = applied.location_id.clone();
        applied.disposed_remotes = self.roster.clear();
        self.presence.invalidate();
        log::info!(
            "area {} applied with {} placements",
            applied.location_id,
            applied.placements.len()
        );
        Some(applied)
    }

    /// The player's farm holding `placements`, ready to be saved.
    ///
    /// Reuses the farm remembered in the session, or founds one for the
    /// signed-in (else anonymous) player and remembers it.
    pub fn finca_to_save(&mut self, user_id: &str, placements: Vec<PlacementRecord>) -> FincaRecord {
        let mut finca = match self.session.get_item::<FincaRecord>(FINCA_KEY) {
            Some(finca) => finca,
            None => {
                let id = self.ids.next_id();
                let owner = self
                    .session
                    .get_item::<PlayerProfile>(USER_INFO_KEY)
                    .unwrap_or_else(|| PlayerProfile::anonymous(String::new()));
                log::info!("founding finca {id} for {}", owner.name);
                FincaRecord::founded(id, &owner, user_id)
            }
        };
        finca.arquitectura = placements;
        self.session.set_item(FINCA_KEY, &finca);
        finca
    }

    /// Remembers a farm the store holds for this player.
    pub fn remember_finca(&mut self, finca: &FincaRecord) {
        self.session.set_item(FINCA_KEY, finca);
    }

    /// Mirrors a snapshot of the other players in the current place.
    pub fn apply_remote_snapshot(&mut self, docs: &[PresenceDocument], now: Duration) -> RosterChanges {
        let local_id = PresenceSynchronizer::character_id(&self.session);
        self.roster.apply_snapshot(docs, local_id.as_deref(), now)
    }

    /// Runs a developer command if this build allows it.
    pub fn apply_debug(&mut self, command: DebugCommand) -> bool {
        if !self.debug.allows(&command) {
            log::debug!("debug command {command:?} is not enabled");
            return false;
        }
        match command {
            DebugCommand::ClearSession => {
                self.session.clear();
                self.presence.invalidate();
            }
            DebugCommand::SetCulling(enabled) => {
                self.frustum
                    .set_enabled(enabled, &mut self.registry, self.player_mesh);
            }
            DebugCommand::ConfigureCulling {
                threshold,
                interval,
            } => self.frustum.configure(threshold, interval),
        }
        true
    }

    /// Scene teardown: removes the presence record and runs every teardown.
    pub fn shutdown(&mut self, store: &mut dyn PresenceStore) {
        PresenceSynchronizer::remove(store, &self.session);
        self.subscriptions.dispose_all();
        log::info!("scene {} shut down", self.place);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::EmptyWorld;
    use crate::input::InputKey;
    use crate::presence::{LocalPresenceStore, SequentialIds};
    use crate::types::MapEdge;
    use crate::visibility::SceneMesh;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn controller(mode: WorldMode) -> SceneController {
        let setup = SceneSetup {
            config: ControllerConfig::default(),
            mode,
            place: "pueblo".to_owned(),
            limits: MapLimits::default(),
            spawn: Vec3::new(0.0, -498.7, 0.0),
            profile: None,
            debug: DebugCapabilities::all(),
            ids: Box::new(SequentialIds::new("test")),
        };
        SceneController::new(setup, Duration::ZERO)
    }

    fn camera() -> CameraSnapshot {
        CameraSnapshot {
            position: Vec3::new(0.0, -490.0, -20.0),
            forward: Vec3::z(),
            right: Vec3::x(),
            orbit: None,
        }
    }

    fn frame(now: Duration) -> FrameContext<'static> {
        FrameContext {
            now,
            dt: 1.0 / 60.0,
            camera: Some(camera()),
            joystick: None,
            frustum: None,
            activity: false,
        }
    }

    #[test]
    fn frame_scale_is_clamped() {
        assert!((frame_scale(1.0 / 60.0) - 1.0).abs() < 1.0e-6);
        assert!((frame_scale(1.0 / 30.0) - 2.0).abs() < 1.0e-6);
        assert_eq!(frame_scale(1.0), MAX_FRAME_SCALE);
    }

    #[test]
    fn walking_forward_moves_along_camera_forward() {
        let mut scene = controller(WorldMode::Flat);
        let mut store = LocalPresenceStore::default();
        scene.input.keyboard.press(InputKey::Forward);

        let report = scene.tick(&frame(ms(16)), &EmptyWorld, &mut store);

        let position = scene.character().position;
        assert!((position.z - 2.0).abs() < 1.0e-4);
        assert!((position.y + 498.7).abs() < 1.0e-3);
        assert!(scene.character().grounded);
        assert_eq!(
            report.animation,
            AnimationCommand::Play {
                clip: crate::animation::AnimationClip::Walk,
                speed: 2.5
            }
        );
        assert!(report.facing.is_some());
    }

    #[test]
    fn crossing_an_edge_requests_the_neighbour_once() {
        let mut scene = controller(WorldMode::Flat);
        let mut store = LocalPresenceStore::default();
        scene.input.keyboard.press(InputKey::Right);

        let mut requests = Vec::new();
        for i in 0..60u64 {
            let report = scene.tick(&frame(ms(16 * (i + 1))), &EmptyWorld, &mut store);
            requests.extend(report.area_request);
        }

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].edge, MapEdge::East);
        assert_eq!(requests[0].location_id, "armeniaQuindio");
        assert_eq!(scene.character().position.x, 100.0);
    }

    #[test]
    fn area_load_swaps_limits_and_keeps_ground() {
        let mut scene = controller(WorldMode::Flat);
        let mut store = LocalPresenceStore::default();
        scene.registry_mut().insert(SceneMesh::new(1, "collisionGround", Vec3::zeros()));
        scene.registry_mut().insert(SceneMesh::new(2, "casa1", Vec3::zeros()));
        scene.registry_mut().insert(SceneMesh::new(3, "personaje", Vec3::zeros()));
        scene.set_player_mesh(3);

        scene.input.keyboard.press(InputKey::Right);
        let mut request = None;
        for i in 0..60u64 {
            let report = scene.tick(&frame(ms(16 * (i + 1))), &EmptyWorld, &mut store);
            request = request.or(report.area_request);
        }
        let request = request.unwrap();

        let applied = scene
            .complete_area_load(&request, Ok(AreaDocument::default()), ms(2000))
            .unwrap();
        assert_eq!(scene.place(), "armeniaQuindio");
        assert_eq!(scene.limits(), &applied.limits);
        assert_eq!(applied.limits.north, 5100.0);
        assert_eq!(applied.limits.east, 100.0);
        assert!(scene.registry().get(2).is_none());
        assert!(scene.registry().get(1).is_some());
        assert!(scene.registry().get(3).is_some());
    }

    #[test]
    fn presence_is_published_after_one_interval() {
        let mut scene = controller(WorldMode::Flat);
        let mut store = LocalPresenceStore::default();

        let early = scene.tick(&frame(ms(50)), &EmptyWorld, &mut store);
        assert_eq!(early.presence, None);

        let report = scene.tick(&frame(ms(100)), &EmptyWorld, &mut store);
        assert_eq!(report.presence, Some(PresenceWrite::Created("test-1".to_owned())));
        assert_eq!(store.snapshot("pueblo").len(), 1);

        scene.shutdown(&mut store);
        assert!(store.snapshot("pueblo").is_empty());
    }

    #[test]
    fn idle_record_stays_deleted_until_activity() {
        let mut scene = controller(WorldMode::Flat);
        let mut store = LocalPresenceStore::default();
        scene.tick(&frame(ms(100)), &EmptyWorld, &mut store);
        scene.tick(&frame(ms(200)), &EmptyWorld, &mut store);
        assert_eq!(store.snapshot("pueblo").len(), 1);

        let idle_at = Duration::from_secs(301);
        let report = scene.tick(&frame(idle_at), &EmptyWorld, &mut store);
        assert!(report.afk_removed);
        assert!(store.snapshot("pueblo").is_empty());

        for i in 1..=5u64 {
            let report = scene.tick(&frame(idle_at + ms(100 * i)), &EmptyWorld, &mut store);
            assert_eq!(report.presence, None);
            assert!(!report.afk_removed);
        }
        assert!(store.snapshot("pueblo").is_empty());

        let mut back = frame(Duration::from_secs(302));
        back.activity = true;
        let report = scene.tick(&back, &EmptyWorld, &mut store);
        assert_eq!(report.presence, Some(PresenceWrite::Created("test-1".to_owned())));
        assert_eq!(store.snapshot("pueblo").len(), 1);
    }

    #[test]
    fn area_swap_reports_disposed_remote_players() {
        let mut scene = controller(WorldMode::Flat);
        let mut store = LocalPresenceStore::default();
        let remote = |id: &str| PresenceDocument {
            id: id.to_owned(),
            name: id.to_owned(),
            position: "1, -498.7, 1".to_owned(),
            rotation: "0, 0, 0".to_owned(),
            place: "pueblo".to_owned(),
            ..PresenceDocument::default()
        };
        let changes = scene.apply_remote_snapshot(&[remote("luis"), remote("ana")], ms(10));
        assert_eq!(changes.spawned.len(), 2);

        scene.input.keyboard.press(InputKey::Right);
        let mut request = None;
        for i in 0..60u64 {
            let report = scene.tick(&frame(ms(16 * (i + 1))), &EmptyWorld, &mut store);
            request = request.or(report.area_request);
        }
        let applied = scene
            .complete_area_load(&request.unwrap(), Ok(AreaDocument::default()), ms(2000))
            .unwrap();

        assert_eq!(applied.disposed_remotes, vec!["ana", "luis"]);
        assert!(scene.roster().is_empty());
    }

    #[test]
    fn finca_is_founded_once_then_reused() {
        let mut scene = controller(WorldMode::Flat);
        let casa = PlacementRecord {
            position: Vec3::new(1.0, -500.0, 2.0),
            rotation: Vec3::zeros(),
            scaling: Vec3::new(1.0, 1.0, 1.0),
            name_glb: "casa1.glb".to_owned(),
            animations: Vec::new(),
        };

        let first = scene.finca_to_save("c0ffee", vec![casa]);
        assert_eq!(first.id, "test-1");
        assert_eq!(first.name, "Finca de Anónimo");
        assert_eq!(first.user_id, "c0ffee");
        assert_eq!(first.arquitectura.len(), 1);

        let second = scene.finca_to_save("c0ffee", Vec::new());
        assert_eq!(second.id, first.id);
        assert!(second.arquitectura.is_empty());
        let remembered: FincaRecord = scene.session().get_item(FINCA_KEY).unwrap();
        assert_eq!(remembered, second);
    }

    #[test]
    fn missing_camera_still_moves_along_cached_basis() {
        let mut scene = controller(WorldMode::Flat);
        let mut store = LocalPresenceStore::default();
        scene.input.keyboard.press(InputKey::Forward);
        let mut no_camera = frame(ms(16));
        no_camera.camera = None;

        scene.tick(&no_camera, &EmptyWorld, &mut store);
        assert!(scene.character().position.z > 0.0);
    }

    #[test]
    fn debug_clear_wipes_session() {
        let mut scene = controller(WorldMode::Flat);
        let mut store = LocalPresenceStore::default();
        scene.tick(&frame(ms(100)), &EmptyWorld, &mut store);
        assert!(!scene.session().is_empty());

        scene.input.keyboard.press(InputKey::ClearSession);
        let report = scene.tick(&frame(ms(116)), &EmptyWorld, &mut store);
        assert!(report.session_cleared);
        assert!(scene.session().is_empty());
    }

    #[test]
    fn planet_mode_stays_on_the_surface() {
        let setup = SceneSetup {
            config: ControllerConfig::default(),
            mode: WorldMode::planet(),
            place: "planeta".to_owned(),
            limits: MapLimits::default(),
            spawn: Vec3::new(0.0, 200.0, 0.0),
            profile: None,
            debug: DebugCapabilities::disabled(),
            ids: Box::new(SequentialIds::new("test")),
        };
        let mut scene = SceneController::new(setup, Duration::ZERO);
        let mut store = LocalPresenceStore::default();
        scene.input.keyboard.press(InputKey::Forward);
        for i in 0..30u64 {
            scene.tick(&frame(ms(16 * (i + 1))), &EmptyWorld, &mut store);
        }
        let position = scene.character().position;
        assert!((position.norm() - 200.0).abs() < 1.0e-3);
        assert!(position.z > 0.0);
    }
}
