//! Frustum and distance culling over a flat mesh registry.
//!
//! Two independent passes write two independent flags:
//! - the frustum pass toggles `enabled` on a tracked subset, a batch at a time
//! - the distance pass toggles `visible` on parent groups every frame
//!
//! Neither pass touches `check_collisions` or removes meshes.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::camera::CameraSnapshot;
use crate::config::VisibilityConfig;
use crate::placement::is_collision_proxy;
use crate::throttle::Throttle;
use crate::types::Vec3;

pub type MeshId = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneMesh {
    pub id: MeshId,
    pub name: String,
    pub parent: Option<MeshId>,
    /// World position of the mesh origin.
    pub position: Vec3,
    pub enabled: bool,
    pub visible: bool,
    pub check_collisions: bool,
    pub has_geometry: bool,
}

impl SceneMesh {
    pub fn new(id: MeshId, name: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            position,
            enabled: true,
            visible: true,
            check_collisions: false,
            has_geometry: true,
        }
    }

    pub fn with_parent(mut self, parent: MeshId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Meshes in insertion order with id lookup.
#[derive(Debug, Default, Clone)]
pub struct MeshRegistry {
    meshes: Vec<SceneMesh>,
    index: HashMap<MeshId, usize>,
}

impl MeshRegistry {
    /// Adds or replaces a mesh.
    pub fn insert(&mut self, mesh: SceneMesh) {
        match self.index.get(&mesh.id) {
            Some(&slot) => self.meshes[slot] = mesh,
            None => {
                self.index.insert(mesh.id, self.meshes.len());
                self.meshes.push(mesh);
            }
        }
    }

    pub fn remove(&mut self, id: MeshId) -> Option<SceneMesh> {
        let slot = self.index.remove(&id)?;
        let mesh = self.meshes.remove(slot);
        for (i, m) in self.meshes.iter().enumerate().skip(slot) {
            self.index.insert(m.id, i);
        }
        Some(mesh)
    }

    /// Drops every mesh `keep` rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(&SceneMesh) -> bool) {
        self.meshes.retain(|m| keep(m));
        self.index = self
            .meshes
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id, i))
            .collect();
    }

    pub fn get(&self, id: MeshId) -> Option<&SceneMesh> {
        self.index.get(&id).map(|&slot| &self.meshes[slot])
    }

    pub fn get_mut(&mut self, id: MeshId) -> Option<&mut SceneMesh> {
        self.index.get(&id).map(|&slot| &mut self.meshes[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneMesh> {
        self.meshes.iter()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Ids of every mesh below `root`, at any depth.
    pub fn descendants(&self, root: MeshId) -> Vec<MeshId> {
        let mut out = Vec::new();
        let mut frontier = vec![root];
        while let Some(parent) = frontier.pop() {
            for mesh in &self.meshes {
                if mesh.parent == Some(parent) {
                    out.push(mesh.id);
                    frontier.push(mesh.id);
                }
            }
        }
        out
    }
}

/// View-volume test supplied by the renderer.
pub trait Frustum {
    fn contains(&self, mesh: &SceneMesh) -> bool;
}

const EXCLUDED_NAME_PARTS: [&str; 8] = [
    "ui",
    "hud",
    "skybox",
    "ground",
    "terrain",
    "water",
    "collision",
    "cube",
];

/// Whether `mesh` is worth frustum-testing at all.
pub fn frustum_eligible(mesh: &SceneMesh, player: Option<MeshId>) -> bool {
    if Some(mesh.id) == player {
        return false;
    }
    let name = mesh.name.as_str();
    if EXCLUDED_NAME_PARTS.iter().any(|part| name.contains(part))
        || name.starts_with("__")
        || name == "visibleGround"
    {
        return false;
    }
    mesh.visible && mesh.enabled && mesh.has_geometry
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CullingStats {
    pub total: usize,
    pub culled: usize,
    pub visible: usize,
}

/// Batched, throttled frustum culling.
#[derive(Debug, Clone)]
pub struct FrustumCuller {
    enabled: bool,
    batch_size: usize,
    threshold: f32,
    rotation_threshold: f32,
    throttle: Throttle,
    tracked: Vec<MeshId>,
    cursor: usize,
    last_position: Option<Vec3>,
    last_orbit: Option<Vec3>,
}

impl FrustumCuller {
    pub fn new(config: &VisibilityConfig) -> Self {
        Self {
            enabled: true,
            batch_size: config.batch_size.max(1),
            threshold: config.frustum_threshold,
            rotation_threshold: config.rotation_threshold,
            throttle: Throttle::new(config.frustum_interval()),
            tracked: Vec::new(),
            cursor: 0,
            last_position: None,
            last_orbit: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Re-collects the tracked set. Call after meshes are added or removed.
    /// Meshes this culler disabled stay tracked so they can come back.
    pub fn refresh(&mut self, registry: &MeshRegistry, player: Option<MeshId>) {
        let previous: HashSet<MeshId> = self.tracked.iter().copied().collect();
        self.tracked = registry
            .iter()
            .filter(|mesh| {
                frustum_eligible(mesh, player)
                    || (!mesh.enabled
                        && previous.contains(&mesh.id)
                        && frustum_eligible(
                            &SceneMesh {
                                enabled: true,
                                ..(*mesh).clone()
                            },
                            player,
                        ))
            })
            .map(|mesh| mesh.id)
            .collect();
        self.cursor = 0;
        log::debug!("frustum culling tracks {} meshes", self.tracked.len());
    }

    /// Turning culling off re-enables everything it tracks.
    pub fn set_enabled(&mut self, enabled: bool, registry: &mut MeshRegistry, player: Option<MeshId>) {
        self.enabled = enabled;
        if enabled {
            self.refresh(registry, player);
        } else {
            for id in &self.tracked {
                if let Some(mesh) = registry.get_mut(*id) {
                    mesh.enabled = true;
                }
            }
        }
        log::info!(
            "frustum culling {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn configure(&mut self, threshold: Option<f32>, interval: Option<Duration>) {
        if let Some(threshold) = threshold {
            self.threshold = threshold;
        }
        if let Some(interval) = interval {
            self.throttle.set_interval(interval);
        }
        log::info!(
            "frustum culling configured: threshold={} interval={:?}",
            self.threshold,
            self.throttle.interval()
        );
    }

    /// Slows the pass down when frames are expensive and speeds it up when cheap.
    pub fn adapt_to_fps(&mut self, fps: f32) {
        let interval = if fps < 20.0 {
            Some(300)
        } else if fps < 30.0 {
            Some(200)
        } else if fps >= 45.0 {
            Some(100)
        } else {
            None
        };
        if let Some(ms) = interval {
            self.throttle.set_interval(Duration::from_millis(ms));
        }
    }

    pub fn interval(&self) -> Duration {
        self.throttle.interval()
    }

    /// Runs one batch if the interval elapsed and the camera moved enough.
    /// Returns whether a batch was processed.
    pub fn update(
        &mut self,
        registry: &mut MeshRegistry,
        frustum: &dyn Frustum,
        camera: &CameraSnapshot,
        now: Duration,
    ) -> bool {
        if !self.enabled || !self.throttle.ready(now) {
            return false;
        }

        let orbit = camera
            .orbit
            .map(|(alpha, beta, radius)| Vec3::new(alpha, beta, radius))
            .unwrap_or_else(Vec3::zeros);
        let moved = self
            .last_position
            .is_none_or(|last| (camera.position - last).norm() >= self.threshold);
        let turned = self
            .last_orbit
            .is_none_or(|last| (orbit - last).norm() >= self.rotation_threshold);
        if !moved && !turned {
            return false;
        }

        self.last_position = Some(camera.position);
        self.last_orbit = Some(orbit);
        self.throttle.mark(now);

        let total = self.tracked.len();
        if total == 0 {
            return true;
        }
        let start = self.cursor.min(total);
        let end = (start + self.batch_size).min(total);
        for id in &self.tracked[start..end] {
            let Some(mesh) = registry.get_mut(*id) else {
                continue;
            };
            let inside = frustum.contains(mesh);
            if inside != mesh.enabled {
                mesh.enabled = inside;
            }
        }
        self.cursor = if end >= total { 0 } else { end };
        true
    }

    pub fn stats(&self, registry: &MeshRegistry) -> CullingStats {
        let total = self.tracked.len();
        let visible = self
            .tracked
            .iter()
            .filter_map(|id| registry.get(*id))
            .filter(|mesh| mesh.enabled)
            .count();
        CullingStats {
            total,
            culled: total - visible,
            visible,
        }
    }
}

/// Hides parent groups (and everything under them) far from the player.
#[derive(Debug, Clone)]
pub struct DistanceCuller {
    pub max_distance: f32,
}

impl DistanceCuller {
    pub fn new(config: &VisibilityConfig) -> Self {
        Self {
            max_distance: config.max_distance,
        }
    }

    fn always_visible(name: &str) -> bool {
        matches!(name, "skyBox" | "visibleGround" | "collisionGround")
            || name.starts_with("cloud")
            || name.starts_with("__root__")
    }

    pub fn update(&self, registry: &mut MeshRegistry, player: Option<MeshId>, player_position: &Vec3) {
        let mut processed = HashSet::new();
        let groups: Vec<MeshId> = registry
            .iter()
            .map(|mesh| mesh.parent.unwrap_or(mesh.id))
            .filter(|group| processed.insert(*group))
            .collect();

        for group in groups {
            let Some(parent) = registry.get(group) else {
                continue;
            };
            if Some(group) == player || Self::always_visible(&parent.name) {
                if let Some(parent) = registry.get_mut(group) {
                    parent.visible = true;
                }
                continue;
            }

            let within = (parent.position - player_position).norm() <= self.max_distance;
            for child in registry.descendants(group) {
                let Some(child) = registry.get_mut(child) else {
                    continue;
                };
                if !within {
                    child.visible = false;
                } else if !is_collision_proxy(&child.name) {
                    child.visible = true;
                }
            }
            if let Some(parent) = registry.get_mut(group) {
                parent.visible = within;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Everything with `x >= 0` is in view.
    struct HalfSpaceFrustum;

    impl Frustum for HalfSpaceFrustum {
        fn contains(&self, mesh: &SceneMesh) -> bool {
            mesh.position.x >= 0.0
        }
    }

    fn camera_at(position: Vec3) -> CameraSnapshot {
        CameraSnapshot {
            position,
            forward: Vec3::z(),
            right: Vec3::x(),
            orbit: None,
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn populated(count: u32) -> MeshRegistry {
        let mut registry = MeshRegistry::default();
        for id in 0..count {
            let x = if id % 2 == 0 { 10.0 } else { -10.0 };
            let mut mesh = SceneMesh::new(id, format!("casa{id}"), Vec3::new(x, 0.0, 0.0));
            mesh.check_collisions = id % 3 == 0;
            registry.insert(mesh);
        }
        registry
    }

    #[test]
    fn eligibility_skips_special_meshes() {
        let plain = SceneMesh::new(1, "casa", Vec3::zeros());
        assert!(frustum_eligible(&plain, None));
        assert!(!frustum_eligible(&plain, Some(1)));
        for name in ["collisionWall", "visibleGround", "__root__", "skybox", "hudArrow"] {
            assert!(!frustum_eligible(&SceneMesh::new(2, name, Vec3::zeros()), None), "{name}");
        }
        let hollow = SceneMesh {
            has_geometry: false,
            ..plain.clone()
        };
        assert!(!frustum_eligible(&hollow, None));
    }

    #[test]
    fn batches_walk_the_tracked_set_round_robin() {
        let mut registry = populated(50);
        let mut culler = FrustumCuller::new(&VisibilityConfig::default());
        culler.refresh(&registry, None);

        assert!(culler.update(&mut registry, &HalfSpaceFrustum, &camera_at(Vec3::zeros()), ms(0)));
        assert_eq!(culler.stats(&registry).culled, 10);

        // Camera still: no further batches even after the interval.
        assert!(!culler.update(&mut registry, &HalfSpaceFrustum, &camera_at(Vec3::zeros()), ms(500)));

        let moved = camera_at(Vec3::new(0.0, 0.0, 5.0));
        assert!(culler.update(&mut registry, &HalfSpaceFrustum, &moved, ms(550)));
        assert_eq!(culler.stats(&registry).culled, 20);

        // Moved back, but inside the interval.
        let origin = camera_at(Vec3::zeros());
        assert!(!culler.update(&mut registry, &HalfSpaceFrustum, &origin, ms(600)));
        assert!(culler.update(&mut registry, &HalfSpaceFrustum, &origin, ms(800)));
        let stats = culler.stats(&registry);
        assert_eq!(stats.total, 50);
        assert_eq!(stats.culled, 25);
        assert_eq!(stats.visible, 25);
    }

    #[test]
    fn culling_never_touches_collision_flags() {
        let mut registry = populated(30);
        let before: Vec<bool> = registry.iter().map(|m| m.check_collisions).collect();

        let mut frustum = FrustumCuller::new(&VisibilityConfig::default());
        frustum.refresh(&registry, None);
        let distance = DistanceCuller::new(&VisibilityConfig::default());
        for step in 0..10u64 {
            let camera = camera_at(Vec3::new(step as f32 * 3.0, 0.0, 0.0));
            frustum.update(&mut registry, &HalfSpaceFrustum, &camera, ms(step * 250));
            distance.update(&mut registry, None, &Vec3::new(500.0, 0.0, 0.0));
        }

        let after: Vec<bool> = registry.iter().map(|m| m.check_collisions).collect();
        assert_eq!(before, after);
        assert_eq!(registry.len(), 30);
    }

    #[test]
    fn disabling_restores_every_tracked_mesh() {
        let mut registry = populated(10);
        let mut culler = FrustumCuller::new(&VisibilityConfig::default());
        culler.refresh(&registry, None);
        culler.update(&mut registry, &HalfSpaceFrustum, &camera_at(Vec3::zeros()), ms(0));
        assert_eq!(culler.stats(&registry).culled, 5);

        culler.set_enabled(false, &mut registry, None);
        assert_eq!(culler.stats(&registry).culled, 0);
        assert!(!culler.update(&mut registry, &HalfSpaceFrustum, &camera_at(Vec3::x() * 9.0), ms(1000)));
    }

    #[test]
    fn refresh_keeps_meshes_it_culled() {
        let mut registry = populated(4);
        let mut culler = FrustumCuller::new(&VisibilityConfig::default());
        culler.refresh(&registry, None);
        culler.update(&mut registry, &HalfSpaceFrustum, &camera_at(Vec3::zeros()), ms(0));
        assert!(!registry.get(1).unwrap().enabled);

        registry.insert(SceneMesh::new(10, "arbol", Vec3::new(5.0, 0.0, 0.0)));
        culler.refresh(&registry, None);
        assert_eq!(culler.stats(&registry).total, 5);
        assert_eq!(culler.stats(&registry).culled, 2);
    }

    #[test]
    fn fps_adapts_interval() {
        let mut culler = FrustumCuller::new(&VisibilityConfig::default());
        culler.adapt_to_fps(15.0);
        assert_eq!(culler.interval(), ms(300));
        culler.adapt_to_fps(35.0);
        assert_eq!(culler.interval(), ms(300));
        culler.adapt_to_fps(60.0);
        assert_eq!(culler.interval(), ms(100));
    }

    #[test]
    fn far_groups_hide_with_children() {
        let mut registry = MeshRegistry::default();
        registry.insert(SceneMesh::new(1, "casa", Vec3::new(200.0, 0.0, 0.0)));
        registry.insert(SceneMesh::new(2, "ventana", Vec3::new(200.0, 1.0, 0.0)).with_parent(1));
        let mut proxy = SceneMesh::new(3, "collisionCasa", Vec3::new(200.0, 0.0, 0.0)).with_parent(1);
        proxy.visible = false;
        proxy.check_collisions = true;
        registry.insert(proxy);
        registry.insert(SceneMesh::new(4, "skyBox", Vec3::new(900.0, 0.0, 0.0)));

        let culler = DistanceCuller::new(&VisibilityConfig::default());
        culler.update(&mut registry, None, &Vec3::zeros());
        assert!(!registry.get(1).unwrap().visible);
        assert!(!registry.get(2).unwrap().visible);
        assert!(registry.get(4).unwrap().visible);

        culler.update(&mut registry, None, &Vec3::new(150.0, 0.0, 0.0));
        assert!(registry.get(1).unwrap().visible);
        assert!(registry.get(2).unwrap().visible);
        assert!(!registry.get(3).unwrap().visible);
        assert!(registry.get(3).unwrap().check_collisions);
    }
}
