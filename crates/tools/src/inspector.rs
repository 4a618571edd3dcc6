use std::path::Path;

use serde::{Deserialize, Serialize};
use vista_common::{MeshId, PerfCounter};
use vista_kernel::{Mesh, Scene};

#[derive(Debug, thiserror::Error)]
pub enum InspectorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Scene inspector for developer tooling.
///
/// Only reads from the scene; safe to call between any two frames.
pub struct SceneInspector;

impl SceneInspector {
    pub fn summary(scene: &Scene) -> SceneSummary {
        SceneSummary {
            uid: scene.uid().to_string(),
            render_id: scene.render_id(),
            frame_id: scene.frame_id(),
            meshes: scene.meshes().len(),
            active_meshes: scene.active_meshes().len(),
            cameras: scene.cameras().len(),
            active_cameras: scene.active_cameras().len(),
            lights: scene.lights().len(),
            materials: scene.materials().len(),
            textures: scene.textures().len(),
            geometries: scene.geometries().len(),
            skeletons: scene.skeletons().len(),
            particle_systems: scene.particle_systems().len(),
            sprite_managers: scene.sprite_managers().len(),
            animation_groups: scene.animation_groups().len(),
            running_animatables: scene.active_animatable_count(),
            total_vertices: scene.total_vertices(),
            physics_enabled: scene.is_physics_enabled(),
            ready: scene.is_ready(),
        }
    }

    pub fn inspect_mesh(scene: &Scene, id: MeshId) -> Option<MeshInfo> {
        scene
            .get_mesh_by_unique_id(id)
            .map(|mesh| MeshInfo::from_mesh(mesh, scene.active_meshes().contains(&id)))
    }

    /// Every mesh in scene order.
    pub fn list_meshes(scene: &Scene) -> Vec<MeshInfo> {
        let active = scene.active_meshes();
        scene
            .meshes()
            .iter()
            .map(|m| MeshInfo::from_mesh(m, active.contains(&m.unique_id())))
            .collect()
    }

    pub fn perf(scene: &Scene) -> PerfSnapshot {
        let history = scene.frame_history();
        PerfSnapshot {
            fps: history.fps(),
            average_frame_ms: history.average().as_secs_f64() * 1000.0,
            last_frame_ms: scene.last_frame_duration().current(),
            evaluate_active_meshes_ms: scene.evaluate_active_meshes_duration().current(),
            render_ms: scene.render_duration().current(),
            particles_ms: scene.particles_duration().current(),
            sprites_ms: scene.sprites_duration().current(),
            active_indices: counter_total(scene.active_indices()),
            active_particles: counter_total(scene.active_particles()),
            active_bones: counter_total(scene.active_bones()),
        }
    }

    pub fn report(scene: &Scene) -> SceneReport {
        SceneReport {
            summary: Self::summary(scene),
            perf: Self::perf(scene),
            meshes: Self::list_meshes(scene),
        }
    }

    pub fn export_json(scene: &Scene) -> Result<String, InspectorError> {
        Ok(serde_json::to_string_pretty(&Self::report(scene))?)
    }

    pub fn save_json(scene: &Scene, path: impl AsRef<Path>) -> Result<(), InspectorError> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer_pretty(file, &Self::report(scene))?;
        tracing::debug!(path = %path.as_ref().display(), "scene report written");
        Ok(())
    }
}

fn counter_total(counter: &PerfCounter) -> u64 {
    counter.current().max(0.0) as u64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub uid: String,
    pub render_id: u64,
    pub frame_id: u64,
    pub meshes: usize,
    pub active_meshes: usize,
    pub cameras: usize,
    pub active_cameras: usize,
    pub lights: usize,
    pub materials: usize,
    pub textures: usize,
    pub geometries: usize,
    pub skeletons: usize,
    pub particle_systems: usize,
    pub sprite_managers: usize,
    pub animation_groups: usize,
    pub running_animatables: usize,
    pub total_vertices: usize,
    pub physics_enabled: bool,
    pub ready: bool,
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scene [{:.8}] frame={} meshes={} (active {}) cameras={} lights={} materials={} animatables={} ready={}",
            self.uid,
            self.frame_id,
            self.meshes,
            self.active_meshes,
            self.cameras,
            self.lights,
            self.materials,
            self.running_animatables,
            self.ready,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshInfo {
    pub unique_id: u32,
    pub id: String,
    pub name: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
    pub enabled: bool,
    pub visible: bool,
    pub pickable: bool,
    pub active: bool,
    pub material: Option<u32>,
    pub sub_meshes: usize,
    pub total_indices: u32,
    pub world_min: [f32; 3],
    pub world_max: [f32; 3],
}

impl MeshInfo {
    fn from_mesh(mesh: &Mesh, active: bool) -> Self {
        let t = &mesh.transform;
        let bb = &mesh.bounding_info().bounding_box;
        Self {
            unique_id: mesh.unique_id().0,
            id: mesh.id.clone(),
            name: mesh.name.clone(),
            position: t.position.to_array(),
            rotation: t.rotation.to_array(),
            scale: t.scale.to_array(),
            enabled: mesh.is_enabled,
            visible: mesh.is_visible,
            pickable: mesh.is_pickable,
            active,
            material: mesh.material.map(|m| m.0),
            sub_meshes: mesh.sub_meshes.len(),
            total_indices: mesh.total_indices(),
            world_min: bb.minimum_world.to_array(),
            world_max: bb.maximum_world.to_array(),
        }
    }
}

impl std::fmt::Display for MeshInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Mesh #{} '{}' pos=({:.2}, {:.2}, {:.2}) scale=({:.2}, {:.2}, {:.2}) indices={}{}",
            self.unique_id,
            self.name,
            self.position[0],
            self.position[1],
            self.position[2],
            self.scale[0],
            self.scale[1],
            self.scale[2],
            self.total_indices,
            if self.active { " [active]" } else { "" },
        )
    }
}

/// Frame timings in milliseconds plus last-frame counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfSnapshot {
    pub fps: f64,
    pub average_frame_ms: f64,
    pub last_frame_ms: f64,
    pub evaluate_active_meshes_ms: f64,
    pub render_ms: f64,
    pub particles_ms: f64,
    pub sprites_ms: f64,
    pub active_indices: u64,
    pub active_particles: u64,
    pub active_bones: u64,
}

impl std::fmt::Display for PerfSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fps={:.1} frame={:.3}ms eval={:.3}ms render={:.3}ms indices={}",
            self.fps,
            self.average_frame_ms,
            self.evaluate_active_meshes_ms,
            self.render_ms,
            self.active_indices,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneReport {
    pub summary: SceneSummary,
    pub perf: PerfSnapshot,
    pub meshes: Vec<MeshInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use vista_kernel::Camera;
    use vista_render::RecordingBackend;

    fn scene() -> Scene {
        Scene::new(Box::new(RecordingBackend::new(320, 240)))
    }

    #[test]
    fn summary_empty_scene() {
        let scene = scene();
        let summary = SceneInspector::summary(&scene);
        assert_eq!(summary.frame_id, 0);
        assert_eq!(summary.meshes, 0);
        assert!(summary.ready);
        assert!(format!("{summary}").contains("frame=0"));
    }

    #[test]
    fn summary_after_frames() {
        let mut scene = scene();
        scene.create_box("a", 1.0);
        scene.create_box("b", 1.0);
        scene.add_camera(Camera::new("cam", Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO));
        scene.render_with_delta(std::time::Duration::from_millis(16));

        let summary = SceneInspector::summary(&scene);
        assert_eq!(summary.frame_id, 1);
        assert_eq!(summary.meshes, 2);
        assert_eq!(summary.active_meshes, 2);
        assert_eq!(summary.geometries, 2);
        assert_eq!(summary.total_vertices, 48);

        let perf = SceneInspector::perf(&scene);
        assert_eq!(perf.active_indices, 72);
    }

    #[test]
    fn inspect_mesh_found_and_missing() {
        let mut scene = scene();
        let id = scene.create_sphere("ball", 8, 2.0);
        scene
            .mesh_mut(id)
            .unwrap()
            .set_position(Vec3::new(1.0, 2.0, 3.0));
        let info = SceneInspector::inspect_mesh(&scene, id).unwrap();
        assert_eq!(info.position, [1.0, 2.0, 3.0]);
        assert!(!info.active);
        assert!(format!("{info}").contains("'ball'"));
        assert!(SceneInspector::inspect_mesh(&scene, MeshId(9999)).is_none());
    }

    #[test]
    fn json_export() {
        let mut scene = scene();
        scene.create_plane("sign", 2.0);
        let json = SceneInspector::export_json(&scene).unwrap();
        let report: SceneReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report.meshes.len(), 1);
        assert_eq!(report.meshes[0].name, "sign");

        let tmp = tempfile::NamedTempFile::new().unwrap();
        SceneInspector::save_json(&scene, tmp.path()).unwrap();
        let text = std::fs::read_to_string(tmp.path()).unwrap();
        assert!(text.contains("\"summary\""));
    }
}
