use glam::Vec3;
use vista_common::{MeshId, ReflectionProbeId, SceneUid};

/// Cube-map capture point. The scene keeps its render list free of
/// removed meshes.
#[derive(Debug, Clone)]
pub struct ReflectionProbe {
    pub(crate) unique_id: ReflectionProbeId,
    pub name: String,
    pub position: Vec3,
    /// Cube face resolution in pixels.
    pub size: u32,
    pub refresh_rate: u32,
    pub render_list: Vec<MeshId>,
    /// Probe follows this mesh's position when set.
    pub attached_mesh: Option<MeshId>,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl ReflectionProbe {
    pub fn new(name: impl Into<String>, size: u32) -> Self {
        Self {
            unique_id: ReflectionProbeId(0),
            name: name.into(),
            position: Vec3::ZERO,
            size,
            refresh_rate: 1,
            render_list: Vec::new(),
            attached_mesh: None,
            scene_uid: None,
        }
    }

    pub fn unique_id(&self) -> ReflectionProbeId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }

    pub(crate) fn forget_mesh(&mut self, mesh: MeshId) {
        self.render_list.retain(|m| *m != mesh);
        if self.attached_mesh == Some(mesh) {
            self.attached_mesh = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forgetting_a_mesh_cleans_both_links() {
        let mut p = ReflectionProbe::new("probe", 256);
        p.render_list = vec![MeshId(1), MeshId(2)];
        p.attached_mesh = Some(MeshId(1));
        p.forget_mesh(MeshId(1));
        assert_eq!(p.render_list, vec![MeshId(2)]);
        assert!(p.attached_mesh.is_none());
    }
}
