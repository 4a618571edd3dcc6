use glam::Vec3;
use serde::{Deserialize, Serialize};
use vista_animation::Animation;
use vista_common::{Color3, LightId, MeshId, SceneUid, Tags};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Point,
    Directional {
        direction: Vec3,
    },
    Spot {
        direction: Vec3,
        angle: f32,
        exponent: f32,
    },
    Hemispheric {
        direction: Vec3,
        ground_color: Color3,
    },
}

#[derive(Debug, Clone)]
pub struct Light {
    pub(crate) unique_id: LightId,
    pub id: String,
    pub name: String,
    pub kind: LightKind,
    pub position: Vec3,
    pub diffuse: Color3,
    pub specular: Color3,
    pub intensity: f32,
    pub is_enabled: bool,
    /// When non-empty, only these meshes are lit.
    pub included_only_meshes: Vec<MeshId>,
    pub excluded_meshes: Vec<MeshId>,
    pub tags: Tags,
    pub animations: Vec<Animation>,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl Light {
    pub fn new(name: impl Into<String>, kind: LightKind) -> Self {
        let name = name.into();
        Self {
            unique_id: LightId(0),
            id: name.clone(),
            name,
            kind,
            position: Vec3::ZERO,
            diffuse: Color3::WHITE,
            specular: Color3::WHITE,
            intensity: 1.0,
            is_enabled: true,
            included_only_meshes: Vec::new(),
            excluded_meshes: Vec::new(),
            tags: Tags::new(),
            animations: Vec::new(),
            scene_uid: None,
        }
    }

    pub fn point(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            position,
            ..Self::new(name, LightKind::Point)
        }
    }

    pub fn hemispheric(name: impl Into<String>, direction: Vec3) -> Self {
        Self::new(
            name,
            LightKind::Hemispheric {
                direction,
                ground_color: Color3::BLACK,
            },
        )
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn unique_id(&self) -> LightId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }

    pub fn can_affect_mesh(&self, mesh: MeshId) -> bool {
        if !self.is_enabled || self.excluded_meshes.contains(&mesh) {
            return false;
        }
        self.included_only_meshes.is_empty() || self.included_only_meshes.contains(&mesh)
    }

    pub(crate) fn forget_mesh(&mut self, mesh: MeshId) {
        self.included_only_meshes.retain(|m| *m != mesh);
        self.excluded_meshes.retain(|m| *m != mesh);
    }
}
