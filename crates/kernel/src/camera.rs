use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use vista_animation::Animation;
use vista_common::{CameraId, Frustum, SceneUid, Tags, Viewport, is_matrix_usable};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CameraMode {
    /// Vertical field of view in radians.
    Perspective { fov: f32 },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
    },
}

/// Target camera: looks from `position` at `target`.
#[derive(Debug, Clone)]
pub struct Camera {
    pub(crate) unique_id: CameraId,
    pub id: String,
    pub name: String,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub mode: CameraMode,
    pub min_z: f32,
    pub max_z: f32,
    pub viewport: Viewport,
    pub layer_mask: u32,
    pub tags: Tags,
    pub animations: Vec<Animation>,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl Camera {
    pub fn new(name: impl Into<String>, position: Vec3, target: Vec3) -> Self {
        let name = name.into();
        Self {
            unique_id: CameraId(0),
            id: name.clone(),
            name,
            position,
            target,
            up: Vec3::Y,
            mode: CameraMode::Perspective { fov: 0.8 },
            min_z: 1.0,
            max_z: 10_000.0,
            viewport: Viewport::default(),
            layer_mask: 0x0FFF_FFFF,
            tags: Tags::new(),
            animations: Vec::new(),
            scene_uid: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn unique_id(&self) -> CameraId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Projection for a render target with the given aspect ratio, mapping
    /// depth into `[0, 1]`.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        match self.mode {
            CameraMode::Perspective { fov } => {
                Mat4::perspective_rh(fov, aspect.max(f32::EPSILON), self.min_z, self.max_z)
            }
            CameraMode::Orthographic {
                left,
                right,
                bottom,
                top,
            } => Mat4::orthographic_rh(left, right, bottom, top, self.min_z, self.max_z),
        }
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Aspect ratio of this camera's viewport on a target of the given size.
    pub fn aspect_ratio(&self, render_width: u32, render_height: u32) -> f32 {
        let (_, _, w, h) = self.viewport.to_global(render_width, render_height);
        if h <= 0.0 { 1.0 } else { w / h }
    }

    /// Frustum planes, or `None` when the camera matrices are degenerate.
    pub fn frustum(&self, aspect: f32) -> Option<Frustum> {
        let vp = self.view_projection(aspect);
        is_matrix_usable(&vp).then(|| Frustum::from_matrix(&vp))
    }

    pub fn fov(&self) -> Option<f32> {
        match self.mode {
            CameraMode::Perspective { fov } => Some(fov),
            CameraMode::Orthographic { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frustum_sees_target() {
        let cam = Camera::new("c", Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO);
        let f = cam.frustum(16.0 / 9.0).unwrap();
        assert!(f.contains_point(Vec3::ZERO));
        assert!(!f.contains_point(Vec3::new(0.0, 0.0, -20.0)));
    }

    #[test]
    fn degenerate_camera_has_no_frustum() {
        let cam = Camera::new("c", Vec3::ZERO, Vec3::ZERO);
        assert!(cam.frustum(1.0).is_none());
    }

    #[test]
    fn aspect_follows_viewport() {
        let mut cam = Camera::new("c", Vec3::Z, Vec3::ZERO);
        assert_eq!(cam.aspect_ratio(200, 100), 2.0);
        cam.viewport.width = 0.5;
        assert_eq!(cam.aspect_ratio(200, 100), 1.0);
    }

    #[test]
    fn orthographic_has_no_fov() {
        let mut cam = Camera::new("c", Vec3::Z, Vec3::ZERO);
        cam.mode = CameraMode::Orthographic {
            left: -1.0,
            right: 1.0,
            bottom: -1.0,
            top: 1.0,
        };
        assert!(cam.fov().is_none());
        assert!(cam.frustum(1.0).is_some());
    }
}
