use glam::Vec2;
use vista_common::{
    AnimationGroupId, CameraId, GeometryId, LightId, MaterialId, MeshId, Observable, ParticleSystemId, Ray,
    SkeletonId, TextureId,
};
use vista_input::{KeyboardEvent, PointerEvent};

use crate::picking::PickingInfo;

/// Frame counters passed to the per-frame observables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub render_id: u64,
    pub frame_id: u64,
    /// Clamped delta of this frame in milliseconds.
    pub delta_ms: f64,
}

/// Sent before the scene picks for a pointer event.
#[derive(Debug, Clone)]
pub struct PointerInfoPre {
    /// One of the `PointerEventTypes` bits.
    pub kind: u32,
    pub event: PointerEvent,
    pub local_position: Vec2,
    /// Set to skip picking and the `on_pointer` notification.
    pub skip_on_pointer_observable: bool,
    pub ray: Option<Ray>,
}

#[derive(Debug, Clone)]
pub struct PointerInfo {
    pub kind: u32,
    pub event: PointerEvent,
    pub pick_info: Option<PickingInfo>,
}

#[derive(Debug, Clone)]
pub struct KeyboardInfoPre {
    pub kind: u32,
    pub event: KeyboardEvent,
    pub skip_on_keyboard_observable: bool,
}

#[derive(Debug, Clone)]
pub struct KeyboardInfo {
    pub kind: u32,
    pub event: KeyboardEvent,
}

/// Every broadcast point a scene exposes.
#[derive(Debug, Default)]
pub struct SceneObservables {
    pub on_before_render: Observable<FrameInfo>,
    pub on_after_render: Observable<FrameInfo>,
    pub on_before_animations: Observable<FrameInfo>,
    pub on_before_physics: Observable<FrameInfo>,
    pub on_after_physics: Observable<FrameInfo>,
    pub on_before_camera_render: Observable<CameraId>,
    pub on_after_camera_render: Observable<CameraId>,
    pub on_active_camera_changed: Observable<Option<CameraId>>,
    pub on_ready: Observable<()>,
    pub on_dispose: Observable<()>,

    pub on_new_mesh_added: Observable<MeshId>,
    pub on_mesh_removed: Observable<MeshId>,
    pub on_new_camera_added: Observable<CameraId>,
    pub on_camera_removed: Observable<CameraId>,
    pub on_new_light_added: Observable<LightId>,
    pub on_light_removed: Observable<LightId>,
    pub on_new_geometry_added: Observable<GeometryId>,
    pub on_geometry_removed: Observable<GeometryId>,
    pub on_new_material_added: Observable<MaterialId>,
    pub on_material_removed: Observable<MaterialId>,
    pub on_new_texture_added: Observable<TextureId>,
    pub on_texture_removed: Observable<TextureId>,
    pub on_new_skeleton_added: Observable<SkeletonId>,
    pub on_skeleton_removed: Observable<SkeletonId>,
    pub on_new_particle_system_added: Observable<ParticleSystemId>,
    pub on_particle_system_removed: Observable<ParticleSystemId>,
    pub on_new_animation_group_added: Observable<AnimationGroupId>,
    pub on_animation_group_removed: Observable<AnimationGroupId>,
    pub on_animation_group_end: Observable<AnimationGroupId>,

    pub on_pre_pointer: Observable<PointerInfoPre>,
    pub on_pointer: Observable<PointerInfo>,
    pub on_pre_keyboard: Observable<KeyboardInfoPre>,
    pub on_keyboard: Observable<KeyboardInfo>,
}

impl SceneObservables {
    pub fn clear_all(&mut self) {
        *self = Self::default();
    }
}
